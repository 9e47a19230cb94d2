//! Access to the storage REST API.
//!
//! Upload logic, the file list and the preview manager only ever see the
//! [`FileBackend`] trait, so they stay testable with in-memory mocks.
//! [`HttpBackend`] is the production implementation on top of `reqwest`.
//!
//! # Endpoints
//!
//! - `POST /files/upload`: multipart, one file, progress reported while the
//!   body streams
//! - `GET /files`: the signed-in user's files
//! - `GET /files/{id}/content`: raw bytes of one file
//! - `DELETE /files/{id}`

pub mod backend;
pub mod client;
pub mod error;
pub mod session;

pub use backend::{BackendFuture, FileBackend, ProgressCallback, UploadPayload};
pub use client::{BackendConfig, HttpBackend};
pub use error::BackendError;
pub use session::{Session, UserIdentity};
