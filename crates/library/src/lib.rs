//! The user's canonical file list.
//!
//! [`FileLibrary`] owns the list. Every other component gets read-only
//! projections from [`FileLibrary::view`].
//!
//! # Operations
//!
//! - **Load**: replace the list with the server snapshot, discarding
//!   superseded or cancelled fetches
//! - **Insert / remove**: local mutations, idempotent by identifier
//! - **Delete**: optimistic removal confirmed by the server, rolled back on
//!   failure
//! - **View**: search, category filter and sort, recomputed per call

pub mod error;
pub mod library;
pub mod query;

pub use error::LibraryError;
pub use library::{FileLibrary, LibraryStats, LoadOutcome};
pub use query::{SortKey, ViewQuery};
