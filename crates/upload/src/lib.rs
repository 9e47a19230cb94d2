//! Batch upload flow.
//!
//! This crate implements the **business logic** for uploading a batch of
//! admitted files. It has no UI or transport dependencies: the application
//! provides a [`FileBackend`](filedock_backend::FileBackend) and observes the
//! batch through [`UploadBatch`] snapshots and the [`UploadEvent`] stream.
//!
//! # Pipeline
//!
//! 1. **Admit**: `filedock_transfer::admit` turns a selection into tasks
//! 2. **Queue**: tasks are added to an [`UploadBatch`]
//! 3. **Upload**: [`UploadOrchestrator::upload_batch`] runs every pending
//!    task with bounded concurrency
//! 4. **Summarize**: one [`BatchOutcome`] and one `BatchFinished` event

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use batch::UploadBatch;
pub use error::UploadError;
pub use orchestrator::{DEFAULT_MAX_CONCURRENT, UploadOrchestrator};
pub use types::{BatchOutcome, UploadEvent};
