//! Upload error types.

use filedock_transfer::{TaskId, TransferError};

/// Errors produced by batch operations.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("batch upload in progress")]
    BatchRunning,

    #[error("no task {0} in batch")]
    TaskNotFound(TaskId),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}
