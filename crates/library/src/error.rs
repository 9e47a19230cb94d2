//! Error types for file list operations.

use filedock_backend::BackendError;

/// Errors produced by the file list.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("file {0} is not in the list")]
    NotFound(String),
}
