use filedock_backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("content fetch cancelled")]
    Cancelled,

    #[error("handle {0} already released")]
    AlreadyReleased(String),

    #[error("no inline preview available for {0}")]
    NoInlinePreview(String),
}
