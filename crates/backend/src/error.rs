//! Backend error types.

/// Errors produced while talking to the storage API.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "server rejected request ({status}): {}",
        .message.as_deref().unwrap_or("no reason given")
    )]
    Rejected {
        status: u16,
        message: Option<String>,
        code: Option<String>,
    },

    #[error("not found")]
    NotFound,

    #[error("cancelled")]
    Cancelled,

    #[error("session signed out")]
    SignedOut,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// True for failures of the connection itself rather than an answer
    /// from the server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Network(_) | Self::Json(_))
    }
}
