use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaCategory;

/// A stored file as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub media_type: String,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(alias = "uploadedAt")]
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Returns the media-type family of this file.
    pub fn category(&self) -> MediaCategory {
        MediaCategory::of(&self.media_type)
    }
}

/// Body of `GET /files`.
///
/// Older servers answer with a bare array, newer ones wrap it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileListResponse {
    Bare(Vec<FileRecord>),
    Wrapped { files: Vec<FileRecord> },
}

impl FileListResponse {
    pub fn into_files(self) -> Vec<FileRecord> {
        match self {
            Self::Bare(files) | Self::Wrapped { files } => files,
        }
    }
}

/// Structured error returned by the API on a non-success status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, alias = "error", alias = "reason")]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ApiErrorBody {
    /// Parses an error body, tolerating empty or non-JSON payloads.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Machine-readable classification of `code`, if recognized.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code.as_deref().map(ErrorCode::from_code)
    }
}

/// Machine-readable rejection codes the client reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    QuotaExceeded,
    FileTooLarge,
    UnsupportedType,
    Unauthorized,
    Other(String),
}

impl ErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "quota_exceeded" => Self::QuotaExceeded,
            "file_too_large" | "payload_too_large" => Self::FileTooLarge,
            "unsupported_type" | "unsupported_media_type" => Self::UnsupportedType,
            "unauthorized" => Self::Unauthorized,
            _ => Self::Other(code.to_string()),
        }
    }

    /// Fallback message when the server sent a code but no reason.
    pub fn default_message(&self) -> &str {
        match self {
            Self::QuotaExceeded => "quota exceeded",
            Self::FileTooLarge => "exceeds maximum size",
            Self::UnsupportedType => "unsupported type",
            Self::Unauthorized => "not signed in",
            Self::Other(code) => code,
        }
    }
}
