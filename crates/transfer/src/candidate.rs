use std::path::Path;

use bytes::Bytes;

use crate::TransferError;

/// A file the user selected, not yet admitted to the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Declared display name.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Declared media type.
    pub media_type: String,
    /// Raw payload.
    pub bytes: Bytes,
}

impl CandidateFile {
    /// Creates a candidate from an in-memory payload. The declared size is
    /// the payload length.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Reads a local file and detects its media type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream`, which
    /// the validation policy rejects.
    pub async fn from_path(path: &Path) -> Result<Self, TransferError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::InvalidFile(path.display().to_string()))?
            .to_string();

        let data = tokio::fs::read(path).await?;
        let media_type = detect_media_type(&name).unwrap_or("application/octet-stream");

        Ok(Self::new(name, media_type, Bytes::from(data)))
    }
}

/// Detects a media type from a file name extension.
pub fn detect_media_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        Some("svg") => Some("image/svg+xml"),
        Some("bmp") => Some("image/bmp"),
        Some("pdf") => Some("application/pdf"),
        Some("txt" | "log") => Some("text/plain"),
        Some("md") => Some("text/markdown"),
        Some("csv") => Some("text/csv"),
        Some("json") => Some("application/json"),
        Some("rtf") => Some("application/rtf"),
        Some("doc") => Some("application/msword"),
        Some("docx") => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        Some("xls") => Some("application/vnd.ms-excel"),
        Some("xlsx") => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        Some("ppt") => Some("application/vnd.ms-powerpoint"),
        Some("pptx") => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        Some("odt") => Some("application/vnd.oasis.opendocument.text"),
        Some("zip") => Some("application/zip"),
        Some("tar") => Some("application/x-tar"),
        Some("gz" | "tgz") => Some("application/gzip"),
        Some("7z") => Some("application/x-7z-compressed"),
        Some("rar") => Some("application/vnd.rar"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("ogg") => Some("audio/ogg"),
        Some("flac") => Some("audio/flac"),
        Some("aac") => Some("audio/aac"),
        Some("m4a") => Some("audio/mp4"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("mov") => Some("video/quicktime"),
        Some("avi") => Some("video/x-msvideo"),
        Some("mkv") => Some("video/x-matroska"),
        _ => None,
    }
}
