//! Media-type families and the upload allow-list.

use serde::{Deserialize, Serialize};

/// Media types accepted for upload.
///
/// Entries are normalized (lowercase, no parameters).
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
    // Documents
    "application/pdf",
    "text/plain",
    "text/markdown",
    "text/csv",
    "application/json",
    "application/rtf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
    // Archives
    "application/zip",
    "application/x-tar",
    "application/gzip",
    "application/x-7z-compressed",
    "application/vnd.rar",
    "application/x-rar-compressed",
    // Audio
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/flac",
    "audio/aac",
    "audio/mp4",
    // Video
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
];

/// Document types the view layer can render inline.
const PREVIEWABLE_DOCUMENTS: &[&str] = &["application/pdf", "text/plain", "text/markdown", "text/csv"];

/// Media-type family, used for category filters and icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Document,
    Archive,
    Audio,
    Video,
    Other,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 6] = [
        Self::Image,
        Self::Document,
        Self::Archive,
        Self::Audio,
        Self::Video,
        Self::Other,
    ];

    /// Classifies a media type into its family.
    pub fn of(media_type: &str) -> Self {
        let mt = normalize_media_type(media_type);
        let (top, sub) = mt.split_once('/').unwrap_or((mt.as_str(), ""));
        match top {
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "text" => Self::Document,
            "application" => match sub {
                "zip" | "x-tar" | "gzip" | "x-gzip" | "x-7z-compressed" | "vnd.rar"
                | "x-rar-compressed" | "x-bzip2" => Self::Archive,
                "pdf" | "json" | "rtf" | "msword" => Self::Document,
                s if s.starts_with("vnd.openxmlformats-officedocument")
                    || s.starts_with("vnd.ms-")
                    || s.starts_with("vnd.oasis.opendocument") =>
                {
                    Self::Document
                }
                _ => Self::Other,
            },
            _ => Self::Other,
        }
    }

    /// Parses a user-facing category name (`"images"`, `"doc"`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "image" | "images" | "photo" | "photos" => Some(Self::Image),
            "document" | "documents" | "doc" | "docs" => Some(Self::Document),
            "archive" | "archives" => Some(Self::Archive),
            "audio" | "music" => Some(Self::Audio),
            "video" | "videos" => Some(Self::Video),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "Images",
            Self::Document => "Documents",
            Self::Archive => "Archives",
            Self::Audio => "Audio",
            Self::Video => "Videos",
            Self::Other => "Other",
        }
    }
}

/// Lowercases a media type and strips any parameters.
///
/// `"Text/Plain; charset=UTF-8"` becomes `"text/plain"`.
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether uploads of this media type are permitted.
pub fn is_allowed_media_type(media_type: &str) -> bool {
    let mt = normalize_media_type(media_type);
    ALLOWED_MEDIA_TYPES.contains(&mt.as_str())
}

/// Whether content of this media type is worth fetching for an inline preview.
pub fn is_inline_previewable(media_type: &str) -> bool {
    let mt = normalize_media_type(media_type);
    match MediaCategory::of(&mt) {
        MediaCategory::Image => is_allowed_media_type(&mt),
        MediaCategory::Document => PREVIEWABLE_DOCUMENTS.contains(&mt.as_str()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_parameters_and_case() {
        assert_eq!(normalize_media_type("Text/Plain; charset=UTF-8"), "text/plain");
        assert_eq!(normalize_media_type("  image/PNG "), "image/png");
        assert_eq!(normalize_media_type(""), "");
    }

    #[test]
    fn allow_list_covers_every_family() {
        for category in [
            MediaCategory::Image,
            MediaCategory::Document,
            MediaCategory::Archive,
            MediaCategory::Audio,
            MediaCategory::Video,
        ] {
            assert!(
                ALLOWED_MEDIA_TYPES
                    .iter()
                    .any(|mt| MediaCategory::of(mt) == category),
                "no allowed type in {category:?}"
            );
        }
        assert!(
            ALLOWED_MEDIA_TYPES
                .iter()
                .all(|mt| MediaCategory::of(mt) != MediaCategory::Other)
        );
    }

    #[test]
    fn rejects_unlisted_types() {
        assert!(is_allowed_media_type("image/png"));
        assert!(is_allowed_media_type("application/pdf; version=1.7"));
        assert!(!is_allowed_media_type("application/x-msdownload"));
        assert!(!is_allowed_media_type("application/octet-stream"));
        assert!(!is_allowed_media_type(""));
    }

    #[test]
    fn classifies_office_documents() {
        assert_eq!(
            MediaCategory::of(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            MediaCategory::Document
        );
        assert_eq!(MediaCategory::of("application/gzip"), MediaCategory::Archive);
        assert_eq!(MediaCategory::of("font/woff2"), MediaCategory::Other);
    }

    #[test]
    fn previewable_is_images_and_simple_documents() {
        assert!(is_inline_previewable("image/jpeg"));
        assert!(is_inline_previewable("application/pdf"));
        assert!(is_inline_previewable("text/plain"));
        assert!(!is_inline_previewable("application/msword"));
        assert!(!is_inline_previewable("video/mp4"));
        assert!(!is_inline_previewable("application/zip"));
    }

    #[test]
    fn parse_category_names() {
        assert_eq!(MediaCategory::parse("Images"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::parse("docs"), Some(MediaCategory::Document));
        assert_eq!(MediaCategory::parse("spreadsheets"), None);
    }
}
