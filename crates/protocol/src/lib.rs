pub mod activity;
pub mod media;
pub mod types;

// Re-export primary types for convenience.
pub use activity::{ActivityAction, Tone};
pub use media::{
    ALLOWED_MEDIA_TYPES, MediaCategory, is_allowed_media_type, is_inline_previewable,
    normalize_media_type,
};
pub use types::{ApiErrorBody, ErrorCode, FileListResponse, FileRecord};
