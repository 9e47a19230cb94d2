//! Preview and download resources.
//!
//! Fetched file content lives in memory behind a revocable object URL until
//! its [`PreviewHandle`] is closed. [`PreviewManager`] keeps the registry of
//! live handles; [`PreviewSlot`] gives one view at most one open handle and
//! closes it on replacement, on `clear`, and on drop.

pub mod error;
pub mod manager;
pub mod slot;

pub use error::PreviewError;
pub use manager::{PreviewHandle, PreviewManager};
pub use slot::PreviewSlot;
