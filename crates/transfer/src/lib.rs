//! Upload admission and per-file transfer tracking.
//!
//! A [`CandidateFile`] is what the user picked. [`validate`] decides whether
//! it may enter the upload pipeline; accepted candidates become
//! [`TransferTask`]s that own their progress and terminal outcome.

mod candidate;
mod progress;
mod types;
mod validation;

pub use candidate::{CandidateFile, detect_media_type};
pub use progress::{SpeedCalculator, percent};
pub use types::{FailureKind, TaskId, TransferFailure, TransferState, TransferTask};
pub use validation::{Admission, MAX_UPLOAD_SIZE, Rejection, Verdict, admit, validate};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task {0} already finished")]
    Terminal(TaskId),

    #[error("task {task} cannot {action} while {state}")]
    InvalidTransition {
        task: TaskId,
        action: &'static str,
        state: &'static str,
    },

    #[error("invalid file: {0}")]
    InvalidFile(String),
}
