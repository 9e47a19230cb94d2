use std::fmt;

use filedock_protocol::{is_allowed_media_type, normalize_media_type};
use tracing::debug;

use crate::{CandidateFile, TransferTask};

/// Largest accepted upload: 50 MiB.
pub const MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// Why a candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooLarge { size: u64, max: u64 },
    UnsupportedType(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { .. } => f.write_str("exceeds maximum size"),
            Self::UnsupportedType(_) => f.write_str("unsupported type"),
        }
    }
}

/// Outcome of the admission policy for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Decides whether a candidate may be uploaded.
///
/// Rules, first failure wins:
/// 1. declared size above [`MAX_UPLOAD_SIZE`]
/// 2. declared media type not in the allow-list
pub fn validate(candidate: &CandidateFile) -> Verdict {
    if candidate.size > MAX_UPLOAD_SIZE {
        return Verdict::Rejected(Rejection::TooLarge {
            size: candidate.size,
            max: MAX_UPLOAD_SIZE,
        });
    }

    if !is_allowed_media_type(&candidate.media_type) {
        return Verdict::Rejected(Rejection::UnsupportedType(normalize_media_type(
            &candidate.media_type,
        )));
    }

    Verdict::Accepted
}

/// Result of running the policy over a whole selection.
#[derive(Debug, Default)]
pub struct Admission {
    /// One pending task per accepted candidate, in selection order.
    pub accepted: Vec<TransferTask>,
    /// Rejected candidate names with the reason.
    pub rejected: Vec<(String, Rejection)>,
}

/// Validates every candidate and turns the accepted ones into pending tasks.
pub fn admit(candidates: impl IntoIterator<Item = CandidateFile>) -> Admission {
    let mut admission = Admission::default();

    for candidate in candidates {
        match validate(&candidate) {
            Verdict::Accepted => admission.accepted.push(TransferTask::new(candidate)),
            Verdict::Rejected(reason) => {
                debug!(file = %candidate.name, %reason, "candidate rejected");
                admission.rejected.push((candidate.name, reason));
            }
        }
    }

    admission
}
