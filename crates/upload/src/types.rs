//! Data types for the upload flow.

use std::fmt;

use filedock_protocol::FileRecord;
use filedock_transfer::TaskId;

/// Progress event emitted during a batch upload.
///
/// Per task the order is `Started`, any number of `Progress`, then exactly
/// one of `Succeeded` or `Failed`. Each run ends with one `BatchFinished`.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Started {
        task: TaskId,
        name: String,
    },
    Progress {
        task: TaskId,
        progress: u8,
        bytes_per_second: f64,
    },
    Succeeded {
        task: TaskId,
        record: FileRecord,
    },
    Failed {
        task: TaskId,
        error: String,
    },
    BatchFinished {
        success_count: usize,
        failure_count: usize,
    },
}

impl UploadEvent {
    /// Task the event belongs to, `None` for the batch summary.
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Self::Started { task, .. }
            | Self::Progress { task, .. }
            | Self::Succeeded { task, .. }
            | Self::Failed { task, .. } => Some(*task),
            Self::BatchFinished { .. } => None,
        }
    }
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub failure_count: usize,
    /// Records of the files that made it, in completion order.
    pub uploaded: Vec<FileRecord>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.success_count, self.failure_count) {
            (0, 0) => f.write_str("nothing to upload"),
            (ok, 0) => write!(f, "{ok} uploaded"),
            (0, failed) => write!(f, "{failed} failed"),
            (ok, failed) => write!(f, "{ok} uploaded, {failed} failed"),
        }
    }
}
