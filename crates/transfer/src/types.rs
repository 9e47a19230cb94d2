use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use filedock_protocol::FileRecord;
use uuid::Uuid;

use crate::progress::{SpeedCalculator, percent};
use crate::{CandidateFile, TransferError};

/// Generic message for transport failures.
const NETWORK_FAILURE_MESSAGE: &str = "network error, please retry";

/// Generic message for server rejections without a reason.
const REJECTED_FAILURE_MESSAGE: &str = "upload rejected by server";

/// Client-generated identifier of a transfer task.
///
/// Unrelated to the identifier the server assigns to the stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How an upload failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection drop, timeout, or unreadable response.
    Network,
    /// The server answered with a non-success status.
    Rejected { code: Option<String> },
}

/// Terminal error payload of a failed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferFailure {
    /// A transport failure. Details belong in the logs, not the message.
    pub fn network() -> Self {
        Self {
            kind: FailureKind::Network,
            message: NETWORK_FAILURE_MESSAGE.into(),
        }
    }

    /// A server rejection, using the server's reason when it gave one.
    pub fn rejected(reason: Option<String>, code: Option<String>) -> Self {
        let message = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| REJECTED_FAILURE_MESSAGE.into());
        Self {
            kind: FailureKind::Rejected { code },
            message,
        }
    }
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Lifecycle of one file upload.
///
/// `Pending -> InFlight -> {Succeeded, Failed}`. Terminal states never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    InFlight,
    Succeeded(FileRecord),
    Failed(TransferFailure),
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in flight",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

/// One accepted file on its way to the server.
#[derive(Debug, Clone)]
pub struct TransferTask {
    id: TaskId,
    name: String,
    size: u64,
    media_type: String,
    payload: Bytes,
    progress: u8,
    bytes_sent: u64,
    state: TransferState,
    speed: SpeedCalculator,
}

impl TransferTask {
    /// Creates a pending task from an admitted candidate.
    pub fn new(candidate: CandidateFile) -> Self {
        Self {
            id: TaskId::new(),
            name: candidate.name,
            size: candidate.size,
            media_type: candidate.media_type,
            payload: candidate.bytes,
            progress: 0,
            bytes_sent: 0,
            state: TransferState::Pending,
            speed: SpeedCalculator::default(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw bytes to send. Cheap to clone.
    pub fn payload(&self) -> Bytes {
        self.payload.clone()
    }

    /// Progress percentage, 0 to 100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Server record, once the upload succeeded.
    pub fn record(&self) -> Option<&FileRecord> {
        match &self.state {
            TransferState::Succeeded(record) => Some(record),
            _ => None,
        }
    }

    /// Human-readable error, once the upload failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            TransferState::Failed(failure) => Some(&failure.message),
            _ => None,
        }
    }

    /// Current throughput in bytes/second while in flight.
    pub fn bytes_per_second(&self) -> f64 {
        self.speed.bytes_per_second()
    }

    /// Estimated time left while in flight.
    pub fn eta(&self) -> Option<Duration> {
        if self.state != TransferState::InFlight {
            return None;
        }
        self.speed.eta(self.size.saturating_sub(self.bytes_sent))
    }

    /// Pending -> InFlight.
    pub fn start(&mut self) -> Result<(), TransferError> {
        match self.state {
            TransferState::Pending => {
                self.state = TransferState::InFlight;
                self.speed.add_sample(0);
                Ok(())
            }
            _ => Err(self.invalid("start")),
        }
    }

    /// Records bytes sent so far. Returns the new percentage when it moved.
    ///
    /// Reports that would move progress backwards are ignored.
    pub fn record_progress(&mut self, sent: u64, total: u64) -> Result<Option<u8>, TransferError> {
        if self.state != TransferState::InFlight {
            return Err(self.invalid("report progress"));
        }
        if sent <= self.bytes_sent {
            return Ok(None);
        }

        self.speed.add_sample(sent - self.bytes_sent);
        self.bytes_sent = sent;

        let pct = percent(sent, total);
        if pct > self.progress {
            self.progress = pct;
            Ok(Some(pct))
        } else {
            Ok(None)
        }
    }

    /// InFlight -> Succeeded. Progress becomes 100.
    pub fn succeed(&mut self, record: FileRecord) -> Result<(), TransferError> {
        if self.state != TransferState::InFlight {
            return Err(self.invalid("succeed"));
        }
        self.progress = 100;
        self.bytes_sent = self.size;
        self.state = TransferState::Succeeded(record);
        Ok(())
    }

    /// InFlight -> Failed.
    pub fn fail(&mut self, failure: TransferFailure) -> Result<(), TransferError> {
        if self.state != TransferState::InFlight {
            return Err(self.invalid("fail"));
        }
        self.state = TransferState::Failed(failure);
        Ok(())
    }

    /// Builds a fresh pending task for the same file.
    ///
    /// Only failed tasks can be retried. The failed task is left untouched.
    pub fn retry(&self) -> Result<TransferTask, TransferError> {
        match self.state {
            TransferState::Failed(_) => Ok(Self::new(CandidateFile {
                name: self.name.clone(),
                size: self.size,
                media_type: self.media_type.clone(),
                bytes: self.payload.clone(),
            })),
            _ => Err(self.invalid("retry")),
        }
    }

    fn invalid(&self, action: &'static str) -> TransferError {
        if self.state.is_terminal() && action != "retry" {
            TransferError::Terminal(self.id)
        } else {
            TransferError::InvalidTransition {
                task: self.id,
                action,
                state: self.state.name(),
            }
        }
    }
}
