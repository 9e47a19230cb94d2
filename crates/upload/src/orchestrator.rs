//! Upload orchestrator for bounded concurrent batch uploads.
//!
//! Runs every pending task of an [`UploadBatch`], streams progress events,
//! and aggregates terminal outcomes into one [`BatchOutcome`].

use filedock_backend::{BackendError, FileBackend, ProgressCallback};
use filedock_protocol::{ErrorCode, FileRecord};
use filedock_transfer::{TaskId, TransferFailure};
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::batch::UploadBatch;
use crate::types::{BatchOutcome, UploadEvent};

/// Simultaneous uploads per batch unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Terminal result of one task as seen by the orchestrator.
enum TaskOutcome {
    Succeeded(FileRecord),
    Failed,
    /// Skipped or discarded because the batch was dismissed.
    Dropped,
}

/// Orchestrates batch uploads against a [`FileBackend`].
pub struct UploadOrchestrator {
    max_concurrent: usize,
    events_tx: mpsc::UnboundedSender<UploadEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<UploadEvent>>,
}

impl Default for UploadOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

impl UploadOrchestrator {
    /// Creates an orchestrator running at most `max_concurrent` uploads at
    /// once (at least one).
    pub fn new(max_concurrent: usize) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            max_concurrent: max_concurrent.max(1),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Uploads every pending task of `batch`.
    ///
    /// Each task runs independently: one failure never cancels or alters its
    /// siblings, and nothing is retried automatically. Emits exactly one
    /// `BatchFinished` event per run.
    ///
    /// A batch that is already running is left alone and an empty outcome is
    /// returned.
    pub async fn upload_batch(&self, batch: &UploadBatch, backend: &dyn FileBackend) -> BatchOutcome {
        self.upload_batch_with(batch, backend, &|_| {}).await
    }

    /// Like [`upload_batch`](Self::upload_batch), calling `on_uploaded` with
    /// each stored record as soon as its task succeeds, before the task's
    /// `Succeeded` event.
    pub async fn upload_batch_with(
        &self,
        batch: &UploadBatch,
        backend: &dyn FileBackend,
        on_uploaded: &(dyn Fn(&FileRecord) + Sync),
    ) -> BatchOutcome {
        let Some((epoch, pending)) = batch.begin_run() else {
            warn!("batch upload already running, ignoring request");
            return BatchOutcome::default();
        };
        info!(
            tasks = pending.len(),
            concurrency = self.max_concurrent,
            "batch upload started"
        );

        let results: Vec<TaskOutcome> = stream::iter(pending)
            .map(|id| self.run_task(batch, backend, on_uploaded, epoch, id))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        batch.end_run(epoch);

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                TaskOutcome::Succeeded(record) => {
                    outcome.success_count += 1;
                    outcome.uploaded.push(record);
                }
                TaskOutcome::Failed => outcome.failure_count += 1,
                TaskOutcome::Dropped => {}
            }
        }

        self.emit(UploadEvent::BatchFinished {
            success_count: outcome.success_count,
            failure_count: outcome.failure_count,
        });
        info!(
            succeeded = outcome.success_count,
            failed = outcome.failure_count,
            "batch upload finished"
        );

        outcome
    }

    async fn run_task(
        &self,
        batch: &UploadBatch,
        backend: &dyn FileBackend,
        on_uploaded: &(dyn Fn(&FileRecord) + Sync),
        epoch: u64,
        id: TaskId,
    ) -> TaskOutcome {
        let Some(payload) = batch.start_task(id, epoch) else {
            debug!(task = %id, "task skipped");
            return TaskOutcome::Dropped;
        };
        let name = payload.name.clone();
        self.emit(UploadEvent::Started {
            task: id,
            name: name.clone(),
        });

        let progress_batch = batch.clone();
        let progress_tx = self.events_tx.clone();
        let on_progress: ProgressCallback = Box::new(move |sent, total| {
            progress_batch.report_progress(id, sent, total, |progress, bytes_per_second| {
                let _ = progress_tx.send(UploadEvent::Progress {
                    task: id,
                    progress,
                    bytes_per_second,
                });
            });
        });

        let result = backend.upload(payload, on_progress).await.map_err(|e| {
            warn!(task = %id, file = %name, error = %e, "upload failed");
            failure_from(e)
        });

        if !batch.complete(id, epoch, result.clone()) {
            debug!(task = %id, "result discarded, batch dismissed");
            return TaskOutcome::Dropped;
        }

        match result {
            Ok(record) => {
                info!(task = %id, file = %name, record = %record.id, "upload succeeded");
                on_uploaded(&record);
                self.emit(UploadEvent::Succeeded {
                    task: id,
                    record: record.clone(),
                });
                TaskOutcome::Succeeded(record)
            }
            Err(failure) => {
                self.emit(UploadEvent::Failed {
                    task: id,
                    error: failure.message,
                });
                TaskOutcome::Failed
            }
        }
    }

    fn emit(&self, event: UploadEvent) {
        // Nobody listening is fine.
        let _ = self.events_tx.send(event);
    }
}

/// Classifies a backend error for display on the task.
fn failure_from(err: BackendError) -> TransferFailure {
    match err {
        BackendError::Rejected { message, code, .. } => {
            let reason = message.or_else(|| {
                code.as_deref()
                    .map(|c| ErrorCode::from_code(c).default_message().to_string())
            });
            TransferFailure::rejected(reason, code)
        }
        BackendError::NotFound => TransferFailure::rejected(None, None),
        _ => TransferFailure::network(),
    }
}
