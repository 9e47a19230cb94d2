//! Shared task list for one upload view.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use filedock_backend::UploadPayload;
use filedock_protocol::FileRecord;
use filedock_transfer::{TaskId, TransferFailure, TransferState, TransferTask};
use tracing::debug;

use crate::error::UploadError;

/// Cloneable handle over the tasks of one batch view.
///
/// The orchestrator mutates tasks through this handle while the view reads
/// [`snapshot`](Self::snapshot)s. Locks are never held across an await.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    inner: Arc<RwLock<BatchInner>>,
}

#[derive(Debug, Default)]
struct BatchInner {
    tasks: Vec<TransferTask>,
    /// Bumped by `dismiss`; results from an older epoch are dropped.
    epoch: u64,
    /// Epoch of the active run.
    running: Option<u64>,
}

impl BatchInner {
    fn find_mut(&mut self, id: TaskId) -> Option<&mut TransferTask> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BatchInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BatchInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task. Tasks added during a run wait for the next one.
    pub fn add(&self, task: TransferTask) -> TaskId {
        let id = task.id();
        self.write().tasks.push(task);
        id
    }

    pub fn extend(&self, tasks: impl IntoIterator<Item = TransferTask>) {
        self.write().tasks.extend(tasks);
    }

    /// Removes a task in any state, except while a batch upload is running.
    pub fn remove(&self, id: TaskId) -> Result<TransferTask, UploadError> {
        let mut inner = self.write();
        if inner.running.is_some() {
            return Err(UploadError::BatchRunning);
        }
        let pos = inner
            .tasks
            .iter()
            .position(|t| t.id() == id)
            .ok_or(UploadError::TaskNotFound(id))?;
        Ok(inner.tasks.remove(pos))
    }

    /// Replaces a failed task with a fresh pending one in the same position.
    ///
    /// Returns the id of the new task.
    pub fn retry(&self, id: TaskId) -> Result<TaskId, UploadError> {
        let mut inner = self.write();
        let slot = inner.find_mut(id).ok_or(UploadError::TaskNotFound(id))?;
        let fresh = slot.retry()?;
        let new_id = fresh.id();
        *slot = fresh;
        debug!(old = %id, new = %new_id, "task queued for retry");
        Ok(new_id)
    }

    /// Drops every task. Refused while a batch upload is running.
    pub fn clear(&self) -> Result<(), UploadError> {
        let mut inner = self.write();
        if inner.running.is_some() {
            return Err(UploadError::BatchRunning);
        }
        inner.tasks.clear();
        Ok(())
    }

    /// The batch view went away.
    ///
    /// Drops every task. Pending tasks of a running upload are skipped and
    /// results still in flight are discarded when they arrive.
    pub fn dismiss(&self) {
        let mut inner = self.write();
        inner.tasks.clear();
        inner.epoch += 1;
        inner.running = None;
    }

    pub fn snapshot(&self) -> Vec<TransferTask> {
        self.read().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<TransferTask> {
        self.read().tasks.iter().find(|t| t.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().tasks.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.read().running.is_some()
    }

    /// Marks the batch running and returns the epoch plus the pending tasks.
    ///
    /// `None` when a run is already active.
    pub(crate) fn begin_run(&self) -> Option<(u64, Vec<TaskId>)> {
        let mut inner = self.write();
        if inner.running.is_some() {
            return None;
        }
        let epoch = inner.epoch;
        inner.running = Some(epoch);
        let pending = inner
            .tasks
            .iter()
            .filter(|t| *t.state() == TransferState::Pending)
            .map(|t| t.id())
            .collect();
        Some((epoch, pending))
    }

    pub(crate) fn end_run(&self, epoch: u64) {
        let mut inner = self.write();
        if inner.running == Some(epoch) {
            inner.running = None;
        }
    }

    /// Moves a pending task in flight and returns what to send.
    ///
    /// `None` when the task is gone or the batch was dismissed.
    pub(crate) fn start_task(&self, id: TaskId, epoch: u64) -> Option<UploadPayload> {
        let mut inner = self.write();
        if inner.epoch != epoch {
            return None;
        }
        let task = inner.find_mut(id)?;
        task.start().ok()?;
        Some(UploadPayload {
            name: task.name().to_string(),
            media_type: task.media_type().to_string(),
            bytes: task.payload(),
        })
    }

    /// Applies a progress report. When the percentage moved, `notify` gets
    /// the new percentage and current throughput while the task is still
    /// locked, so it can never observe a settled task. Returns whether
    /// `notify` ran.
    pub(crate) fn report_progress(
        &self,
        id: TaskId,
        sent: u64,
        total: u64,
        notify: impl FnOnce(u8, f64),
    ) -> bool {
        let mut inner = self.write();
        let Some(task) = inner.find_mut(id) else {
            return false;
        };
        let Ok(Some(progress)) = task.record_progress(sent, total) else {
            return false;
        };
        notify(progress, task.bytes_per_second());
        true
    }

    /// Settles an in-flight task. Returns false when the result was
    /// discarded.
    pub(crate) fn complete(
        &self,
        id: TaskId,
        epoch: u64,
        result: Result<FileRecord, TransferFailure>,
    ) -> bool {
        let mut inner = self.write();
        if inner.epoch != epoch {
            return false;
        }
        let Some(task) = inner.find_mut(id) else {
            return false;
        };
        let applied = match result {
            Ok(record) => task.succeed(record),
            Err(failure) => task.fail(failure),
        };
        applied.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;
    use filedock_transfer::{CandidateFile, TransferError};

    use super::*;

    fn task(name: &str) -> TransferTask {
        TransferTask::new(CandidateFile::new(
            name,
            "text/plain",
            Bytes::from_static(b"hello"),
        ))
    }

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.into(),
            name: "a.txt".into(),
            size: 5,
            media_type: "text/plain".into(),
            encrypted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn add_and_snapshot() {
        let batch = UploadBatch::new();
        let a = batch.add(task("a.txt"));
        batch.add(task("b.txt"));

        let snap = batch.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].id(), a);
        assert_eq!(batch.task(a).unwrap().name(), "a.txt");
    }

    #[test]
    fn remove_refused_while_running() {
        let batch = UploadBatch::new();
        let a = batch.add(task("a.txt"));

        let (epoch, pending) = batch.begin_run().unwrap();
        assert_eq!(pending, vec![a]);
        assert!(matches!(batch.remove(a), Err(UploadError::BatchRunning)));
        assert!(matches!(batch.clear(), Err(UploadError::BatchRunning)));

        batch.end_run(epoch);
        assert!(batch.remove(a).is_ok());
        assert!(batch.is_empty());
    }

    #[test]
    fn remove_unknown_task() {
        let batch = UploadBatch::new();
        let ghost = task("ghost.txt").id();
        assert!(matches!(
            batch.remove(ghost),
            Err(UploadError::TaskNotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn second_run_refused() {
        let batch = UploadBatch::new();
        batch.add(task("a.txt"));
        assert!(batch.begin_run().is_some());
        assert!(batch.begin_run().is_none());
    }

    #[test]
    fn retry_replaces_failed_task_in_place() {
        let batch = UploadBatch::new();
        let first = batch.add(task("first.txt"));
        let a = batch.add(task("a.txt"));

        let (epoch, _) = batch.begin_run().unwrap();
        batch.start_task(a, epoch).unwrap();
        assert!(batch.complete(a, epoch, Err(TransferFailure::network())));
        batch.end_run(epoch);

        let fresh = batch.retry(a).unwrap();
        assert_ne!(fresh, a);
        assert!(batch.task(a).is_none());

        let snap = batch.snapshot();
        assert_eq!(snap[0].id(), first);
        assert_eq!(snap[1].id(), fresh);
        assert_eq!(*snap[1].state(), TransferState::Pending);
    }

    #[test]
    fn retry_requires_failed_task() {
        let batch = UploadBatch::new();
        let a = batch.add(task("a.txt"));
        assert!(matches!(
            batch.retry(a),
            Err(UploadError::Transfer(TransferError::InvalidTransition { .. }))
        ));
    }

    #[test]
    fn dismiss_discards_late_results() {
        let batch = UploadBatch::new();
        let a = batch.add(task("a.txt"));
        let b = batch.add(task("b.txt"));

        let (epoch, _) = batch.begin_run().unwrap();
        batch.start_task(a, epoch).unwrap();

        batch.dismiss();
        assert!(batch.is_empty());
        assert!(!batch.is_running());

        // The in-flight result and the pending task are both dropped.
        assert!(!batch.complete(a, epoch, Ok(record("srv-a"))));
        assert!(batch.start_task(b, epoch).is_none());

        // A late end_run from the old epoch must not touch a new run.
        batch.add(task("c.txt"));
        let (new_epoch, _) = batch.begin_run().unwrap();
        batch.end_run(epoch);
        assert!(batch.is_running());
        batch.end_run(new_epoch);
        assert!(!batch.is_running());
    }

    #[test]
    fn progress_reports_only_when_percentage_moves() {
        let batch = UploadBatch::new();
        let a = batch.add(task("a.txt"));
        let (epoch, _) = batch.begin_run().unwrap();
        batch.start_task(a, epoch).unwrap();

        let mut seen = None;
        assert!(batch.report_progress(a, 2, 5, |p, _| seen = Some(p)));
        assert_eq!(seen, Some(40));
        assert!(!batch.report_progress(a, 1, 5, |_, _| panic!("stale report emitted")));
        assert_eq!(batch.task(a).unwrap().progress(), 40);
    }

    #[test]
    fn settled_task_takes_no_progress() {
        let batch = UploadBatch::new();
        let a = batch.add(task("a.txt"));
        let (epoch, _) = batch.begin_run().unwrap();
        batch.start_task(a, epoch).unwrap();
        assert!(batch.complete(a, epoch, Ok(record("srv-a"))));

        assert!(!batch.report_progress(a, 5, 5, |_, _| panic!("progress after settle")));
        assert_eq!(batch.task(a).unwrap().progress(), 100);
    }
}
