//! File library: the canonical list of the user's stored files.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use filedock_backend::{BackendError, FileBackend};
use filedock_protocol::{FileRecord, MediaCategory};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LibraryError;
use crate::query::ViewQuery;

/// What happened to a finished load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The snapshot replaced the list.
    Applied(Vec<FileRecord>),
    /// The load was superseded by a newer one or cancelled. Nothing changed.
    /// Local changes made while an applied load was in flight survive it.
    Discarded,
}

/// Summary figures for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub count: usize,
    pub total_bytes: u64,
    /// Files per category, every category listed.
    pub by_category: Vec<(MediaCategory, usize)>,
}

/// Cloneable handle over the canonical file list.
#[derive(Debug, Clone, Default)]
pub struct FileLibrary {
    inner: Arc<RwLock<LibraryInner>>,
}

#[derive(Debug, Default)]
struct LibraryInner {
    records: BTreeMap<String, FileRecord>,
    /// Bumped each time a load is issued.
    generation: u64,
    /// Bumped by every local insert, removal and confirmed delete.
    revision: u64,
    /// Latest local change per id, tagged with its revision. `None` is a removal.
    changes: BTreeMap<String, (u64, Option<FileRecord>)>,
    loaded_at: Option<DateTime<Utc>>,
}

impl LibraryInner {
    fn record_change(&mut self, id: &str, change: Option<FileRecord>) {
        self.revision += 1;
        self.changes.insert(id.to_string(), (self.revision, change));
    }

    /// Replaces the list with `snapshot`, then replays changes newer than `since`.
    fn apply_snapshot(&mut self, snapshot: &[FileRecord], since: u64) {
        self.records = snapshot.iter().map(|r| (r.id.clone(), r.clone())).collect();
        self.changes.retain(|_, (revision, _)| *revision > since);
        for (id, (_, change)) in &self.changes {
            match change {
                Some(record) => {
                    self.records.insert(id.clone(), record.clone());
                }
                None => {
                    self.records.remove(id);
                }
            }
        }
    }
}

impl FileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, LibraryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LibraryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the server's list and replaces the local one with it.
    ///
    /// The server is authoritative: records missing from the snapshot are
    /// dropped, including ones kept locally after a failed delete. A load
    /// that resolves after a newer load was issued, or after `cancel`
    /// fired, is discarded. Inserts and confirmed deletes made while the
    /// request was in flight are replayed on top of the snapshot. A failed
    /// load leaves the list untouched.
    pub async fn load(
        &self,
        backend: &dyn FileBackend,
        cancel: CancellationToken,
    ) -> Result<LoadOutcome, LibraryError> {
        let (generation, since) = {
            let mut inner = self.write();
            inner.generation += 1;
            (inner.generation, inner.revision)
        };

        let result = backend.list_files(cancel.clone()).await;
        if cancel.is_cancelled() {
            debug!(generation, "load cancelled, result dropped");
            return Ok(LoadOutcome::Discarded);
        }

        let files = match result {
            Ok(files) => files,
            Err(BackendError::Cancelled) => return Ok(LoadOutcome::Discarded),
            Err(e) => {
                warn!(generation, error = %e, "failed to load file list");
                return Err(e.into());
            }
        };

        let mut inner = self.write();
        if inner.generation != generation {
            debug!(generation, latest = inner.generation, "superseded load dropped");
            return Ok(LoadOutcome::Discarded);
        }

        inner.apply_snapshot(&files, since);
        inner.loaded_at = Some(Utc::now());
        info!(files = inner.records.len(), "file list loaded");

        Ok(LoadOutcome::Applied(files))
    }

    /// Adds or replaces a record by identifier.
    pub fn insert(&self, record: FileRecord) {
        let mut inner = self.write();
        inner.record_change(&record.id, Some(record.clone()));
        if inner.records.insert(record.id.clone(), record).is_some() {
            debug!("record replaced");
        }
    }

    /// Removes a record. Absent identifiers are a no-op.
    pub fn remove(&self, id: &str) -> Option<FileRecord> {
        let mut inner = self.write();
        let removed = inner.records.remove(id);
        if removed.is_some() {
            inner.record_change(id, None);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.read().records.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Time of the last applied load.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.read().loaded_at
    }

    /// Fresh filtered and sorted projection. Never mutates the list.
    pub fn view(&self, query: &ViewQuery) -> Vec<FileRecord> {
        query.apply(self.read().records.values())
    }

    /// Deletes a file on the server.
    ///
    /// The record leaves the list immediately. If the server refuses, it is
    /// put back, unless a load issued meanwhile already settled the list.
    /// A 404 from the server counts as deleted.
    pub async fn delete(
        &self,
        backend: &dyn FileBackend,
        id: &str,
    ) -> Result<FileRecord, LibraryError> {
        let (record, generation) = {
            let mut inner = self.write();
            let record = inner
                .records
                .remove(id)
                .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
            (record, inner.generation)
        };

        match backend.delete_file(id).await {
            Ok(()) | Err(BackendError::NotFound) => {
                info!(file = %record.name, id, "file deleted");
                let mut inner = self.write();
                inner.records.remove(id);
                inner.record_change(id, None);
                Ok(record)
            }
            Err(e) => {
                warn!(file = %record.name, id, error = %e, "delete failed");
                let mut inner = self.write();
                if inner.generation == generation {
                    inner.records.entry(id.to_string()).or_insert(record);
                } else {
                    debug!(id, "list reloaded meanwhile, not restoring");
                }
                Err(e.into())
            }
        }
    }

    pub fn stats(&self) -> LibraryStats {
        let inner = self.read();
        let mut by_category: Vec<(MediaCategory, usize)> =
            MediaCategory::ALL.iter().map(|c| (*c, 0)).collect();
        let mut total_bytes = 0u64;

        for record in inner.records.values() {
            total_bytes = total_bytes.saturating_add(record.size);
            let category = record.category();
            if let Some(entry) = by_category.iter_mut().find(|(c, _)| *c == category) {
                entry.1 += 1;
            }
        }

        LibraryStats {
            count: inner.records.len(),
            total_bytes,
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bytes::Bytes;
    use chrono::TimeZone;
    use filedock_backend::{BackendFuture, ProgressCallback, UploadPayload};
    use tokio::sync::Notify;

    use super::*;
    use crate::query::SortKey;

    /// One scripted `list_files` answer.
    struct ListReply {
        wait: Option<Arc<Notify>>,
        result: Result<Vec<FileRecord>, &'static str>,
    }

    #[derive(Default)]
    struct MockBackend {
        lists: Mutex<VecDeque<ListReply>>,
        deletes: Mutex<VecDeque<Result<(), &'static str>>>,
        delete_gate: Option<Arc<Notify>>,
    }

    impl MockBackend {
        fn with_lists(lists: Vec<ListReply>) -> Self {
            Self {
                lists: Mutex::new(lists.into()),
                ..Default::default()
            }
        }
    }

    fn to_error(msg: &str) -> BackendError {
        match msg {
            "404" => BackendError::NotFound,
            other => BackendError::Network(other.to_string()),
        }
    }

    impl FileBackend for MockBackend {
        fn upload(
            &self,
            _payload: UploadPayload,
            _on_progress: ProgressCallback,
        ) -> BackendFuture<'_, FileRecord> {
            Box::pin(async { Err(BackendError::Network("unused".into())) })
        }

        fn list_files(&self, _cancel: CancellationToken) -> BackendFuture<'_, Vec<FileRecord>> {
            let reply = self.lists.lock().unwrap().pop_front();
            Box::pin(async move {
                let reply = reply.ok_or_else(|| BackendError::Network("no reply".into()))?;
                if let Some(wait) = reply.wait {
                    wait.notified().await;
                }
                reply.result.map_err(to_error)
            })
        }

        fn fetch_content<'a>(
            &'a self,
            _id: &'a str,
            _cancel: CancellationToken,
        ) -> BackendFuture<'a, Bytes> {
            Box::pin(async { Err(BackendError::NotFound) })
        }

        fn delete_file<'a>(&'a self, _id: &'a str) -> BackendFuture<'a, ()> {
            let reply = self.deletes.lock().unwrap().pop_front().unwrap_or(Ok(()));
            let gate = self.delete_gate.clone();
            Box::pin(async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                reply.map_err(to_error)
            })
        }
    }

    fn record(id: &str, name: &str, size: u64) -> FileRecord {
        FileRecord {
            id: id.into(),
            name: name.into(),
            size,
            media_type: "image/png".into(),
            encrypted: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ready(records: Vec<FileRecord>) -> ListReply {
        ListReply {
            wait: None,
            result: Ok(records),
        }
    }

    #[test]
    fn insert_is_idempotent_and_replaces() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "old.png", 1));
        lib.insert(record("a", "new.png", 2));

        assert_eq!(lib.len(), 1);
        assert_eq!(lib.get("a").unwrap().name, "new.png");
    }

    #[test]
    fn remove_absent_is_noop() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        assert!(lib.remove("missing").is_none());
        assert!(lib.remove("a").is_some());
        assert!(lib.remove("a").is_none());
        assert!(lib.is_empty());
    }

    #[test]
    fn view_does_not_mutate() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        lib.insert(record("b", "b.png", 2));

        let query = ViewQuery::default().with_search("a").with_sort(SortKey::Size);
        assert_eq!(lib.view(&query).len(), 1);
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.view(&query), lib.view(&query));
    }

    #[tokio::test]
    async fn load_replaces_list() {
        let lib = FileLibrary::new();
        lib.insert(record("stale", "stale.png", 1));
        let backend = MockBackend::with_lists(vec![ready(vec![
            record("a", "a.png", 1),
            record("b", "b.png", 2),
        ])]);

        let outcome = lib.load(&backend, CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Applied(ref files) if files.len() == 2));
        assert!(!lib.contains("stale"));
        assert!(lib.contains("a"));
        assert!(lib.loaded_at().is_some());
    }

    #[tokio::test]
    async fn superseded_load_is_discarded() {
        let gate = Arc::new(Notify::new());
        let backend = MockBackend::with_lists(vec![
            ListReply {
                wait: Some(gate.clone()),
                result: Ok(vec![record("old", "old.png", 1)]),
            },
            ready(vec![record("new", "new.png", 1)]),
        ]);
        let lib = FileLibrary::new();

        let first = lib.load(&backend, CancellationToken::new());
        let second = async {
            let outcome = lib.load(&backend, CancellationToken::new()).await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), LoadOutcome::Discarded);
        assert!(matches!(second.unwrap(), LoadOutcome::Applied(_)));
        assert!(lib.contains("new"));
        assert!(!lib.contains("old"));
    }

    #[tokio::test]
    async fn cancelled_load_is_discarded() {
        let backend = MockBackend::with_lists(vec![ready(vec![record("a", "a.png", 1)])]);
        let lib = FileLibrary::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = lib.load(&backend, cancel).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert!(lib.is_empty());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_snapshot() {
        let backend = MockBackend::with_lists(vec![
            ready(vec![record("a", "a.png", 1)]),
            ListReply {
                wait: None,
                result: Err("timeout"),
            },
        ]);
        let lib = FileLibrary::new();

        lib.load(&backend, CancellationToken::new()).await.unwrap();
        let err = lib.load(&backend, CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, LibraryError::Backend(ref e) if e.is_network()));
        assert_eq!(lib.len(), 1);
        assert!(lib.contains("a"));
    }

    #[tokio::test]
    async fn delete_confirmed() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        let backend = MockBackend::default();

        let removed = lib.delete(&backend, "a").await.unwrap();
        assert_eq!(removed.id, "a");
        assert!(!lib.contains("a"));
    }

    #[tokio::test]
    async fn delete_of_unknown_id() {
        let lib = FileLibrary::new();
        let backend = MockBackend::default();
        assert!(matches!(
            lib.delete(&backend, "ghost").await,
            Err(LibraryError::NotFound(id)) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn delete_server_not_found_counts_as_deleted() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        let backend = MockBackend {
            deletes: Mutex::new(VecDeque::from([Err("404")])),
            ..Default::default()
        };

        assert!(lib.delete(&backend, "a").await.is_ok());
        assert!(!lib.contains("a"));
    }

    #[tokio::test]
    async fn failed_delete_restores_record() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        let backend = MockBackend {
            deletes: Mutex::new(VecDeque::from([Err("connection reset")])),
            ..Default::default()
        };

        let err = lib.delete(&backend, "a").await.unwrap_err();
        assert!(matches!(err, LibraryError::Backend(_)));
        assert_eq!(lib.get("a").unwrap().name, "a.png");
    }

    #[tokio::test]
    async fn removal_is_visible_while_delete_in_flight() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        let gate = Arc::new(Notify::new());
        let backend = MockBackend {
            deletes: Mutex::new(VecDeque::from([Err("connection reset")])),
            delete_gate: Some(gate.clone()),
            ..Default::default()
        };

        let check = async {
            tokio::task::yield_now().await;
            assert!(!lib.contains("a"));
            gate.notify_one();
        };
        let (result, ()) = tokio::join!(lib.delete(&backend, "a"), check);

        assert!(result.is_err());
        assert!(lib.contains("a"));
    }

    #[tokio::test]
    async fn failed_delete_not_restored_after_reload() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        let gate = Arc::new(Notify::new());
        let backend = MockBackend {
            lists: Mutex::new(VecDeque::from([ready(vec![record("b", "b.png", 1)])])),
            deletes: Mutex::new(VecDeque::from([Err("connection reset")])),
            delete_gate: Some(gate.clone()),
        };

        let reload = async {
            let outcome = lib.load(&backend, CancellationToken::new()).await;
            gate.notify_one();
            outcome
        };
        let (deleted, loaded) = tokio::join!(lib.delete(&backend, "a"), reload);

        assert!(deleted.is_err());
        assert!(matches!(loaded.unwrap(), LoadOutcome::Applied(_)));
        assert!(!lib.contains("a"));
        assert!(lib.contains("b"));
    }

    #[tokio::test]
    async fn confirmed_delete_survives_slower_load() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 1));
        let gate = Arc::new(Notify::new());
        let backend = MockBackend::with_lists(vec![ListReply {
            wait: Some(gate.clone()),
            result: Ok(vec![record("a", "a.png", 1), record("b", "b.png", 1)]),
        }]);

        let delete_then_release = async {
            let deleted = lib.delete(&backend, "a").await;
            gate.notify_one();
            deleted
        };
        let (loaded, deleted) =
            tokio::join!(lib.load(&backend, CancellationToken::new()), delete_then_release);

        assert!(deleted.is_ok());
        assert!(matches!(loaded.unwrap(), LoadOutcome::Applied(_)));
        assert!(!lib.contains("a"));
        assert!(lib.contains("b"));
    }

    #[tokio::test]
    async fn insert_survives_slower_load() {
        let lib = FileLibrary::new();
        let gate = Arc::new(Notify::new());
        let backend = MockBackend::with_lists(vec![ListReply {
            wait: Some(gate.clone()),
            result: Ok(vec![]),
        }]);

        let insert_then_release = async {
            lib.insert(record("new", "new.png", 1));
            gate.notify_one();
        };
        let (loaded, ()) =
            tokio::join!(lib.load(&backend, CancellationToken::new()), insert_then_release);

        assert!(matches!(loaded.unwrap(), LoadOutcome::Applied(_)));
        assert!(lib.contains("new"));
    }

    #[tokio::test]
    async fn later_load_drops_replayed_changes() {
        let lib = FileLibrary::new();
        lib.insert(record("phantom", "phantom.png", 1));
        let backend = MockBackend::with_lists(vec![ready(vec![record("a", "a.png", 1)])]);

        lib.load(&backend, CancellationToken::new()).await.unwrap();
        assert!(!lib.contains("phantom"));
        assert!(lib.contains("a"));
    }

    #[test]
    fn stats_by_category() {
        let lib = FileLibrary::new();
        lib.insert(record("a", "a.png", 100));
        let mut doc = record("b", "b.pdf", 50);
        doc.media_type = "application/pdf".into();
        lib.insert(doc);

        let stats = lib.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_bytes, 150);
        assert_eq!(stats.by_category.len(), MediaCategory::ALL.len());
        assert!(stats.by_category.contains(&(MediaCategory::Image, 1)));
        assert!(stats.by_category.contains(&(MediaCategory::Document, 1)));
        assert!(stats.by_category.contains(&(MediaCategory::Video, 0)));
    }
}
