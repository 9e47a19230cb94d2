//! The signed-in workspace: one session and the components bound to it.

use std::sync::Arc;

use bytes::Bytes;
use filedock_backend::{FileBackend, HttpBackend, Session, UserIdentity};
use filedock_library::{FileLibrary, LibraryError, LibraryStats, LoadOutcome, ViewQuery};
use filedock_preview::{PreviewError, PreviewHandle, PreviewManager, PreviewSlot};
use filedock_protocol::FileRecord;
use filedock_transfer::{CandidateFile, Rejection, admit};
use filedock_upload::{BatchOutcome, UploadBatch, UploadEvent, UploadOrchestrator};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("file {0} is no longer in the list")]
    RecordGone(String),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Preview(#[from] PreviewError),
}

/// Everything one signed-in user works with.
///
/// The file list is owned here; callers only get projections of it.
pub struct Workspace {
    session: Session,
    backend: Arc<dyn FileBackend>,
    library: FileLibrary,
    batch: UploadBatch,
    orchestrator: UploadOrchestrator,
    previews: PreviewManager,
}

impl Workspace {
    pub fn new(session: Session, backend: Arc<dyn FileBackend>, upload_concurrency: usize) -> Self {
        Self {
            session,
            backend,
            library: FileLibrary::new(),
            batch: UploadBatch::new(),
            orchestrator: UploadOrchestrator::new(upload_concurrency),
            previews: PreviewManager::new(),
        }
    }

    /// Signs in with the configured token and wires the HTTP backend.
    pub fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        if config.token.is_empty() {
            anyhow::bail!(
                "no API token configured; run `filedock config --token <TOKEN>` or set FILEDOCK_TOKEN"
            );
        }
        let name = if config.user_name.is_empty() {
            "me".to_string()
        } else {
            config.user_name.clone()
        };
        let user = UserIdentity {
            id: if config.user_id.is_empty() {
                name.clone()
            } else {
                config.user_id.clone()
            },
            name,
        };
        let session = Session::sign_in(user, config.token.clone());
        let backend = HttpBackend::new(&config.backend_config(), session.clone())?;
        Ok(Self::new(session, Arc::new(backend), config.upload_concurrency))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    pub fn previews(&self) -> &PreviewManager {
        &self.previews
    }

    /// Takes the upload event receiver. Can only be called once.
    pub fn take_upload_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.orchestrator.take_events()
    }

    /// Runs the admission policy and queues the accepted files.
    ///
    /// Returns the rejected file names with their reason.
    pub fn stage(&self, candidates: Vec<CandidateFile>) -> Vec<(String, Rejection)> {
        let admission = admit(candidates);
        debug!(
            accepted = admission.accepted.len(),
            rejected = admission.rejected.len(),
            "selection staged"
        );
        self.batch.extend(admission.accepted);
        admission.rejected
    }

    /// Uploads every queued file. Each new record joins the list as soon as
    /// its upload succeeds.
    pub async fn upload_all(&self) -> BatchOutcome {
        let library = &self.library;
        self.orchestrator
            .upload_batch_with(&self.batch, self.backend.as_ref(), &|record| {
                library.insert(record.clone())
            })
            .await
    }

    /// Reloads the list from the server. Cancelled by sign-out.
    pub async fn refresh(&self) -> Result<LoadOutcome, LibraryError> {
        self.library
            .load(self.backend.as_ref(), self.session.child_token())
            .await
    }

    pub fn files(&self, query: &ViewQuery) -> Vec<FileRecord> {
        self.library.view(query)
    }

    pub fn file(&self, id: &str) -> Option<FileRecord> {
        self.library.get(id)
    }

    pub fn stats(&self) -> LibraryStats {
        self.library.stats()
    }

    pub async fn delete(&self, id: &str) -> Result<FileRecord, LibraryError> {
        self.library.delete(self.backend.as_ref(), id).await
    }

    /// A preview slot for one view.
    pub fn preview_slot(&self) -> PreviewSlot {
        PreviewSlot::new(self.previews.clone())
    }

    /// Shows `id` in `slot`. Files no longer in the list are refused
    /// without a fetch.
    pub async fn preview<'s>(
        &self,
        slot: &'s mut PreviewSlot,
        id: &str,
    ) -> Result<&'s PreviewHandle, WorkspaceError> {
        let record = self
            .library
            .get(id)
            .ok_or_else(|| WorkspaceError::RecordGone(id.to_string()))?;
        let handle = slot
            .show(self.backend.as_ref(), &record, self.session.child_token())
            .await?;
        Ok(handle)
    }

    /// Fetches the full content of `id`. The download handle is released
    /// before returning.
    pub async fn download(&self, id: &str) -> Result<(FileRecord, Bytes), WorkspaceError> {
        let record = self
            .library
            .get(id)
            .ok_or_else(|| WorkspaceError::RecordGone(id.to_string()))?;
        let handle = self
            .previews
            .open_download(self.backend.as_ref(), &record, self.session.child_token())
            .await?;
        let content = self.previews.resolve(&handle);
        self.previews.close(&handle)?;
        Ok((record, content?))
    }

    /// Ends the session. Outstanding fetches are cancelled.
    pub fn sign_out(&self) {
        self.batch.dismiss();
        self.session.sign_out();
        info!(live_previews = self.previews.live_count(), "workspace closed");
    }
}
