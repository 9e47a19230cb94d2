//! Registry of live preview and download handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use filedock_backend::{BackendError, FileBackend};
use filedock_protocol::{FileRecord, is_inline_previewable};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::PreviewError;

const OBJECT_URL_PREFIX: &str = "blob:filedock/";

/// A memory-backed reference to fetched content.
///
/// Not `Clone`: exactly one owner releases it through
/// [`PreviewManager::close`].
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    url: String,
    record: FileRecord,
    inline: bool,
}

impl PreviewHandle {
    /// Opaque revocable reference for the view layer.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    /// False when the handle carries no content to render inline.
    pub fn has_inline_preview(&self) -> bool {
        self.inline
    }
}

/// Cloneable registry of live handles and their buffers.
#[derive(Debug, Clone, Default)]
pub struct PreviewManager {
    live: Arc<Mutex<HashMap<Uuid, Option<Bytes>>>>,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashMap<Uuid, Option<Bytes>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a preview for `record`.
    ///
    /// Content is fetched only for inline-previewable types. Other types get
    /// a handle flagged as having no inline preview, and nothing is fetched.
    pub async fn open(
        &self,
        backend: &dyn FileBackend,
        record: &FileRecord,
        cancel: CancellationToken,
    ) -> Result<PreviewHandle, PreviewError> {
        if !is_inline_previewable(&record.media_type) {
            debug!(file = %record.name, media_type = %record.media_type, "no inline preview");
            return Ok(self.register(record.clone(), None));
        }
        let content = fetch(backend, record, cancel).await?;
        Ok(self.register(record.clone(), Some(content)))
    }

    /// Fetches the full content of `record` for saving, whatever its type.
    pub async fn open_download(
        &self,
        backend: &dyn FileBackend,
        record: &FileRecord,
        cancel: CancellationToken,
    ) -> Result<PreviewHandle, PreviewError> {
        let content = fetch(backend, record, cancel).await?;
        Ok(self.register(record.clone(), Some(content)))
    }

    fn register(&self, record: FileRecord, content: Option<Bytes>) -> PreviewHandle {
        let id = Uuid::new_v4();
        let inline = content.is_some();
        self.live().insert(id, content);

        let handle = PreviewHandle {
            id,
            url: format!("{OBJECT_URL_PREFIX}{id}"),
            record,
            inline,
        };
        debug!(url = %handle.url, file = %handle.record.name, "handle opened");
        handle
    }

    /// Content behind a live handle.
    pub fn resolve(&self, handle: &PreviewHandle) -> Result<Bytes, PreviewError> {
        match self.live().get(&handle.id) {
            None => Err(PreviewError::AlreadyReleased(handle.url.clone())),
            Some(None) => Err(PreviewError::NoInlinePreview(handle.record.name.clone())),
            Some(Some(content)) => Ok(content.clone()),
        }
    }

    /// Revokes the handle and drops the registry's reference to its buffer.
    ///
    /// Closing twice is an error.
    pub fn close(&self, handle: &PreviewHandle) -> Result<(), PreviewError> {
        match self.live().remove(&handle.id) {
            Some(_) => {
                debug!(url = %handle.url, "handle closed");
                Ok(())
            }
            None => Err(PreviewError::AlreadyReleased(handle.url.clone())),
        }
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live().contains_key(&handle.id)
    }

    /// Number of handles opened and not yet closed.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }
}

async fn fetch(
    backend: &dyn FileBackend,
    record: &FileRecord,
    cancel: CancellationToken,
) -> Result<Bytes, PreviewError> {
    let result = backend.fetch_content(&record.id, cancel.clone()).await;
    if cancel.is_cancelled() {
        return Err(PreviewError::Cancelled);
    }
    match result {
        Ok(content) => Ok(content),
        Err(BackendError::Cancelled) => Err(PreviewError::Cancelled),
        Err(e) => Err(e.into()),
    }
}
