//! One view's preview: at most one open handle, released on every exit path.

use bytes::Bytes;
use filedock_backend::FileBackend;
use filedock_protocol::FileRecord;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::PreviewError;
use crate::manager::{PreviewHandle, PreviewManager};

/// Holds the handle currently displayed by one view instance.
pub struct PreviewSlot {
    manager: PreviewManager,
    current: Option<PreviewHandle>,
}

impl PreviewSlot {
    pub fn new(manager: PreviewManager) -> Self {
        Self {
            manager,
            current: None,
        }
    }

    /// Opens a preview of `record`, closing the previous handle first.
    ///
    /// On error the slot is left empty.
    pub async fn show(
        &mut self,
        backend: &dyn FileBackend,
        record: &FileRecord,
        cancel: CancellationToken,
    ) -> Result<&PreviewHandle, PreviewError> {
        self.clear();
        let handle = self.manager.open(backend, record, cancel).await?;
        Ok(self.current.insert(handle))
    }

    pub fn current(&self) -> Option<&PreviewHandle> {
        self.current.as_ref()
    }

    /// Content of the displayed handle, if any.
    pub fn content(&self) -> Option<Result<Bytes, PreviewError>> {
        self.current.as_ref().map(|h| self.manager.resolve(h))
    }

    /// Closes the displayed handle, if any.
    pub fn clear(&mut self) {
        let Some(handle) = self.current.take() else {
            return;
        };
        if let Err(e) = self.manager.close(&handle) {
            warn!(error = %e, "preview handle was released elsewhere");
        }
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.clear();
    }
}
