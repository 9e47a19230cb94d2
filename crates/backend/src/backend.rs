//! The storage API seam.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use filedock_protocol::FileRecord;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// Boxed future returned by [`FileBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Callback invoked with `(bytes_sent, bytes_total)` while an upload body is
/// transmitted. Calls arrive in non-decreasing order.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

/// Abstract access to the storage API.
///
/// The application wires in [`HttpBackend`](crate::HttpBackend); tests use
/// in-memory mocks.
pub trait FileBackend: Send + Sync {
    /// Uploads one file and returns the server's record for it.
    fn upload(&self, payload: UploadPayload, on_progress: ProgressCallback)
    -> BackendFuture<'_, FileRecord>;

    /// Lists the signed-in user's files.
    ///
    /// Resolves with [`BackendError::Cancelled`] once `cancel` fires.
    fn list_files(&self, cancel: CancellationToken) -> BackendFuture<'_, Vec<FileRecord>>;

    /// Fetches the raw content of one file.
    fn fetch_content<'a>(
        &'a self,
        id: &'a str,
        cancel: CancellationToken,
    ) -> BackendFuture<'a, Bytes>;

    /// Deletes one file.
    fn delete_file<'a>(&'a self, id: &'a str) -> BackendFuture<'a, ()>;
}
