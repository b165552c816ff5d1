//! Remote-media adapter: a video attached to a chat message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{BackendEvent, report};
use crate::error::TransferError;
use crate::naming;
use crate::progress::{ProgressExtra, ProgressSample};
use crate::types::{Attachment, OutputFile};

/// Byte counters pushed by a [`MediaSource`] while it downloads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaProgress {
    /// Bytes written so far
    pub downloaded_bytes: u64,
    /// Expected total, 0 if unknown
    pub total_bytes: u64,
}

/// Abstraction over the chat platform's media fetch API, enabling testability.
#[async_trait::async_trait]
pub trait MediaSource: Send + Sync {
    /// Download `attachment` into `dest`, pushing byte counters into `progress`.
    ///
    /// Returns the number of bytes written.
    async fn download(
        &self,
        attachment: &Attachment,
        dest: &Path,
        progress: mpsc::Sender<MediaProgress>,
    ) -> Result<u64, TransferError>;
}

/// Fetches one chat attachment into the output directory
pub struct RemoteMediaAdapter {
    source: Arc<dyn MediaSource>,
    attachment: Attachment,
    output_dir: PathBuf,
}

impl RemoteMediaAdapter {
    /// Create an adapter for `attachment`
    pub fn new(source: Arc<dyn MediaSource>, attachment: Attachment, output_dir: PathBuf) -> Self {
        Self {
            source,
            attachment,
            output_dir,
        }
    }

    pub(super) async fn run(
        self,
        events: &mpsc::Sender<BackendEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutputFile>, TransferError> {
        let extension = self
            .attachment
            .file_name
            .as_deref()
            .and_then(naming::extension_of)
            .or_else(|| {
                self.attachment
                    .mime_type
                    .as_deref()
                    .and_then(naming::extension_for_mime)
            });
        let name = naming::assign_with_extension(extension);
        let dest = self.output_dir.join(&name);

        tracing::debug!(
            attachment = %self.attachment.id.0,
            original_name = ?self.attachment.file_name,
            mime_type = ?self.attachment.mime_type,
            assigned_name = %name,
            "Fetching chat attachment"
        );

        let (progress_tx, mut progress_rx) = mpsc::channel::<MediaProgress>(16);
        let download = self.source.download(&self.attachment, &dest, progress_tx);
        tokio::pin!(download);

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(TransferError::Cancelled),
                Some(p) = progress_rx.recv() => {
                    report(events, ProgressSample {
                        downloaded_bytes: p.downloaded_bytes,
                        total_bytes: p.total_bytes,
                        extra: ProgressExtra::RemoteMedia,
                    })
                    .await;
                }
                res = &mut download => break res,
            }
        };

        match result {
            Ok(size_bytes) => Ok(vec![OutputFile::flat(name, size_bytes)]),
            Err(e) => {
                remove_partial(&dest).await;
                Err(e)
            }
        }
    }
}

/// Delete a partially written output, if any.
pub(crate) async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial download")
        }
    }
}
