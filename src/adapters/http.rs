//! HTTP adapter: direct URL download.
//!
//! The body is streamed to disk while a background reporter samples the byte
//! counter on a fixed interval, so the job sees the same kind of progress samples
//! as from push-based backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::remote_media::remove_partial;
use super::{BackendEvent, report};
use crate::error::TransferError;
use crate::naming;
use crate::progress::{ProgressExtra, ProgressSample};
use crate::types::OutputFile;
use crate::utils::remote_file_name;

/// Downloads one URL into the output directory
pub struct HttpAdapter {
    client: reqwest::Client,
    url: String,
    output_dir: PathBuf,
    poll_interval: Duration,
}

impl HttpAdapter {
    /// Create an adapter for `url`
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        output_dir: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            output_dir,
            poll_interval,
        }
    }

    pub(super) async fn run(
        self,
        events: &mpsc::Sender<BackendEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutputFile>, TransferError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            res = self.client.get(&self.url).send() => res?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        // The remote name is known once headers arrive; rename right away.
        let remote_name = remote_file_name(&response, &self.url);
        let name = naming::assign(&remote_name);
        let total_bytes = response.content_length().unwrap_or(0);
        let dest = self.output_dir.join(&name);

        tracing::debug!(
            url = %self.url,
            remote_name = %remote_name,
            assigned_name = %name,
            total_bytes,
            "HTTP download started"
        );

        let downloaded = Arc::new(AtomicU64::new(0));
        let reporter_cancel = cancel.child_token();
        let reporter = spawn_progress_reporter(ProgressReporterParams {
            file_name: name.clone(),
            total_bytes,
            downloaded: downloaded.clone(),
            events: events.clone(),
            interval: self.poll_interval,
            cancel: reporter_cancel.clone(),
        });

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(TransferError::Cancelled),
            res = stream_to_file(response, &dest, &downloaded) => res,
        };

        reporter_cancel.cancel();
        if let Err(e) = reporter.await {
            tracing::warn!(error = %e, "Progress reporter task failed");
        }

        match result {
            Ok(size_bytes) => Ok(vec![OutputFile::flat(name, size_bytes)]),
            Err(e) => {
                remove_partial(&dest).await;
                Err(e)
            }
        }
    }
}

async fn stream_to_file(
    mut response: reqwest::Response,
    dest: &Path,
    downloaded: &AtomicU64,
) -> Result<u64, TransferError> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| TransferError::io(dest, e))?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(dest, e))?;
        downloaded.fetch_add(chunk.len() as u64, Ordering::Relaxed);
    }

    file.flush().await.map_err(|e| TransferError::io(dest, e))?;
    Ok(downloaded.load(Ordering::Relaxed))
}

/// Parameters for spawning a progress reporter background task
struct ProgressReporterParams {
    file_name: String,
    total_bytes: u64,
    downloaded: Arc<AtomicU64>,
    events: mpsc::Sender<BackendEvent>,
    interval: Duration,
    cancel: CancellationToken,
}

/// Spawn a background task that periodically samples the byte counter.
fn spawn_progress_reporter(params: ProgressReporterParams) -> tokio::task::JoinHandle<()> {
    let ProgressReporterParams {
        file_name,
        total_bytes,
        downloaded,
        events,
        interval,
        cancel,
    } = params;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = downloaded.load(Ordering::Relaxed);
                    let percent = if total_bytes > 0 {
                        current as f64 / total_bytes as f64 * 100.0
                    } else {
                        0.0
                    };
                    report(&events, ProgressSample {
                        downloaded_bytes: current,
                        total_bytes,
                        extra: ProgressExtra::Http {
                            percent,
                            file_name: file_name.clone(),
                        },
                    })
                    .await;
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}
