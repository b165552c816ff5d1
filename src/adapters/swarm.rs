//! Swarm adapter: torrent or magnet transfer through a swarm client.
//!
//! The adapter joins the swarm, polls the client's statistics until the transfer is
//! finished or reports an error, and always tears the swarm handle down afterwards
//! so that network activity stops promptly. Downloaded data is kept.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{BackendEvent, report};
use crate::error::TransferError;
use crate::progress::{ProgressExtra, ProgressSample};
use crate::types::OutputFile;

/// What to hand to the swarm client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SwarmInput {
    /// Magnet URI (or any URI the client resolves itself)
    Uri(String),
    /// Local `.torrent` descriptor
    TorrentFile(PathBuf),
}

impl SwarmInput {
    /// String form stored in the job's source
    pub fn as_source_string(&self) -> String {
        match self {
            SwarmInput::Uri(uri) => uri.clone(),
            SwarmInput::TorrentFile(path) => path.display().to_string(),
        }
    }
}

/// Client-specific identifier of a joined swarm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwarmHandle(pub i64);

/// One file of a swarm, as ordered by the swarm itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmFile {
    /// Path relative to the download directory, `/`-separated
    pub path: String,
    /// Size in bytes
    pub length: u64,
}

/// Snapshot of a swarm's transfer statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmStats {
    /// Swarm display name
    pub name: String,
    /// Whether the descriptor (metadata) is known yet
    pub metadata_ready: bool,
    /// Size of the wanted content in bytes
    pub total_bytes: u64,
    /// Bytes of wanted content already present
    pub downloaded_bytes: u64,
    /// Completion percentage 0.0..=100.0
    pub percent: f64,
    /// Current download rate in bytes per second
    pub rate_bps: u64,
    /// All wanted data is present
    pub finished: bool,
    /// Fatal swarm-level error, if any
    pub error: Option<String>,
    /// Files in swarm order
    pub files: Vec<SwarmFile>,
}

/// Abstraction over a peer-to-peer swarm client, enabling testability.
#[async_trait::async_trait]
pub trait SwarmClient: Send + Sync {
    /// Join the swarm, storing data under `download_dir`
    async fn add(&self, input: &SwarmInput, download_dir: &Path)
    -> Result<SwarmHandle, TransferError>;

    /// Current statistics of a joined swarm
    async fn stats(&self, handle: SwarmHandle) -> Result<SwarmStats, TransferError>;

    /// Leave the swarm, keeping downloaded data
    async fn remove(&self, handle: SwarmHandle) -> Result<(), TransferError>;
}

/// Runs one swarm transfer to completion
pub struct SwarmAdapter {
    client: Arc<dyn SwarmClient>,
    input: SwarmInput,
    output_dir: PathBuf,
    poll_interval: Duration,
}

impl SwarmAdapter {
    /// Create an adapter for `input`
    pub fn new(
        client: Arc<dyn SwarmClient>,
        input: SwarmInput,
        output_dir: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            input,
            output_dir,
            poll_interval,
        }
    }

    pub(super) async fn run(
        self,
        events: &mpsc::Sender<BackendEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutputFile>, TransferError> {
        let handle = tokio::select! {
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            res = self.client.add(&self.input, &self.output_dir) => res?,
        };
        tracing::debug!(handle = handle.0, input = ?self.input, "Joined swarm");

        let result = self.watch(handle, events, cancel).await;

        if let Err(e) = self.client.remove(handle).await {
            tracing::warn!(handle = handle.0, error = %e, "Failed to release swarm handle");
        } else {
            tracing::debug!(handle = handle.0, "Released swarm handle");
        }

        // The client has parsed the descriptor by now; drop the materialized copy.
        if let SwarmInput::TorrentFile(path) = &self.input
            && let Err(e) = tokio::fs::remove_file(path).await
        {
            tracing::debug!(path = %path.display(), error = %e, "Could not remove torrent descriptor");
        }

        result
    }

    async fn watch(
        &self,
        handle: SwarmHandle,
        events: &mpsc::Sender<BackendEvent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutputFile>, TransferError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                _ = ticker.tick() => {}
            }

            let stats = self.client.stats(handle).await?;
            if let Some(error) = stats.error {
                return Err(TransferError::Swarm(error));
            }
            if !stats.metadata_ready {
                continue;
            }

            report(
                events,
                ProgressSample {
                    downloaded_bytes: stats.downloaded_bytes,
                    total_bytes: stats.total_bytes,
                    extra: ProgressExtra::Swarm {
                        percent: stats.percent,
                        rate_bps: stats.rate_bps,
                        swarm_name: stats.name.clone(),
                    },
                },
            )
            .await;

            if stats.finished {
                let outputs = outputs_from(&stats.files);
                if outputs.is_empty() {
                    return Err(TransferError::Swarm(format!(
                        "swarm '{}' finished without files",
                        stats.name
                    )));
                }
                return Ok(outputs);
            }
        }
    }
}

/// Map swarm files to output files, keeping swarm order.
pub fn outputs_from(files: &[SwarmFile]) -> Vec<OutputFile> {
    files
        .iter()
        .filter_map(|file| {
            let segments: Vec<String> = file
                .path
                .split(['/', '\\'])
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let name = segments.last()?.clone();
            Some(OutputFile {
                name,
                size_bytes: file.length,
                path_segments: segments,
            })
        })
        .collect()
}
