//! Progress samples shared by all backends and their status-text rendering.

use serde::{Deserialize, Serialize};

const MIB: f64 = 1024.0 * 1024.0;

/// Text of the first status message of every job
pub const INITIAL_STATUS: &str = "Downloading...";

/// Backend-specific fields needed to render a status line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ProgressExtra {
    /// Remote media reports bytes only
    RemoteMedia,
    /// HTTP downloader
    Http {
        /// Percentage 0.0..=100.0
        percent: f64,
        /// Name the file is being saved as
        file_name: String,
    },
    /// Swarm client
    Swarm {
        /// Percentage 0.0..=100.0
        percent: f64,
        /// Current download rate in bytes per second
        rate_bps: u64,
        /// Swarm display name
        swarm_name: String,
    },
}

/// One progress observation, pushed through the job's event channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Bytes transferred so far
    pub downloaded_bytes: u64,
    /// Total bytes, 0 if unknown
    pub total_bytes: u64,
    /// Backend-specific fields
    pub extra: ProgressExtra,
}

impl ProgressSample {
    /// Percentage from the byte counters, or 0 when the total is unknown
    pub fn byte_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.downloaded_bytes as f64 / self.total_bytes as f64 * 100.0
        }
    }

    /// Human-readable status text for this sample
    pub fn render(&self) -> String {
        match &self.extra {
            ProgressExtra::RemoteMedia => format!(
                "{INITIAL_STATUS}\n\nProgression {:.1} %\nDownloaded: {:.2}MB\nTotal: {:.2}MB",
                self.byte_percent(),
                self.downloaded_bytes as f64 / MIB,
                self.total_bytes as f64 / MIB,
            ),
            ProgressExtra::Http { percent, file_name } => {
                format!("Downloading {}\n\nProgress: {}", file_name, percent.floor() as u64)
            }
            ProgressExtra::Swarm {
                percent,
                rate_bps,
                swarm_name,
            } => format!(
                "{INITIAL_STATUS}\n\nTorrent Name: {}\nTorrent Size: {}mb\n\nProgression {:.1}%\nDownloaded: {:.2}mb\nSpeed: {:.2}mb/s",
                swarm_name,
                self.total_bytes / (1024 * 1024),
                percent,
                self.downloaded_bytes as f64 / MIB,
                *rate_bps as f64 / MIB,
            ),
        }
    }
}
