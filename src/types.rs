//! Core types for relay-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chat the trigger came from (Bot API `chat.id`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatRef(pub i64);

/// A message inside a chat (Bot API `message_id`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub i64);

/// Opaque attachment handle (Bot API `file_id`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(pub String);

/// A file attached to a chat message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Handle used to fetch the content
    pub id: AttachmentRef,
    /// File name declared by the sender, if any
    pub file_name: Option<String>,
    /// Declared size in bytes, if known
    pub size_bytes: Option<u64>,
    /// Declared MIME type, if any
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Unique identifier for a job, derived from the triggering message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId {
    /// Chat of the triggering message
    pub chat: ChatRef,
    /// The triggering message
    pub message: MessageRef,
}

impl JobId {
    /// Create a JobId from the originating chat and message
    pub fn new(chat: ChatRef, message: MessageRef) -> Self {
        Self { chat, message }
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chat.0, self.message.0)
    }
}

/// Resolved transfer source of a job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSource {
    /// Video attached to a chat message
    RemoteMedia {
        /// Chat holding the message
        chat_id: i64,
        /// Message carrying the attachment
        message_id: i64,
    },
    /// Plain HTTP(S) URL
    DirectUrl {
        /// The URL to fetch
        url: String,
    },
    /// Magnet URI or local `.torrent` path
    Torrent {
        /// Magnet URI, or path of a materialized `.torrent` file
        magnet_or_file_path: String,
    },
}

impl JobSource {
    /// Which backend serves this source
    pub fn backend_kind(&self) -> BackendKind {
        match self {
            JobSource::RemoteMedia { .. } => BackendKind::RemoteMedia,
            JobSource::DirectUrl { .. } => BackendKind::Http,
            JobSource::Torrent { .. } => BackendKind::Swarm,
        }
    }
}

/// Backend variants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Remote-media fetch API
    RemoteMedia,
    /// HTTP downloader
    Http,
    /// Peer-to-peer swarm client
    Swarm,
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, not started yet
    Pending,
    /// Backend is transferring
    Running,
    /// Finished, outputs published
    Completed,
    /// Finished with an error
    Failed,
}

impl JobState {
    /// Completed and Failed are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// One file produced by a job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// Display name of the file
    pub name: String,
    /// Size on disk in bytes
    pub size_bytes: u64,
    /// Location relative to the output directory, one element per path component
    pub path_segments: Vec<String>,
}

impl OutputFile {
    /// A file stored directly under the output directory
    pub fn flat(name: impl Into<String>, size_bytes: u64) -> Self {
        let name = name.into();
        Self {
            path_segments: vec![name.clone()],
            name,
            size_bytes,
        }
    }

    /// Path of the file relative to the output directory
    pub fn relative_path(&self) -> PathBuf {
        self.path_segments.iter().collect()
    }
}

/// Snapshot of a job for the status API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobInfo {
    /// Job ID
    pub id: String,
    /// Transfer source
    pub source: JobSource,
    /// Current state
    pub state: JobState,
    /// Published outputs (empty unless completed)
    pub outputs: Vec<OutputFile>,
    /// When the job started
    pub started_at: DateTime<Utc>,
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and backend started
    JobStarted {
        /// Job ID
        id: JobId,
        /// Backend serving the job
        backend: BackendKind,
    },

    /// A progress update passed the throttle
    Progress {
        /// Job ID
        id: JobId,
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total bytes, 0 if unknown
        total_bytes: u64,
        /// Rendered status text
        text: String,
    },

    /// Job finished and links were published
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Produced files, in publication order
        outputs: Vec<OutputFile>,
        /// One retrieval link per output
        links: Vec<String>,
    },

    /// Job failed
    JobFailed {
        /// Job ID
        id: JobId,
        /// Technical error description
        error: String,
    },

    /// Orchestrator is shutting down
    Shutdown,
}
