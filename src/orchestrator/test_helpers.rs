//! Shared test helpers: an in-memory notifier and scripted backends.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::adapters::{
    MediaProgress, MediaSource, SwarmClient, SwarmFile, SwarmHandle, SwarmInput, SwarmStats,
};
use crate::config::Config;
use crate::error::{Error, Result, TransferError};
use crate::notifier::Notifier;
use crate::orchestrator::{Collaborators, Orchestrator};
use crate::types::{Attachment, AttachmentRef, ChatRef, MessageRef};

pub(crate) const TEST_HOST: &str = "http://host";

/// One call made against the [`RecordingNotifier`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum NotifierCall {
    Send {
        chat: ChatRef,
        text: String,
        reply_to: Option<MessageRef>,
        handle: MessageRef,
    },
    Edit {
        message: MessageRef,
        text: String,
    },
    Delete {
        message: MessageRef,
    },
    React {
        message: MessageRef,
        emoji: String,
    },
}

/// Notifier that records every call and hands out increasing message ids
pub(crate) struct RecordingNotifier {
    calls: std::sync::Mutex<Vec<NotifierCall>>,
    next_id: AtomicI64,
    file_base: std::sync::Mutex<String>,
    pub(crate) fail_edits: AtomicBool,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: std::sync::Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            file_base: std::sync::Mutex::new("http://files.invalid".to_string()),
            fail_edits: AtomicBool::new(false),
        })
    }

    /// Base URL attachment links point at
    pub(crate) fn set_file_base(&self, base: impl Into<String>) {
        *self.file_base.lock().unwrap() = base.into();
    }

    pub(crate) fn calls(&self) -> Vec<NotifierCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of all sent messages, in order
    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                NotifierCall::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: NotifierCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef> {
        let handle = MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.record(NotifierCall::Send {
            chat,
            text: text.to_string(),
            reply_to,
            handle,
        });
        Ok(handle)
    }

    async fn edit_message(&self, _chat: ChatRef, message: MessageRef, text: &str) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::Notification("message to edit not found".into()));
        }
        self.record(NotifierCall::Edit {
            message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatRef, message: MessageRef) -> Result<()> {
        self.record(NotifierCall::Delete { message });
        Ok(())
    }

    async fn attachment_link(&self, attachment: &AttachmentRef) -> Result<String> {
        Ok(format!(
            "{}/files/{}",
            self.file_base.lock().unwrap(),
            attachment.0
        ))
    }

    async fn react(&self, _chat: ChatRef, message: MessageRef, emoji: &str) -> Result<()> {
        self.record(NotifierCall::React {
            message,
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}

/// Media source writing a fixed payload, or failing after half of it
pub(crate) struct FakeMedia {
    pub(crate) payload: Vec<u8>,
    pub(crate) fail: bool,
}

#[async_trait::async_trait]
impl MediaSource for FakeMedia {
    async fn download(
        &self,
        _attachment: &Attachment,
        dest: &Path,
        progress: mpsc::Sender<MediaProgress>,
    ) -> std::result::Result<u64, TransferError> {
        let total = self.payload.len() as u64;
        progress
            .send(MediaProgress {
                downloaded_bytes: total / 2,
                total_bytes: total,
            })
            .await
            .ok();
        if self.fail {
            return Err(TransferError::Media("connection reset by peer".into()));
        }
        tokio::fs::write(dest, &self.payload)
            .await
            .map_err(|e| TransferError::io(dest, e))?;
        Ok(total)
    }
}

/// Media source that pushes byte counters on a schedule, then writes its payload.
///
/// Each step waits `after` since the previous step; meant for paused-clock tests.
pub(crate) struct ScriptedMedia {
    pub(crate) steps: Vec<(Duration, MediaProgress)>,
    pub(crate) payload: Vec<u8>,
}

#[async_trait::async_trait]
impl MediaSource for ScriptedMedia {
    async fn download(
        &self,
        _attachment: &Attachment,
        dest: &Path,
        progress: mpsc::Sender<MediaProgress>,
    ) -> std::result::Result<u64, TransferError> {
        for (after, sample) in &self.steps {
            tokio::time::sleep(*after).await;
            progress.send(*sample).await.ok();
        }
        tokio::fs::write(dest, &self.payload)
            .await
            .map_err(|e| TransferError::io(dest, e))?;
        Ok(self.payload.len() as u64)
    }
}

/// Swarm client that finishes on the first poll with the given files, or never
pub(crate) struct FakeSwarm {
    pub(crate) name: String,
    pub(crate) files: Vec<SwarmFile>,
    pub(crate) stall: bool,
    pub(crate) added: std::sync::Mutex<Vec<SwarmInput>>,
    pub(crate) removed: AtomicBool,
}

impl FakeSwarm {
    pub(crate) fn finishing(name: &str, files: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            files: files
                .iter()
                .map(|(path, length)| SwarmFile {
                    path: path.to_string(),
                    length: *length,
                })
                .collect(),
            stall: false,
            added: std::sync::Mutex::new(Vec::new()),
            removed: AtomicBool::new(false),
        })
    }

    pub(crate) fn stalling() -> Arc<Self> {
        Arc::new(Self {
            name: "Stuck".to_string(),
            files: Vec::new(),
            stall: true,
            added: std::sync::Mutex::new(Vec::new()),
            removed: AtomicBool::new(false),
        })
    }
}

#[async_trait::async_trait]
impl SwarmClient for FakeSwarm {
    async fn add(
        &self,
        input: &SwarmInput,
        _download_dir: &Path,
    ) -> std::result::Result<SwarmHandle, TransferError> {
        self.added.lock().unwrap().push(input.clone());
        Ok(SwarmHandle(1))
    }

    async fn stats(&self, _handle: SwarmHandle) -> std::result::Result<SwarmStats, TransferError> {
        let total: u64 = self.files.iter().map(|f| f.length).sum();
        Ok(SwarmStats {
            name: self.name.clone(),
            metadata_ready: true,
            total_bytes: total,
            downloaded_bytes: if self.stall { 0 } else { total },
            percent: if self.stall { 0.0 } else { 100.0 },
            rate_bps: 0,
            finished: !self.stall,
            error: None,
            files: self.files.clone(),
        })
    }

    async fn remove(&self, _handle: SwarmHandle) -> std::result::Result<(), TransferError> {
        self.removed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything a test needs to drive and observe an orchestrator
pub(crate) struct TestRig {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) swarm: Arc<FakeSwarm>,
    pub(crate) temp_dir: tempfile::TempDir,
}

/// Orchestrator over a temp output directory and fast polling intervals.
pub(crate) fn create_test_rig(media: impl MediaSource + 'static, swarm: Arc<FakeSwarm>) -> TestRig {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.output.output_dir = temp_dir.path().join("downloads");
    config.output.public_host = TEST_HOST.to_string();
    config.progress.http_poll_interval = Duration::from_millis(20);
    config.progress.swarm_poll_interval = Duration::from_millis(10);

    let notifier = RecordingNotifier::new();
    let orchestrator = Orchestrator::new(
        config,
        Collaborators {
            notifier: notifier.clone(),
            media: Arc::new(media),
            swarm: swarm.clone(),
            http: reqwest::Client::new(),
        },
    );

    TestRig {
        orchestrator,
        notifier,
        swarm,
        temp_dir,
    }
}

/// Rig with a working media source and a two-file swarm named "Movie"
pub(crate) fn default_rig() -> TestRig {
    create_test_rig(
        FakeMedia {
            payload: b"video-bytes".to_vec(),
            fail: false,
        },
        FakeSwarm::finishing("Movie", &[("Movie/a.mp4", 1024), ("Movie/b.mp4", 2048)]),
    )
}
