//! Backend adapters -- one uniform progress source over three transfer mechanisms.
//!
//! - [`remote_media`] - chat attachment fetched through a [`MediaSource`] (push-based progress)
//! - [`http`] - direct URL download with reqwest (poll-based progress)
//! - [`swarm`] - torrent/magnet transfer through a [`SwarmClient`] (poll-based progress)
//!
//! Every adapter pushes [`BackendEvent::Progress`] samples into the job's channel;
//! [`Backend::run`] then sends exactly one terminal event.

pub mod http;
pub mod remote_media;
pub mod swarm;

pub use http::HttpAdapter;
pub use remote_media::{MediaProgress, MediaSource, RemoteMediaAdapter};
pub use swarm::{SwarmAdapter, SwarmClient, SwarmFile, SwarmHandle, SwarmInput, SwarmStats};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransferError;
use crate::progress::ProgressSample;
use crate::types::{BackendKind, OutputFile};

/// Buffer size of a job's backend event channel
pub(crate) const EVENT_CHANNEL_BUFFER: usize = 64;

/// Message pushed from an adapter to its job task
#[derive(Debug)]
pub enum BackendEvent {
    /// Intermediate progress
    Progress(ProgressSample),
    /// Transfer finished; outputs in backend order
    Completed(Vec<OutputFile>),
    /// Transfer failed
    Failed(TransferError),
}

/// Tagged union of the three adapters, dispatched by the orchestrator
pub enum Backend {
    /// Chat attachment
    RemoteMedia(RemoteMediaAdapter),
    /// Direct URL
    Http(HttpAdapter),
    /// Torrent or magnet
    Swarm(SwarmAdapter),
}

impl Backend {
    /// Which variant this is
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::RemoteMedia(_) => BackendKind::RemoteMedia,
            Backend::Http(_) => BackendKind::Http,
            Backend::Swarm(_) => BackendKind::Swarm,
        }
    }

    /// Run the transfer to its end, streaming progress into `events`.
    ///
    /// Sends exactly one [`BackendEvent::Completed`] or [`BackendEvent::Failed`] last.
    pub async fn run(self, events: mpsc::Sender<BackendEvent>, cancel: CancellationToken) {
        let kind = self.kind();
        let result = match self {
            Backend::RemoteMedia(adapter) => adapter.run(&events, &cancel).await,
            Backend::Http(adapter) => adapter.run(&events, &cancel).await,
            Backend::Swarm(adapter) => adapter.run(&events, &cancel).await,
        };

        let terminal = match result {
            Ok(outputs) => BackendEvent::Completed(outputs),
            Err(e) => {
                tracing::debug!(backend = ?kind, error = %e, "Backend finished with error");
                BackendEvent::Failed(e)
            }
        };

        // The job task may already be gone if it was aborted; nothing left to tell.
        events.send(terminal).await.ok();
    }
}

/// Forward a progress sample, ignoring a closed channel.
pub(crate) async fn report(events: &mpsc::Sender<BackendEvent>, sample: ProgressSample) {
    events.send(BackendEvent::Progress(sample)).await.ok();
}
