//! Download job orchestration split into focused submodules.
//!
//! The `Orchestrator` struct and its methods are organized by concern:
//! - [`request`] - Job requests produced by the trigger surface
//! - [`resolve`] - Source validation and backend selection
//! - [`job`] - Job state machine
//! - [`task`] - Per-job task: progress throttling and finalization
//! - [`finalization`] - Per-backend terminal notifications
//! - [`output_dir`] - Process-scoped output directory
//! - [`lifecycle`] - Graceful shutdown

pub mod finalization;
pub mod job;
mod lifecycle;
pub mod output_dir;
pub mod request;
mod resolve;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use job::Job;
pub use output_dir::OutputDir;
pub use request::{JobRequest, SourceSpec};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::adapters::{MediaSource, SwarmClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::notifier::Notifier;
use crate::progress::INITIAL_STATUS;
use crate::types::{Event, JobId, JobInfo, JobSource, JobState};

use task::{JobTaskParams, run_job};

/// Capacity of the event broadcast channel
const EVENT_BUFFER: usize = 1000;

/// External collaborators the orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    /// Messaging platform
    pub notifier: Arc<dyn Notifier>,
    /// Remote-media fetch API
    pub media: Arc<dyn MediaSource>,
    /// Peer-to-peer swarm client
    pub swarm: Arc<dyn SwarmClient>,
    /// Shared HTTP client (direct downloads, torrent descriptors)
    pub http: reqwest::Client,
}

/// Bookkeeping for a job that has not reached its terminal notification yet
pub(crate) struct ActiveJob {
    /// `None` while the request is still being resolved
    pub(crate) source: Option<JobSource>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) state: watch::Receiver<JobState>,
    pub(crate) cancel: CancellationToken,
}

/// Active jobs and admission control
#[derive(Clone)]
pub(crate) struct JobRegistry {
    /// One entry per running job, keyed by the triggering message
    pub(crate) active: Arc<Mutex<HashMap<JobId, ActiveJob>>>,
    /// Cleared when shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Handle to a started job
pub struct JobHandle {
    /// Job id
    pub id: JobId,
    /// Follows the job's state
    pub state: watch::Receiver<JobState>,
    task: tokio::task::JoinHandle<Job>,
}

impl JobHandle {
    /// Wait for the job to reach its terminal state and its notifications to go out.
    pub async fn wait(self) -> Result<Job> {
        self.task
            .await
            .map_err(|e| Error::Other(format!("job task failed: {e}")))
    }
}

/// Runs download jobs end to end (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) config: Arc<Config>,
    pub(crate) collaborators: Collaborators,
    pub(crate) output_dir: Arc<OutputDir>,
    pub(crate) event_tx: broadcast::Sender<Event>,
    pub(crate) jobs: JobRegistry,
}

impl Orchestrator {
    /// Create an orchestrator. The output directory is created lazily by the first job.
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_BUFFER);
        let output_dir = Arc::new(OutputDir::new(config.output_dir().clone()));

        Self {
            config: Arc::new(config),
            collaborators,
            output_dir,
            event_tx,
            jobs: JobRegistry {
                active: Arc::new(Mutex::new(HashMap::new())),
                accepting_new: Arc::new(AtomicBool::new(true)),
            },
        }
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives all events independently; one that falls more than
    /// 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The process-scoped output directory
    pub fn output_dir(&self) -> &OutputDir {
        &self.output_dir
    }

    /// Emit an event to all subscribers, dropping it if nobody listens.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Start a job for `request`.
    ///
    /// Fails with [`Error::ShuttingDown`] once shutdown began, [`Error::DuplicateJob`]
    /// if the same trigger is already being served and [`Error::InvalidSource`] if the
    /// request cannot be resolved. On success the "Downloading..." reply has been
    /// sent and the job is `Running`.
    pub async fn start_job(&self, request: JobRequest) -> Result<JobHandle> {
        let id = request.id();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(JobState::Pending);

        {
            let mut active = self.jobs.active.lock().await;
            if !self.jobs.accepting_new.load(Ordering::SeqCst) {
                return Err(Error::ShuttingDown);
            }
            if active.contains_key(&id) {
                return Err(Error::DuplicateJob(id.to_string()));
            }
            active.insert(
                id,
                ActiveJob {
                    source: None,
                    started_at: Utc::now(),
                    state: state_rx.clone(),
                    cancel: cancel.clone(),
                },
            );
        }

        let resolved = match self.resolve(&request).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.release(id).await;
                tracing::info!(job_id = %id, error = %e, "Rejected job request");
                return Err(e);
            }
        };

        if let Some(entry) = self.jobs.active.lock().await.get_mut(&id) {
            entry.source = Some(resolved.source.clone());
        }

        let mut job = Job::new(id, resolved.source);
        match self
            .collaborators
            .notifier
            .send_message(id.chat, INITIAL_STATUS, Some(id.message))
            .await
        {
            Ok(message) => job.status_message = Some(message),
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Failed to send status message")
            }
        }

        job.start();
        state_tx.send_replace(job.state);

        let backend = resolved.backend;
        tracing::info!(job_id = %id, backend = ?backend.kind(), "Job started");
        self.emit_event(Event::JobStarted {
            id,
            backend: backend.kind(),
        });

        let task = tokio::spawn(run_job(JobTaskParams {
            orchestrator: self.clone(),
            job,
            backend,
            state_tx,
            cancel,
        }));

        Ok(JobHandle {
            id,
            state: state_rx,
            task,
        })
    }

    /// Snapshot of all resolved, not yet finished jobs
    pub async fn active_jobs(&self) -> Vec<JobInfo> {
        let active = self.jobs.active.lock().await;
        let mut jobs: Vec<JobInfo> = active
            .iter()
            .filter_map(|(id, entry)| {
                Some(JobInfo {
                    id: id.to_string(),
                    source: entry.source.clone()?,
                    state: *entry.state.borrow(),
                    outputs: Vec::new(),
                    started_at: entry.started_at,
                })
            })
            .collect();
        jobs.sort_by_key(|j| j.started_at);
        jobs
    }

    /// Snapshot of one active job, `None` if it is unknown, unresolved or already released
    pub async fn job_info(&self, id: JobId) -> Option<JobInfo> {
        let active = self.jobs.active.lock().await;
        let entry = active.get(&id)?;
        Some(JobInfo {
            id: id.to_string(),
            source: entry.source.clone()?,
            state: *entry.state.borrow(),
            outputs: Vec::new(),
            started_at: entry.started_at,
        })
    }

    /// Forget a job once its terminal notification went out (or it never started).
    pub(crate) async fn release(&self, id: JobId) {
        self.jobs.active.lock().await.remove(&id);
    }
}
