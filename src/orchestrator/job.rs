//! Job state machine.

use chrono::{DateTime, Utc};

use crate::types::{JobId, JobSource, JobState, MessageRef, OutputFile};

/// One requested transfer, owned by its job task
#[derive(Clone, Debug)]
pub struct Job {
    /// Derived from the triggering message
    pub id: JobId,
    /// Resolved transfer source
    pub source: JobSource,
    /// Lifecycle state
    pub state: JobState,
    /// Published outputs; empty unless completed
    pub outputs: Vec<OutputFile>,
    /// The "Downloading..." message, if it could be sent
    pub status_message: Option<MessageRef>,
    /// Creation time
    pub started_at: DateTime<Utc>,
}

impl Job {
    /// A new pending job
    pub fn new(id: JobId, source: JobSource) -> Self {
        Self {
            id,
            source,
            state: JobState::Pending,
            outputs: Vec::new(),
            status_message: None,
            started_at: Utc::now(),
        }
    }

    /// Pending -> Running
    pub fn start(&mut self) -> bool {
        self.transition(JobState::Running)
    }

    /// Running -> Completed, recording the outputs
    pub fn complete(&mut self, outputs: Vec<OutputFile>) -> bool {
        if !self.transition(JobState::Completed) {
            return false;
        }
        self.outputs = outputs;
        true
    }

    /// Pending | Running -> Failed
    pub fn fail(&mut self) -> bool {
        if !self.transition(JobState::Failed) {
            return false;
        }
        self.outputs.clear();
        true
    }

    fn transition(&mut self, to: JobState) -> bool {
        let allowed = matches!(
            (self.state, to),
            (JobState::Pending, JobState::Running)
                | (JobState::Running, JobState::Completed)
                | (JobState::Pending | JobState::Running, JobState::Failed)
        );
        if !allowed {
            tracing::warn!(
                job_id = %self.id,
                from = ?self.state,
                to = ?to,
                "Rejected illegal job state transition"
            );
            return false;
        }
        tracing::debug!(job_id = %self.id, from = ?self.state, to = ?to, "Job state changed");
        self.state = to;
        true
    }
}
