//! Shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::types::Event;

use super::Orchestrator;

/// How long shutdown waits for cancelled jobs to deliver their final message
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Orchestrator {
    /// Gracefully shut down the orchestrator
    ///
    /// 1. Stops accepting new jobs
    /// 2. Cancels every active job (swarm handles are released by their adapters)
    /// 3. Waits up to 30 seconds for the jobs to finish their terminal notification
    /// 4. Emits [`Event::Shutdown`]
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.jobs.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        self.cancel_all().await;

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All active jobs finished"),
            Err(_) => {
                tracing::warn!("Timeout waiting for jobs to finish, proceeding with shutdown")
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
    }

    /// Whether new jobs are still admitted
    pub fn is_accepting(&self) -> bool {
        self.jobs.accepting_new.load(Ordering::SeqCst)
    }

    async fn cancel_all(&self) {
        let active = self.jobs.active.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all active jobs");
        for (id, entry) in active.iter() {
            tracing::debug!(job_id = %id, "Signaling cancellation");
            entry.cancel.cancel();
        }
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.jobs.active.lock().await.len();
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "Waiting for active jobs to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
