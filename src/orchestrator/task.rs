//! The per-job task: consumes backend events, throttles status edits, finalizes.

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::adapters::{Backend, BackendEvent, EVENT_CHANNEL_BUFFER};
use crate::error::TransferError;
use crate::link;
use crate::progress::ProgressSample;
use crate::throttle::ProgressThrottle;
use crate::types::{BackendKind, Event, JobState, OutputFile};

use super::Orchestrator;
use super::finalization::{completion_plan, deliver, deliver_failure};
use super::job::Job;

/// Parameters for [`run_job`]
pub(crate) struct JobTaskParams {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) job: Job,
    pub(crate) backend: Backend,
    pub(crate) state_tx: watch::Sender<JobState>,
    pub(crate) cancel: CancellationToken,
}

/// Drive one job from `Running` to a terminal state and return it.
pub(crate) async fn run_job(params: JobTaskParams) -> Job {
    let JobTaskParams {
        orchestrator,
        mut job,
        backend,
        state_tx,
        cancel,
    } = params;

    let kind = backend.kind();
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
    let backend_task = tokio::spawn(backend.run(events_tx, cancel));

    let mut throttle = ProgressThrottle::starting_now(orchestrator.config.progress.throttle_interval);

    let outcome = loop {
        match events_rx.recv().await {
            Some(BackendEvent::Progress(sample)) => {
                on_progress(&orchestrator, &job, &mut throttle, sample).await;
            }
            Some(BackendEvent::Completed(outputs)) => break Ok(outputs),
            Some(BackendEvent::Failed(e)) => break Err(e),
            // Sender dropped without a terminal event (panicked or aborted backend).
            None => break Err(TransferError::Interrupted),
        }
    };

    if let Err(e) = backend_task.await {
        tracing::warn!(job_id = %job.id, error = %e, "Backend task ended abnormally");
    }

    match outcome {
        Ok(outputs) => on_completed(&orchestrator, &mut job, kind, outputs).await,
        Err(e) => on_failed(&orchestrator, &mut job, e).await,
    }

    state_tx.send_replace(job.state);
    orchestrator.release(job.id).await;
    job
}

async fn on_progress(
    orchestrator: &Orchestrator,
    job: &Job,
    throttle: &mut ProgressThrottle,
    sample: ProgressSample,
) {
    let text = sample.render();
    if !throttle.should_emit(&text, Instant::now()) {
        return;
    }

    if let Some(message) = job.status_message
        && let Err(e) = orchestrator
            .collaborators
            .notifier
            .edit_message(job.id.chat, message, &text)
            .await
    {
        tracing::warn!(job_id = %job.id, error = %e, "Failed to update status message");
    }

    orchestrator.emit_event(Event::Progress {
        id: job.id,
        downloaded_bytes: sample.downloaded_bytes,
        total_bytes: sample.total_bytes,
        text,
    });
}

async fn on_completed(
    orchestrator: &Orchestrator,
    job: &mut Job,
    kind: BackendKind,
    outputs: Vec<OutputFile>,
) {
    if !job.complete(outputs) {
        return;
    }

    let host = &orchestrator.config.output.public_host;
    let links: Vec<String> = job.outputs.iter().map(|o| link::link_for(host, o)).collect();

    tracing::info!(
        job_id = %job.id,
        backend = ?kind,
        files = job.outputs.len(),
        "Job completed"
    );

    let plan = completion_plan(kind, job.status_message, &job.outputs, &links);
    deliver(orchestrator.collaborators.notifier.as_ref(), job.id, plan).await;

    orchestrator.emit_event(Event::JobCompleted {
        id: job.id,
        outputs: job.outputs.clone(),
        links,
    });
}

async fn on_failed(orchestrator: &Orchestrator, job: &mut Job, error: TransferError) {
    if !job.fail() {
        return;
    }

    tracing::error!(job_id = %job.id, error = %error, "Job failed");
    deliver_failure(orchestrator.collaborators.notifier.as_ref(), job.id).await;

    orchestrator.emit_event(Event::JobFailed {
        id: job.id,
        error: error.to_string(),
    });
}
