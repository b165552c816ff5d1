//! Terminal notifications: what each backend sends when a job ends.
//!
//! Planning is pure ([`completion_plan`]) so the per-backend rules can be tested
//! without a notifier; [`deliver`] then performs the steps in order.

use crate::notifier::Notifier;
use crate::types::{BackendKind, JobId, MessageRef, OutputFile};

/// Sent once, after every per-file message of a swarm job
pub const SWARM_SUMMARY: &str = "Torrent download completed !!";

/// Sent once when a job fails
pub const FAILURE_MESSAGE: &str = "Something went wrong. Retry later";

const MIB: u64 = 1024 * 1024;

/// One notifier call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Replace the status message text
    Edit {
        /// The status message
        message: MessageRef,
        /// New text
        text: String,
    },
    /// Remove the status message
    Delete {
        /// The status message
        message: MessageRef,
    },
    /// Reply to the triggering message
    Reply {
        /// Message text
        text: String,
    },
}

/// Link message for single-file backends
pub fn link_message(link: &str) -> String {
    format!("Video is available at {link}")
}

/// Per-file message of a swarm job
pub fn swarm_file_message(output: &OutputFile, link: &str) -> String {
    format!(
        "Name: {}\nSize:{}mb\n\nLink: {}",
        output.name,
        output.size_bytes / MIB,
        link
    )
}

/// Notifier calls announcing a completed job.
///
/// `links[i]` belongs to `outputs[i]`. Swarm outputs keep their given order.
pub fn completion_plan(
    backend: BackendKind,
    status_message: Option<MessageRef>,
    outputs: &[OutputFile],
    links: &[String],
) -> Vec<Delivery> {
    match backend {
        BackendKind::RemoteMedia | BackendKind::Http => {
            let Some(link) = links.first() else {
                return Vec::new();
            };
            let text = link_message(link);
            match (backend, status_message) {
                (BackendKind::RemoteMedia, Some(message)) => vec![Delivery::Edit { message, text }],
                (BackendKind::Http, Some(message)) => {
                    vec![Delivery::Delete { message }, Delivery::Reply { text }]
                }
                _ => vec![Delivery::Reply { text }],
            }
        }
        BackendKind::Swarm => outputs
            .iter()
            .zip(links)
            .map(|(output, link)| Delivery::Reply {
                text: swarm_file_message(output, link),
            })
            .chain(std::iter::once(Delivery::Reply {
                text: SWARM_SUMMARY.to_string(),
            }))
            .collect(),
    }
}

/// Perform `plan` in order. Failures are logged and do not stop later steps.
///
/// A failed [`Delivery::Edit`] is retried as a [`Delivery::Reply`] with the same text.
pub async fn deliver(notifier: &dyn Notifier, id: JobId, plan: Vec<Delivery>) {
    for step in plan {
        let result = match &step {
            Delivery::Edit { message, text } => {
                match notifier.edit_message(id.chat, *message, text).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        tracing::warn!(job_id = %id, error = %e, "Final edit failed, replying instead");
                        reply(notifier, id, text).await
                    }
                }
            }
            Delivery::Delete { message } => notifier.delete_message(id.chat, *message).await,
            Delivery::Reply { text } => reply(notifier, id, text).await,
        };
        if let Err(e) = result {
            tracing::warn!(job_id = %id, step = ?step, error = %e, "Failed to deliver final message");
        }
    }
}

async fn reply(notifier: &dyn Notifier, id: JobId, text: &str) -> crate::error::Result<()> {
    notifier
        .send_message(id.chat, text, Some(id.message))
        .await
        .map(|_| ())
}

/// Tell the user the job failed.
pub async fn deliver_failure(notifier: &dyn Notifier, id: JobId) {
    deliver(
        notifier,
        id,
        vec![Delivery::Reply {
            text: FAILURE_MESSAGE.to_string(),
        }],
    )
    .await;
}
