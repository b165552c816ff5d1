//! Trigger surface: chat commands turned into job requests.
//!
//! - a message carrying a video starts a remote-media job
//! - `/link <url>` starts an HTTP job
//! - `/torrent <magnet>`, or `/torrent` in reply to a `.torrent` document or a
//!   magnet text, starts a swarm job
//! - `/start` greets the user

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::notifier::Notifier;
use crate::orchestrator::finalization::FAILURE_MESSAGE;
use crate::orchestrator::{JobRequest, Orchestrator, SourceSpec};
use crate::telegram::TelegramClient;
use crate::types::{Attachment, ChatRef, MessageRef};

/// Reaction acknowledging a received video
const VIDEO_ACK: &str = "👍";

/// Delay before polling again after a failed getUpdates
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Platform-neutral view of an incoming chat message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the message was posted in
    pub chat: ChatRef,
    /// The message itself
    pub message: MessageRef,
    /// Sender's first name
    pub from_first_name: Option<String>,
    /// Text, if any
    pub text: Option<String>,
    /// Attached video
    pub video: Option<Attachment>,
    /// Attached document
    pub document: Option<Attachment>,
    /// The message this one replies to
    pub reply_to: Option<Box<InboundMessage>>,
}

/// What an incoming message asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start {
        /// Sender's first name
        first_name: Option<String>,
    },
    /// Anything that starts a transfer
    Job(JobRequest),
    /// Not addressed to the relay
    Ignore,
}

/// Split `/cmd@bot args` into (`cmd`, `args`)
fn split_command(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let (head, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let name = head.split('@').next().unwrap_or(head);
    Some((name, args.trim()))
}

fn is_torrent_document(attachment: &Attachment) -> bool {
    attachment
        .file_name
        .as_deref()
        .and_then(crate::naming::extension_of)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("torrent"))
}

/// Classify an incoming message.
pub fn parse_command(msg: &InboundMessage) -> Command {
    let job = |source| {
        Command::Job(JobRequest {
            chat: msg.chat,
            message: msg.message,
            source,
        })
    };

    if msg.video.is_some() {
        return job(SourceSpec::Media {
            attachment: msg.video.clone(),
        });
    }

    let Some((name, args)) = msg.text.as_deref().and_then(split_command) else {
        return Command::Ignore;
    };

    match name {
        "start" => Command::Start {
            first_name: msg.from_first_name.clone(),
        },
        "link" => job(SourceSpec::Url {
            url: args.to_string(),
        }),
        "torrent" => {
            let reply = msg.reply_to.as_deref();
            // The replied-to text is only consulted when no argument was given
            let magnet = if args.is_empty() {
                reply
                    .and_then(|r| r.text.as_deref())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            } else {
                Some(args.to_string())
            };
            let torrent_file = reply
                .and_then(|r| r.document.as_ref())
                .filter(|d| is_torrent_document(d))
                .cloned();
            job(SourceSpec::Torrent {
                magnet,
                torrent_file,
            })
        }
        _ => Command::Ignore,
    }
}

/// Routes incoming messages to the orchestrator
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Orchestrator,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    /// Create a dispatcher replying through `notifier`
    pub fn new(orchestrator: Orchestrator, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            orchestrator,
            notifier,
        }
    }

    /// Handle one incoming message
    pub async fn handle(&self, msg: InboundMessage) {
        let request = match parse_command(&msg) {
            Command::Ignore => return,
            Command::Start { first_name } => {
                let greeting = format!("Hello {} !!", first_name.as_deref().unwrap_or("there"));
                self.reply(msg.chat, &greeting, None).await;
                return;
            }
            Command::Job(request) => request,
        };

        if msg.video.is_some()
            && let Err(e) = self.notifier.react(msg.chat, msg.message, VIDEO_ACK).await
        {
            tracing::debug!(error = %e, "Failed to react to video");
        }

        let id = request.id();
        match self.orchestrator.start_job(request).await {
            Ok(handle) => tracing::debug!(job_id = %handle.id, "Job accepted"),
            Err(Error::DuplicateJob(_)) => {
                tracing::debug!(job_id = %id, "Ignoring redelivered trigger")
            }
            Err(Error::InvalidSource(reason)) => {
                self.reply(
                    msg.chat,
                    &format!("Cannot start download: {reason}"),
                    Some(msg.message),
                )
                .await;
            }
            Err(Error::ShuttingDown) => {
                self.reply(
                    msg.chat,
                    "The bot is shutting down. Retry later",
                    Some(msg.message),
                )
                .await;
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to start job");
                self.reply(msg.chat, FAILURE_MESSAGE, Some(msg.message)).await;
            }
        }
    }

    async fn reply(&self, chat: ChatRef, text: &str, reply_to: Option<MessageRef>) {
        if let Err(e) = self.notifier.send_message(chat, text, reply_to).await {
            tracing::warn!(chat = chat.0, error = %e, "Failed to send reply");
        }
    }
}

/// Long-poll the Bot API and dispatch every message until `cancel` fires.
pub async fn run_polling(
    client: Arc<TelegramClient>,
    dispatcher: Dispatcher,
    poll_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    tracing::info!("Polling for updates");

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            res = client.get_updates(offset, poll_timeout) => res,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(message) = update.message {
                        dispatcher.handle(message.into()).await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }

    tracing::info!("Stopped polling for updates");
}
