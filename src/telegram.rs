//! Telegram Bot API client.
//!
//! Implements [`Notifier`] and [`MediaSource`] over plain HTTPS calls to
//! `{api_base}/bot{token}/{method}` and exposes long polling through
//! [`TelegramClient::get_updates`]. Only the handful of methods the relay needs
//! are covered.
//!
//! The Bot API only serves files up to 20 MB through `getFile`. Larger
//! attachments fail with a [`TransferError::Media`] naming that limit instead of
//! reaching the file endpoint.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::adapters::{MediaProgress, MediaSource};
use crate::bot::InboundMessage;
use crate::config::TelegramConfig;
use crate::error::{Error, Result, TransferError};
use crate::notifier::Notifier;
use crate::types::{Attachment, AttachmentRef, ChatRef, MessageRef};

/// Largest file the hosted Bot API lets a bot fetch through `getFile`
pub const DOWNLOAD_LIMIT_BYTES: u64 = 20 * 1024 * 1024;

/// Extra time granted to a getUpdates request on top of its long-poll timeout
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Bot API client
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// One entry of a getUpdates result
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier
    pub update_id: i64,
    /// New incoming message, if this update carries one
    pub message: Option<TgMessage>,
}

/// Bot API `Message`, reduced to the fields the relay reads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TgMessage {
    /// Message id inside the chat
    pub message_id: i64,
    /// Chat the message belongs to
    pub chat: TgChat,
    /// Sender
    pub from: Option<TgUser>,
    /// Text of a text message
    pub text: Option<String>,
    /// Attached video
    pub video: Option<TgFile>,
    /// Attached generic document
    pub document: Option<TgFile>,
    /// Message this one replies to
    pub reply_to_message: Option<Box<TgMessage>>,
}

/// Bot API `Chat`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TgChat {
    /// Chat id
    pub id: i64,
}

/// Bot API `User`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TgUser {
    /// First name of the user
    pub first_name: String,
}

/// Common shape of Bot API `Video` and `Document`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TgFile {
    /// Identifier for downloading the file
    pub file_id: String,
    /// Original file name as defined by the sender
    pub file_name: Option<String>,
    /// Size in bytes
    pub file_size: Option<u64>,
    /// MIME type as defined by the sender
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgFileInfo {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl From<TgFile> for Attachment {
    fn from(file: TgFile) -> Self {
        Attachment {
            id: AttachmentRef(file.file_id),
            file_name: file.file_name,
            size_bytes: file.file_size,
            mime_type: file.mime_type,
        }
    }
}

impl From<TgMessage> for InboundMessage {
    fn from(msg: TgMessage) -> Self {
        InboundMessage {
            chat: ChatRef(msg.chat.id),
            message: MessageRef(msg.message_id),
            from_first_name: msg.from.map(|u| u.first_name),
            text: msg.text,
            video: msg.video.map(Attachment::from),
            document: msg.document.map(Attachment::from),
            reply_to: msg
                .reply_to_message
                .map(|reply| Box::new(InboundMessage::from(*reply))),
        }
    }
}

impl TelegramClient {
    /// Create a client from the Telegram configuration
    pub fn new(http: reqwest::Client, config: &TelegramConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Call a Bot API method with a JSON body.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.http.post(self.method_url(method)).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Never let the token leak into error messages.
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;

        if !envelope.ok {
            return Err(Error::Notification(format!(
                "{}: {}",
                method,
                envelope
                    .description
                    .unwrap_or_else(|| "request rejected".to_string())
            )));
        }
        envelope
            .result
            .ok_or_else(|| Error::Notification(format!("{method}: empty result")))
    }

    /// Long-poll for new updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body, Some(timeout + POLL_GRACE))
            .await
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramClient {
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef> {
        let mut body = json!({ "chat_id": chat.0, "text": text });
        if let Some(reply_to) = reply_to {
            body["reply_parameters"] = json!({
                "message_id": reply_to.0,
                "allow_sending_without_reply": true,
            });
        }
        let sent: SentMessage = self.call("sendMessage", body, None).await?;
        Ok(MessageRef(sent.message_id))
    }

    async fn edit_message(&self, chat: ChatRef, message: MessageRef, text: &str) -> Result<()> {
        // Returns the edited Message, or `true` for inline messages.
        let _: Value = self
            .call(
                "editMessageText",
                json!({ "chat_id": chat.0, "message_id": message.0, "text": text }),
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                json!({ "chat_id": chat.0, "message_id": message.0 }),
                None,
            )
            .await?;
        Ok(())
    }

    async fn attachment_link(&self, attachment: &AttachmentRef) -> Result<String> {
        let info: TgFileInfo = self
            .call("getFile", json!({ "file_id": attachment.0 }), None)
            .await?;
        let file_path = info
            .file_path
            .ok_or_else(|| Error::Notification("getFile: file is not downloadable".to_string()))?;
        Ok(format!(
            "{}/file/bot{}/{}",
            self.api_base, self.token, file_path
        ))
    }

    async fn react(&self, chat: ChatRef, message: MessageRef, emoji: &str) -> Result<()> {
        let _: bool = self
            .call(
                "setMessageReaction",
                json!({
                    "chat_id": chat.0,
                    "message_id": message.0,
                    "reaction": [{ "type": "emoji", "emoji": emoji }],
                }),
                None,
            )
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaSource for TelegramClient {
    async fn download(
        &self,
        attachment: &Attachment,
        dest: &Path,
        progress: mpsc::Sender<MediaProgress>,
    ) -> std::result::Result<u64, TransferError> {
        if attachment
            .size_bytes
            .is_some_and(|size| size > DOWNLOAD_LIMIT_BYTES)
        {
            return Err(over_download_limit());
        }

        let link = self
            .attachment_link(&attachment.id)
            .await
            .map_err(|e| match e {
                Error::Notification(msg) if msg.contains("file is too big") => {
                    over_download_limit()
                }
                other => TransferError::Media(other.to_string()),
            })?;

        let mut response = self
            .http
            .get(&link)
            .send()
            .await
            .map_err(|e| TransferError::Media(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(TransferError::Media(format!(
                "file download answered HTTP {}",
                response.status().as_u16()
            )));
        }

        let total_bytes = response
            .content_length()
            .or(attachment.size_bytes)
            .unwrap_or(0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| TransferError::io(dest, e))?;

        let mut downloaded_bytes = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransferError::Media(e.without_url().to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| TransferError::io(dest, e))?;
            downloaded_bytes += chunk.len() as u64;
            // A full channel means the consumer is behind; skipping a sample is fine.
            progress
                .try_send(MediaProgress {
                    downloaded_bytes,
                    total_bytes,
                })
                .ok();
        }

        file.flush().await.map_err(|e| TransferError::io(dest, e))?;
        Ok(downloaded_bytes)
    }
}

fn over_download_limit() -> TransferError {
    TransferError::Media(format!(
        "file exceeds the Bot API download limit of {} MB",
        DOWNLOAD_LIMIT_BYTES / (1024 * 1024)
    ))
}
