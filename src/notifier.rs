//! Messaging collaborator consumed by the orchestrator.

use crate::error::Result;
use crate::types::{AttachmentRef, ChatRef, MessageRef};

/// Abstraction over the chat platform, enabling testability.
///
/// Implementations return [`crate::Error::Notification`] when the platform rejects a
/// call. The orchestrator logs and swallows failed edits; sends of final messages
/// are logged as well but never retried.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message, optionally as a reply, returning its handle
    async fn send_message(
        &self,
        chat: ChatRef,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef>;

    /// Replace the text of a previously sent message
    async fn edit_message(&self, chat: ChatRef, message: MessageRef, text: &str) -> Result<()>;

    /// Delete a previously sent message
    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<()>;

    /// Resolve a downloadable URL for an attachment
    async fn attachment_link(&self, attachment: &AttachmentRef) -> Result<String>;

    /// Acknowledge a message with an emoji reaction. Platforms without reactions ignore it.
    async fn react(&self, _chat: ChatRef, _message: MessageRef, _emoji: &str) -> Result<()> {
        Ok(())
    }
}
