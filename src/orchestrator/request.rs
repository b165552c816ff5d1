//! Job requests as produced by the trigger surface.

use serde::{Deserialize, Serialize};

use crate::types::{Attachment, ChatRef, JobId, MessageRef};

/// What the user asked to transfer, before resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// The triggering message's own video
    Media {
        /// The attachment, `None` if the message carried none
        attachment: Option<Attachment>,
    },
    /// A `/link` argument
    Url {
        /// Raw argument text
        url: String,
    },
    /// A `/torrent` argument and/or a replied-to `.torrent` document
    Torrent {
        /// Magnet URI from the argument or a replied-to text
        magnet: Option<String>,
        /// Replied-to `.torrent` document; preferred over `magnet`
        torrent_file: Option<Attachment>,
    },
}

/// A parsed trigger, ready for [`Orchestrator::start_job`](super::Orchestrator::start_job)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Chat of the triggering message
    pub chat: ChatRef,
    /// The triggering message; replies are threaded to it
    pub message: MessageRef,
    /// Requested source
    pub source: SourceSpec,
}

impl JobRequest {
    /// Job id derived from the triggering message
    pub fn id(&self) -> JobId {
        JobId::new(self.chat, self.message)
    }
}
