use super::test_helpers::*;
use super::*;
use crate::types::{Attachment, AttachmentRef, ChatRef, MessageRef};

mod failure;

const CHAT: ChatRef = ChatRef(10);
const TRIGGER: MessageRef = MessageRef(20);

fn video() -> Attachment {
    Attachment {
        id: AttachmentRef("vid-1".into()),
        file_name: Some("holiday.mp4".into()),
        size_bytes: Some(11),
        mime_type: Some("video/mp4".into()),
    }
}

fn request(source: SourceSpec) -> JobRequest {
    JobRequest {
        chat: CHAT,
        message: TRIGGER,
        source,
    }
}
