//! Failure diagnostics
//!
//! Attachments produced when a step fails: the page screenshot, the URL the
//! page was on and the text of the failed step. Binary bodies serialize as
//! base64 so a report can embed them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};

pub const MEDIA_PNG: &str = "image/png";
pub const MEDIA_TEXT: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentBody {
    Bytes(Vec<u8>),
    Text(String),
}

impl Serialize for AttachmentBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttachmentBody::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            AttachmentBody::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// Diagnostic payload tagged with the step that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub step: String,
    pub media_type: String,
    pub body: AttachmentBody,
}

impl Attachment {
    pub fn png(step: &str, bytes: Vec<u8>) -> Self {
        Self {
            step: step.to_string(),
            media_type: MEDIA_PNG.to_string(),
            body: AttachmentBody::Bytes(bytes),
        }
    }

    pub fn text(step: &str, text: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            media_type: MEDIA_TEXT.to_string(),
            body: AttachmentBody::Text(text.into()),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            AttachmentBody::Text(text) => Some(text),
            AttachmentBody::Bytes(_) => None,
        }
    }
}

/// Receiver for failure attachments
pub trait AttachmentSink: Send {
    fn attach(&mut self, attachment: Attachment);
}

/// Collects attachments in memory for the scenario report
#[derive(Debug, Default)]
pub struct MemorySink {
    attachments: Vec<Attachment>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn into_attachments(self) -> Vec<Attachment> {
        self.attachments
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

impl AttachmentSink for MemorySink {
    fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }
}
