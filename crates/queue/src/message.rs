//! Message encoding (spec §4.4.1) shared by the producer and both consumer
//! modes.

use crate::error::QueueError;

pub const MAX_MESSAGE_BYTES: usize = 128 * 1024;
pub const MAX_BATCH_MESSAGES: usize = 100;
pub const MAX_BATCH_BYTES: usize = 256 * 1024;
pub const MAX_DELAY_SECONDS: u32 = 43200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
    Bytes,
    /// Approximated by JSON (spec §4.4.1): encoded/decoded identically to
    /// `Json`, kept as a distinct tag so pull-consumer filtering (§4.4.3)
    /// can still recognize it.
    V8,
}

forge_core::simple_display! {
    ContentType {
        Json => "json",
        Text => "text",
        Bytes => "bytes",
        V8 => "v8",
    }
}

impl ContentType {
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => ContentType::Text,
            "bytes" => ContentType::Bytes,
            "v8" => ContentType::V8,
            _ => ContentType::Json,
        }
    }
}

/// The outbound payload a producer sends; the variant determines both the
/// stored `content_type` tag and the wire encoding.
#[derive(Debug, Clone)]
pub enum MessageBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl MessageBody {
    pub fn encode(&self) -> Result<(Vec<u8>, ContentType), QueueError> {
        match self {
            MessageBody::Json(value) => Ok((serde_json::to_vec(value)?, ContentType::Json)),
            MessageBody::Text(text) => Ok((text.as_bytes().to_vec(), ContentType::Text)),
            MessageBody::Bytes(bytes) => Ok((bytes.clone(), ContentType::Bytes)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DecodedBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

pub fn decode(content_type: ContentType, bytes: &[u8]) -> DecodedBody {
    match content_type {
        ContentType::Json | ContentType::V8 => serde_json::from_slice(bytes)
            .map(DecodedBody::Json)
            .unwrap_or_else(|_| DecodedBody::Bytes(bytes.to_vec())),
        ContentType::Text => DecodedBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        ContentType::Bytes => DecodedBody::Bytes(bytes.to_vec()),
    }
}

pub fn validate_delay(delay_seconds: Option<u32>) -> Result<u32, QueueError> {
    let delay = delay_seconds.unwrap_or(0);
    if delay > MAX_DELAY_SECONDS {
        return Err(QueueError::InvalidDelay);
    }
    Ok(delay)
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
