//! Loose validation of agent gateway SSE payloads.
//!
//! Every payload must carry `"type": "agent_message"`. Everything else is
//! optional: fields the translator does not read are ignored, and known
//! fields may be absent. A known field with the wrong JSON type fails the
//! whole chunk.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// Required value of the top-level `type` field.
pub const AGENT_MESSAGE_TYPE: &str = "agent_message";

/// A gateway payload that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Chunk parse error: {message}")]
pub struct ChunkParseError {
    pub message: String,
    /// The payload text as received.
    pub raw: String,
}

impl ChunkParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raw: raw.into(),
        }
    }
}

/// Outcome of validating one payload.
pub type ParseResult = Result<IncomingChunk, ChunkParseError>;

/// A validated gateway chunk, keyed by its `message_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingChunk {
    AssistantMessage { content: Option<Vec<ContentBlock>> },
    StreamEvent { event: Option<StreamEventBody> },
    UserMessage { content: Option<Vec<ContentBlock>> },
    ResultMessage { subtype: Option<String> },
    /// Any other or missing `message_type`.
    Unrecognized { message_type: Option<String> },
}

/// A JSON value kept as the exact text the gateway sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawJson(Box<RawValue>);

impl RawJson {
    #[must_use]
    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for RawJson {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// Content block of an assistant or user message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Present-but-null input is `Some` with the text `null`.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub input: Option<RawJson>,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Nested `payload.event` of a `StreamEvent` chunk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamEventBody {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    payload: Option<PayloadWire>,
}

#[derive(Debug, Default, Deserialize)]
struct PayloadWire {
    #[serde(default)]
    event: Option<StreamEventBody>,
    #[serde(default)]
    content: Option<Vec<ContentBlock>>,
    #[serde(default)]
    subtype: Option<String>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<RawJson>, D::Error>
where
    D: Deserializer<'de>,
{
    RawJson::deserialize(deserializer).map(Some)
}

impl From<ChunkWire> for IncomingChunk {
    fn from(wire: ChunkWire) -> Self {
        let payload = wire.payload.unwrap_or_default();
        match wire.message_type.as_deref() {
            Some("AssistantMessage") => IncomingChunk::AssistantMessage {
                content: payload.content,
            },
            Some("StreamEvent") => IncomingChunk::StreamEvent {
                event: payload.event,
            },
            Some("UserMessage") => IncomingChunk::UserMessage {
                content: payload.content,
            },
            Some("ResultMessage") => IncomingChunk::ResultMessage {
                subtype: payload.subtype,
            },
            _ => IncomingChunk::Unrecognized {
                message_type: wire.message_type,
            },
        }
    }
}

fn from_wire(wire: ChunkWire, raw: &str) -> ParseResult {
    if wire.kind != AGENT_MESSAGE_TYPE {
        return Err(ChunkParseError::new(
            format!(
                "expected type \"{AGENT_MESSAGE_TYPE}\", got \"{}\"",
                wire.kind
            ),
            raw,
        ));
    }
    Ok(IncomingChunk::from(wire))
}

/// Validate one SSE `data` payload.
///
/// Never panics; malformed JSON and schema mismatches come back as `Err`.
pub fn validate(raw: &str) -> ParseResult {
    match serde_json::from_str::<ChunkWire>(raw) {
        Ok(wire) => from_wire(wire, raw),
        Err(err) => Err(ChunkParseError::new(err.to_string(), raw)),
    }
}

/// Validate an already-decoded JSON value.
pub fn validate_value(value: Value) -> ParseResult {
    validate(&value.to_string())
}
