//! Outbound message model and the conversion from conversation history.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::protocol::prompt::{ContentPart, ConversationMessage, DataContent, Role};
use crate::util::{encode_base64, generate_id};

/// Key under which the destination agent name travels in `kwargs`.
pub const RESERVED_AGENT_NAME_KEY: &str = "__sb0_reserved_agent_name__";

/// One part of the message sent to the agent gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessagePart {
    Text {
        text: String,
    },
    File {
        name: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
        #[serde(rename = "base64")]
        base64_data: String,
    },
}

/// The message object sent to the gateway: routing kwargs plus content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub kwargs: Map<String, Value>,
    pub parts: Vec<OutboundMessagePart>,
}

impl AgentMessage {
    /// Build a message addressed to `agent_name`.
    ///
    /// Caller overrides are merged after the reserved agent-name key, so an
    /// override with the same key replaces it.
    #[must_use]
    pub fn new(
        agent_name: &str,
        overrides: Option<&Map<String, Value>>,
        parts: Vec<OutboundMessagePart>,
    ) -> Self {
        let mut kwargs = Map::new();
        kwargs.insert(
            RESERVED_AGENT_NAME_KEY.to_string(),
            Value::String(agent_name.to_string()),
        );
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                kwargs.insert(key.clone(), value.clone());
            }
        }
        Self { kwargs, parts }
    }
}

/// Body of `POST /query`.
///
/// The gateway expects the message twice: JSON-encoded as a string in
/// `content`, and as a plain object in `values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryBody {
    pub content: String,
    pub values: AgentMessage,
}

impl QueryBody {
    /// # Errors
    ///
    /// Returns [`BridgeError::Internal`] if the message cannot be serialized.
    pub fn new(message: AgentMessage) -> Result<Self, BridgeError> {
        let content = serde_json::to_string(&message)
            .map_err(|err| BridgeError::Internal(format!("failed to encode message: {err}")))?;
        Ok(Self {
            content,
            values: message,
        })
    }
}

/// Convert a conversation history into the parts of one outbound message.
///
/// Only the last message is sent; the gateway keeps its own history. Parts
/// the gateway cannot represent are dropped.
///
/// # Errors
///
/// Returns [`BridgeError::Prompt`] when the last message is not a user
/// message, and [`BridgeError::CapabilityNotSupported`] when a file part
/// references its data by URL.
pub fn convert_to_outbound_parts(
    messages: &[ConversationMessage],
) -> Result<Vec<OutboundMessagePart>, BridgeError> {
    let Some(last) = messages.last() else {
        return Ok(Vec::new());
    };

    if last.role != Role::User {
        return Err(BridgeError::Prompt {
            message: "Expected a user message".to_string(),
            prompt: Box::new(last.clone()),
        });
    }

    let mut parts = Vec::with_capacity(last.content.len());
    for part in &last.content {
        match part {
            ContentPart::Text(text) => parts.push(OutboundMessagePart::Text { text: text.clone() }),
            ContentPart::File {
                filename,
                media_type,
                data,
            } => parts.push(OutboundMessagePart::File {
                name: filename.clone().unwrap_or_else(generate_id),
                mime_type: media_type.clone(),
                base64_data: data_to_base64(data)?,
            }),
            ContentPart::Reasoning(_)
            | ContentPart::ToolCall { .. }
            | ContentPart::ToolResult { .. } => {}
        }
    }
    Ok(parts)
}

fn data_to_base64(data: &DataContent) -> Result<String, BridgeError> {
    match data {
        DataContent::Bytes(bytes) => Ok(encode_base64(bytes)),
        DataContent::Base64(encoded) => Ok(encoded.clone()),
        DataContent::Url(_) => Err(BridgeError::CapabilityNotSupported(
            "File URL data".to_string(),
        )),
    }
}
