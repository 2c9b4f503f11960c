use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Conversation role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Where the bytes of a file part come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataContent {
    Bytes(bytes::Bytes),
    /// Payload that is already base64 encoded.
    Base64(String),
    /// Remote reference; the gateway cannot fetch these.
    Url(url::Url),
}

/// A single part of a prompt message's content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    File {
        filename: Option<String>,
        media_type: String,
        data: DataContent,
    },
    Reasoning(String),
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_call_id: String,
        output: serde_json::Value,
    },
}

/// One message of the caller's conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: SmallVec<[ContentPart; 1]>,
}

impl ConversationMessage {
    #[must_use]
    pub fn new(role: Role, content: impl IntoIterator<Item = ContentPart>) -> Self {
        Self {
            role,
            content: content.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: smallvec![ContentPart::Text(text.into())],
        }
    }

    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }
}
