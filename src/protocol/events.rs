use serde::{Deserialize, Serialize};

use crate::protocol::chunk::ChunkParseError;

/// Identifier of the single text block this protocol can have open.
pub const TEXT_BLOCK_ID: &str = "txt-0";

/// Terminal classification of why generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    #[default]
    Unknown,
    Stop,
    ToolCalls,
    Error,
    Other,
}

/// Token usage attached to the finish event.
///
/// The gateway reports no token accounting, so every field stays `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// A single event of the normalized output stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum NormalizedEvent {
    StreamStart,
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        text: String,
    },
    TextEnd {
        id: String,
    },
    ToolCall {
        id: String,
        name: String,
        args_json: String,
    },
    ToolResult {
        id: String,
        result: String,
    },
    Error {
        cause: ChunkParseError,
    },
    Finish {
        reason: FinishReason,
        usage: Usage,
    },
}

impl NormalizedEvent {
    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self, NormalizedEvent::Finish { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_json_shape() {
        let event = NormalizedEvent::ToolCall {
            id: "t1".to_string(),
            name: "foo".to_string(),
            args_json: "{}".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).expect("serialize"),
            json!({"type": "tool-call", "id": "t1", "name": "foo", "argsJson": "{}"})
        );
    }

    #[test]
    fn test_finish_json_shape() {
        let event = NormalizedEvent::Finish {
            reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        };
        assert_eq!(
            serde_json::to_value(&event).expect("serialize"),
            json!({
                "type": "finish",
                "reason": "tool-calls",
                "usage": {"inputTokens": null, "outputTokens": null, "totalTokens": null}
            })
        );
    }
}
