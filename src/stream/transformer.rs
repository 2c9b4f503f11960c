//! Stateful translation of validated gateway chunks into normalized events.
//!
//! The state machine is expressed as free functions over an explicit
//! [`TransformerState`] value; [`StreamTransformer`] owns one state for a
//! single request and exposes the same hooks as methods.

use crate::protocol::chunk::{ContentBlock, IncomingChunk, ParseResult, StreamEventBody};
use crate::protocol::events::{FinishReason, NormalizedEvent, Usage, TEXT_BLOCK_ID};
use crate::stream::finish::FinishSignal;

/// Per-stream translator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformerState {
    pub active_text_id: Option<&'static str>,
    pub finish_reason: FinishReason,
}

/// Emit the events that precede every stream.
pub fn start(out: &mut Vec<NormalizedEvent>) {
    out.push(NormalizedEvent::StreamStart);
}

/// Translate one parse result, appending any derived events to `out`.
///
/// At most one dispatch rule runs per item. A parse failure becomes an
/// `Error` event; it never ends the stream.
#[must_use]
pub fn step(
    mut state: TransformerState,
    item: ParseResult,
    out: &mut Vec<NormalizedEvent>,
) -> TransformerState {
    let chunk = match item {
        Ok(chunk) => chunk,
        Err(cause) => {
            tracing::warn!(error = %cause, "agent chunk failed validation");
            state.finish_reason = state.finish_reason.apply(FinishSignal::PARSE_FAILURE);
            out.push(NormalizedEvent::Error { cause });
            return state;
        }
    };

    match chunk {
        IncomingChunk::AssistantMessage {
            content: Some(blocks),
        } => push_tool_calls(blocks, out),
        IncomingChunk::StreamEvent { event } => {
            if let Some(event) = event {
                state = apply_stream_event(state, event, out);
            }
        }
        IncomingChunk::UserMessage {
            content: Some(blocks),
        } => push_tool_results(blocks, out),
        IncomingChunk::ResultMessage { subtype } => {
            let signal = FinishSignal::from_result_subtype(subtype.as_deref());
            state.finish_reason = state.finish_reason.apply(signal);
        }
        IncomingChunk::AssistantMessage { content: None }
        | IncomingChunk::UserMessage { content: None }
        | IncomingChunk::Unrecognized { .. } => {}
    }
    state
}

/// Close the open text block, if any, and emit the single `Finish` event.
#[must_use]
pub fn flush(mut state: TransformerState, out: &mut Vec<NormalizedEvent>) -> TransformerState {
    if let Some(id) = state.active_text_id.take() {
        out.push(NormalizedEvent::TextEnd { id: id.to_string() });
    }
    out.push(NormalizedEvent::Finish {
        reason: state.finish_reason,
        usage: Usage::default(),
    });
    state
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn push_tool_calls(blocks: Vec<ContentBlock>, out: &mut Vec<NormalizedEvent>) {
    for block in blocks {
        let (Some(id), Some(name), Some(input)) =
            (non_empty(block.id), non_empty(block.name), block.input)
        else {
            continue;
        };
        out.push(NormalizedEvent::ToolCall {
            id,
            name,
            args_json: input.get().to_string(),
        });
    }
}

fn push_tool_results(blocks: Vec<ContentBlock>, out: &mut Vec<NormalizedEvent>) {
    for block in blocks {
        let Some(id) = non_empty(block.tool_use_id) else {
            continue;
        };
        out.push(NormalizedEvent::ToolResult {
            id,
            result: block.content.unwrap_or_default(),
        });
    }
}

fn apply_stream_event(
    mut state: TransformerState,
    event: StreamEventBody,
    out: &mut Vec<NormalizedEvent>,
) -> TransformerState {
    let delta = event.delta.unwrap_or_default();
    match event.kind.as_deref() {
        Some("content_block_delta") => {
            if let Some(text) = non_empty(delta.text) {
                let id = match state.active_text_id {
                    Some(id) => id,
                    None => {
                        state.active_text_id = Some(TEXT_BLOCK_ID);
                        out.push(NormalizedEvent::TextStart {
                            id: TEXT_BLOCK_ID.to_string(),
                        });
                        TEXT_BLOCK_ID
                    }
                };
                out.push(NormalizedEvent::TextDelta {
                    id: id.to_string(),
                    text,
                });
            }
        }
        Some("message_delta") => {
            if let Some(signal) = non_empty(delta.stop_reason)
                .as_deref()
                .and_then(FinishSignal::from_stop_reason)
            {
                state.finish_reason = state.finish_reason.apply(signal);
            }
        }
        Some("message_stop") => {
            state.finish_reason = state.finish_reason.apply(FinishSignal::MESSAGE_STOP);
        }
        _ => {}
    }
    state
}

/// Owns the translator state for one generation request.
#[derive(Debug, Default)]
pub struct StreamTransformer {
    state: TransformerState,
}

impl StreamTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> TransformerState {
        self.state
    }

    pub fn start_into(&mut self, out: &mut Vec<NormalizedEvent>) {
        start(out);
    }

    pub fn transform_into(&mut self, item: ParseResult, out: &mut Vec<NormalizedEvent>) {
        self.state = step(self.state, item, out);
    }

    pub fn transform(&mut self, item: ParseResult) -> Vec<NormalizedEvent> {
        let mut events = Vec::new();
        self.transform_into(item, &mut events);
        events
    }

    pub fn flush_into(&mut self, out: &mut Vec<NormalizedEvent>) {
        self.state = flush(self.state, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::chunk::{validate, validate_value, ChunkParseError};
    use serde_json::json;

    fn chunk(message_type: &str, payload: serde_json::Value) -> ParseResult {
        validate_value(json!({
            "type": "agent_message",
            "message_type": message_type,
            "payload": payload
        }))
    }

    fn text_delta(text: &str) -> ParseResult {
        chunk(
            "StreamEvent",
            json!({"event": {"type": "content_block_delta", "delta": {"type": "text_delta", "text": text}}}),
        )
    }

    fn stop_reason(reason: &str) -> ParseResult {
        chunk(
            "StreamEvent",
            json!({"event": {"type": "message_delta", "delta": {"stop_reason": reason}}}),
        )
    }

    #[test]
    fn test_tool_call_from_assistant_message() {
        let mut transformer = StreamTransformer::new();
        let events = transformer.transform(chunk(
            "AssistantMessage",
            json!({"content": [{"id": "t1", "name": "foo", "input": {}}]}),
        ));
        assert_eq!(
            events,
            vec![NormalizedEvent::ToolCall {
                id: "t1".to_string(),
                name: "foo".to_string(),
                args_json: "{}".to_string(),
            }]
        );
        assert_eq!(transformer.state().finish_reason, FinishReason::Unknown);
    }

    #[test]
    fn test_tool_call_args_keep_gateway_key_order() {
        let mut transformer = StreamTransformer::new();
        let events = transformer.transform(validate(
            r#"{"type":"agent_message","message_type":"AssistantMessage","payload":{"content":[{"type":"tool_use","id":"t1","name":"lookup","input":{"zeta":1,"alpha":2.0}}]}}"#,
        ));
        assert_eq!(
            events,
            vec![NormalizedEvent::ToolCall {
                id: "t1".to_string(),
                name: "lookup".to_string(),
                args_json: r#"{"zeta":1,"alpha":2.0}"#.to_string(),
            }]
        );
    }

    #[test]
    fn test_tool_call_requires_id_name_and_input() {
        let mut transformer = StreamTransformer::new();
        let events = transformer.transform(chunk(
            "AssistantMessage",
            json!({"content": [
                {"type": "text", "text": "let me check"},
                {"id": "t1", "name": "foo"},
                {"id": "", "name": "foo", "input": {}},
                {"name": "foo", "input": {}},
                {"id": "t2", "name": "bar", "input": null},
                {"id": "t3", "name": "baz", "input": {"city": "SF"}}
            ]}),
        ));
        assert_eq!(
            events,
            vec![
                NormalizedEvent::ToolCall {
                    id: "t2".to_string(),
                    name: "bar".to_string(),
                    args_json: "null".to_string(),
                },
                NormalizedEvent::ToolCall {
                    id: "t3".to_string(),
                    name: "baz".to_string(),
                    args_json: r#"{"city":"SF"}"#.to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_text_block_opens_once() {
        let mut transformer = StreamTransformer::new();
        let first = transformer.transform(text_delta("Hi"));
        let second = transformer.transform(text_delta(" there"));
        assert_eq!(
            first,
            vec![
                NormalizedEvent::TextStart {
                    id: TEXT_BLOCK_ID.to_string()
                },
                NormalizedEvent::TextDelta {
                    id: TEXT_BLOCK_ID.to_string(),
                    text: "Hi".to_string()
                },
            ]
        );
        assert_eq!(
            second,
            vec![NormalizedEvent::TextDelta {
                id: TEXT_BLOCK_ID.to_string(),
                text: " there".to_string()
            }]
        );
        assert_eq!(transformer.state().active_text_id, Some(TEXT_BLOCK_ID));
    }

    #[test]
    fn test_empty_text_delta_is_ignored() {
        let mut transformer = StreamTransformer::new();
        assert!(transformer.transform(text_delta("")).is_empty());
        assert_eq!(transformer.state().active_text_id, None);
    }

    #[test]
    fn test_stop_reasons() {
        let mut transformer = StreamTransformer::new();
        assert!(transformer.transform(stop_reason("max_tokens")).is_empty());
        assert_eq!(transformer.state().finish_reason, FinishReason::Unknown);

        let _ = transformer.transform(stop_reason("tool_use"));
        assert_eq!(transformer.state().finish_reason, FinishReason::ToolCalls);

        let _ = transformer.transform(stop_reason("stop_sequence"));
        assert_eq!(transformer.state().finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_message_stop_only_fills_unknown() {
        let message_stop = || chunk("StreamEvent", json!({"event": {"type": "message_stop"}}));

        let mut transformer = StreamTransformer::new();
        let _ = transformer.transform(message_stop());
        assert_eq!(transformer.state().finish_reason, FinishReason::Stop);

        let mut transformer = StreamTransformer::new();
        let _ = transformer.transform(stop_reason("tool_use"));
        let _ = transformer.transform(message_stop());
        assert_eq!(transformer.state().finish_reason, FinishReason::ToolCalls);
    }

    #[test]
    fn test_tool_results_from_user_message() {
        let mut transformer = StreamTransformer::new();
        let events = transformer.transform(chunk(
            "UserMessage",
            json!({"content": [
                {"tool_use_id": "t1", "content": "72F and sunny"},
                {"tool_use_id": "t2"},
                {"text": "not a tool result"}
            ]}),
        ));
        assert_eq!(
            events,
            vec![
                NormalizedEvent::ToolResult {
                    id: "t1".to_string(),
                    result: "72F and sunny".to_string()
                },
                NormalizedEvent::ToolResult {
                    id: "t2".to_string(),
                    result: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_result_message_subtypes() {
        let result = |subtype: &str| chunk("ResultMessage", json!({"subtype": subtype}));

        let mut transformer = StreamTransformer::new();
        assert!(transformer.transform(result("success")).is_empty());
        assert_eq!(transformer.state().finish_reason, FinishReason::Stop);

        let mut transformer = StreamTransformer::new();
        let _ = transformer.transform(result("error_max_turns"));
        assert_eq!(transformer.state().finish_reason, FinishReason::Other);

        let _ = transformer.transform(result("error"));
        assert_eq!(transformer.state().finish_reason, FinishReason::Error);
    }

    #[test]
    fn test_parse_failure_sets_error_and_continues() {
        let mut transformer = StreamTransformer::new();
        let cause = ChunkParseError::new("bad", "{");
        let events = transformer.transform(Err(cause.clone()));
        assert_eq!(events, vec![NormalizedEvent::Error { cause }]);
        assert_eq!(transformer.state().finish_reason, FinishReason::Error);

        let events = transformer.transform(text_delta("still here"));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_unrecognized_and_empty_chunks_are_noops() {
        let mut transformer = StreamTransformer::new();
        assert!(transformer
            .transform(chunk("SystemMessage", json!({"subtype": "init"})))
            .is_empty());
        assert!(transformer
            .transform(chunk("AssistantMessage", json!({})))
            .is_empty());
        assert!(transformer
            .transform(chunk("StreamEvent", json!({"event": {"type": "ping"}})))
            .is_empty());
        assert_eq!(transformer.state(), TransformerState::default());
    }

    #[test]
    fn test_flush_closes_text_and_finishes() {
        let mut transformer = StreamTransformer::new();
        let _ = transformer.transform(text_delta("Hi"));
        let mut out = Vec::new();
        transformer.flush_into(&mut out);
        assert_eq!(
            out,
            vec![
                NormalizedEvent::TextEnd {
                    id: TEXT_BLOCK_ID.to_string()
                },
                NormalizedEvent::Finish {
                    reason: FinishReason::Unknown,
                    usage: Usage::default()
                },
            ]
        );
        assert_eq!(transformer.state().active_text_id, None);
    }

    #[test]
    fn test_pure_step_threads_state() {
        let mut out = Vec::new();
        start(&mut out);
        let state = step(TransformerState::default(), text_delta("a"), &mut out);
        let state = step(state, stop_reason("end_turn"), &mut out);
        let state = flush(state, &mut out);
        assert_eq!(state.finish_reason, FinishReason::Stop);
        assert_eq!(out.first(), Some(&NormalizedEvent::StreamStart));
        assert!(out.last().is_some_and(NormalizedEvent::is_finish));
        assert_eq!(out.len(), 5);
    }
}
