use super::logging::emit_sse_parse_error;
use crate::types::{ContentBlock, Delta, MessageDelta, ProviderError, StreamEvent};
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeSet;

const ANTHROPIC_EVENT_TYPES: [&str; 7] = [
    "message_start",
    "content_block_start",
    "content_block_delta",
    "content_block_stop",
    "message_delta",
    "message_stop",
    "error",
];

/// Incremental SSE decoder. Anthropic Messages events pass through; OpenAI chat
/// completion chunks are rewritten into the same event shape (text on block 0,
/// tool call `i` on block `i + 1`).
#[derive(Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
    open_tool_blocks: BTreeSet<usize>,
    finish_reason: Option<String>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
        let mut events = Vec::new();

        while let Some(end) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let frame = String::from_utf8_lossy(&frame[..end]).into_owned();
            self.process_frame(&frame, &mut events);
        }

        Ok(events)
    }

    fn process_frame(&mut self, frame: &str, events: &mut Vec<StreamEvent>) {
        let mut event_type: Option<&str> = None;
        let mut data_lines: Vec<&str> = Vec::new();

        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event_type = Some(rest.trim());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
            }
        }

        if data_lines.is_empty() {
            return;
        }
        let data = data_lines.join("\n");
        let data = data.trim();

        if data == "[DONE]" {
            self.finish_openai_stream(events);
            return;
        }

        match event_type {
            Some(kind) if ANTHROPIC_EVENT_TYPES.contains(&kind) => {
                match serde_json::from_str::<StreamEvent>(data) {
                    Ok(StreamEvent::Unknown) => {}
                    Ok(event) => events.push(event),
                    Err(e) => emit_sse_parse_error(Some(kind), data, &e),
                }
            }
            Some(_) => {}
            None => match serde_json::from_str::<Value>(data) {
                Ok(value) if value.get("choices").is_some() => {
                    self.map_openai_chunk(&value, events);
                }
                Ok(value) if value.get("error").is_some() && value.get("type").is_none() => {
                    events.push(StreamEvent::Error {
                        error: openai_error(&value["error"]),
                    });
                }
                Ok(value) => match serde_json::from_value::<StreamEvent>(value) {
                    Ok(StreamEvent::Unknown) => {}
                    Ok(event) => events.push(event),
                    Err(e) => emit_sse_parse_error(None, data, &e),
                },
                Err(e) => emit_sse_parse_error(None, data, &e),
            },
        }
    }

    fn map_openai_chunk(&mut self, chunk: &Value, events: &mut Vec<StreamEvent>) {
        let Some(choice) = chunk
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        else {
            return;
        };
        let delta = &choice["delta"];

        if let Some(text) = delta.get("content").and_then(Value::as_str) {
            if !text.is_empty() {
                events.push(StreamEvent::ContentBlockDelta {
                    index: 0,
                    delta: Delta {
                        delta_type: Some("text_delta".to_string()),
                        text: Some(text.to_string()),
                        partial_json: None,
                    },
                });
            }
        }

        if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for call in tool_calls {
                let call_index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                let block_index = call_index + 1;
                let function = &call["function"];

                if !self.open_tool_blocks.contains(&block_index) {
                    let id = call
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let name = function
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    self.open_tool_blocks.insert(block_index);
                    events.push(StreamEvent::ContentBlockStart {
                        index: block_index,
                        content_block: ContentBlock::ToolUse {
                            id,
                            name,
                            input: Value::Object(serde_json::Map::new()),
                        },
                    });
                }

                if let Some(arguments) = function.get("arguments").and_then(Value::as_str) {
                    if !arguments.is_empty() {
                        events.push(StreamEvent::ContentBlockDelta {
                            index: block_index,
                            delta: Delta {
                                delta_type: Some("input_json_delta".to_string()),
                                text: None,
                                partial_json: Some(arguments.to_string()),
                            },
                        });
                    }
                }
            }
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            self.finish_reason = Some(normalize_openai_finish_reason(reason).to_string());
            self.close_open_tool_blocks(events);
        }
    }

    fn close_open_tool_blocks(&mut self, events: &mut Vec<StreamEvent>) {
        for index in std::mem::take(&mut self.open_tool_blocks) {
            events.push(StreamEvent::ContentBlockStop { index });
        }
    }

    fn finish_openai_stream(&mut self, events: &mut Vec<StreamEvent>) {
        self.close_open_tool_blocks(events);
        events.push(StreamEvent::MessageDelta {
            delta: MessageDelta {
                stop_reason: self.finish_reason.take(),
            },
        });
        events.push(StreamEvent::MessageStop);
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

fn normalize_openai_finish_reason(reason: &str) -> &str {
    match reason {
        "tool_calls" | "function_call" => "tool_use",
        "stop" => "end_turn",
        "length" => "max_tokens",
        other => other,
    }
}

fn openai_error(error: &Value) -> ProviderError {
    ProviderError {
        error_type: error
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("api_error")
            .to_string(),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_frames_are_split() {
        let mut parser = StreamParser::new();
        let events = parser
            .process(b"event: message_stop\r\ndata: {\"type\":\"message_stop\"}\r\n\r\n")
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::MessageStop));
    }

    #[test]
    fn test_ping_is_skipped() {
        let mut parser = StreamParser::new();
        let events = parser
            .process(b"event: ping\ndata: {\"type\":\"ping\"}\n\n")
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_multibyte_split_across_chunks_survives() {
        let mut parser = StreamParser::new();
        let frame = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"héllo\"}}\n\n";
        let bytes = frame.as_bytes();
        let split = frame.find('é').unwrap() + 1;
        assert!(parser.process(&bytes[..split]).unwrap().is_empty());
        let events = parser.process(&bytes[split..]).unwrap();
        match &events[0] {
            StreamEvent::ContentBlockDelta { delta, .. } => {
                assert_eq!(delta.text.as_deref(), Some("héllo"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_openai_done_emits_stop_reason_and_message_stop() {
        let mut parser = StreamParser::new();
        let chunk = br#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}

data: [DONE]

"#;
        let events = parser.process(chunk).unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::MessageDelta { delta } => {
                assert_eq!(delta.stop_reason.as_deref(), Some("end_turn"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[1], StreamEvent::MessageStop));
    }

    #[test]
    fn test_openai_error_payload_maps_to_error_event() {
        let mut parser = StreamParser::new();
        let events = parser
            .process(b"data: {\"error\":{\"message\":\"quota\",\"type\":\"insufficient_quota\"}}\n\n")
            .unwrap();
        match &events[0] {
            StreamEvent::Error { error } => {
                assert_eq!(error.error_type, "insufficient_quota");
                assert_eq!(error.message, "quota");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
