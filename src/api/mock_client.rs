use crate::api::client::{ByteStream, MockStreamProducer};
use crate::api::error::ApiError;
use crate::types::ApiMessage;
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum MockResponse {
    Chunks(Vec<String>),
    Failure(ApiError),
}

/// Scripted responses, one per `create_stream` call.
#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<Vec<ApiMessage>>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(MockResponse::Chunks).collect(),
            )),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The first request fails with `error`.
    pub fn failing(error: ApiError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from([MockResponse::Failure(error)]))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn recorded_requests(&self) -> Vec<Vec<ApiMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, messages: &[ApiMessage]) -> Result<ByteStream> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.responses.lock().unwrap().pop_front();
        let current_sse_chunks = match next {
            Some(MockResponse::Chunks(chunks)) => chunks,
            Some(MockResponse::Failure(error)) => return Err(error.into()),
            None => {
                return Err(anyhow::anyhow!(
                    "MockApiClient: No more responses configured"
                ))
            }
        };

        let sse_byte_chunks: Vec<Result<Bytes>> = current_sse_chunks
            .into_iter()
            .map(|s| {
                let framed = if s.ends_with("\n\n") {
                    s
                } else {
                    format!("{s}\n\n")
                };
                Ok(Bytes::from(framed))
            })
            .collect();

        Ok(Box::pin(stream::iter(sse_byte_chunks)))
    }
}

/// SSE frames for an Anthropic turn that streams `text` and then calls one tool.
pub fn anthropic_tool_turn(text: &str, tool_id: &str, tool_name: &str, input_json: &str) -> Vec<String> {
    let mut frames = vec![
        r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_1","role":"assistant","model":"mock-model"}}"#
            .to_string(),
    ];
    if !text.is_empty() {
        frames.extend(anthropic_text_block(0, text));
    }
    let tool_index = if text.is_empty() { 0 } else { 1 };
    frames.push(format!(
        "event: content_block_start\ndata: {}",
        serde_json::json!({
            "type": "content_block_start",
            "index": tool_index,
            "content_block": {"type": "tool_use", "id": tool_id, "name": tool_name, "input": {}}
        })
    ));
    frames.push(format!(
        "event: content_block_delta\ndata: {}",
        serde_json::json!({
            "type": "content_block_delta",
            "index": tool_index,
            "delta": {"type": "input_json_delta", "partial_json": input_json}
        })
    ));
    frames.push(format!(
        "event: content_block_stop\ndata: {{\"type\":\"content_block_stop\",\"index\":{tool_index}}}"
    ));
    frames.extend(anthropic_message_end("tool_use"));
    frames
}

/// SSE frames for an Anthropic turn that only streams `text`.
pub fn anthropic_text_turn(text: &str) -> Vec<String> {
    let mut frames = vec![
        r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_2","role":"assistant","model":"mock-model"}}"#
            .to_string(),
    ];
    frames.extend(anthropic_text_block(0, text));
    frames.extend(anthropic_message_end("end_turn"));
    frames
}

fn anthropic_text_block(index: usize, text: &str) -> Vec<String> {
    vec![
        format!(
            "event: content_block_start\ndata: {{\"type\":\"content_block_start\",\"index\":{index},\"content_block\":{{\"type\":\"text\",\"text\":\"\"}}}}"
        ),
        format!(
            "event: content_block_delta\ndata: {}",
            serde_json::json!({
                "type": "content_block_delta",
                "index": index,
                "delta": {"type": "text_delta", "text": text}
            })
        ),
        format!("event: content_block_stop\ndata: {{\"type\":\"content_block_stop\",\"index\":{index}}}"),
    ]
}

fn anthropic_message_end(stop_reason: &str) -> Vec<String> {
    vec![
        format!(
            "event: message_delta\ndata: {{\"type\":\"message_delta\",\"delta\":{{\"stop_reason\":\"{stop_reason}\"}}}}"
        ),
        "event: message_stop\ndata: {\"type\":\"message_stop\"}".to_string(),
    ]
}
