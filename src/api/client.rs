use super::error::ApiError;
use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::{Config, Provider};
use crate::tools::ToolDefinition;
use crate::types::{ApiMessage, Content, ContentBlock};
use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use serde_json::Value;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.\n\
When a tool fits the request, call it instead of answering from memory.\n\
Report what the tool returned in one or two sentences.";

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, messages: &[ApiMessage]) -> Result<ByteStream>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    anthropic_version: String,
    provider: Provider,
    max_tokens: u32,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_url: config.api_url.clone(),
            anthropic_version: config.anthropic_version.clone(),
            provider: config.provider,
            max_tokens: config.max_tokens,
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: String::new(),
            model: "mock-model".to_string(),
            api_url: "http://localhost:8000/v1/messages".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            provider: Provider::Anthropic,
            max_tokens: 1024,
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_stream(
        &self,
        messages: &[ApiMessage],
        tools: &[ToolDefinition],
    ) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(messages);
            }
        }

        let request_url = self.api_url.clone();
        let payload = self.request_payload(messages, tools);

        let mut request = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(&payload);

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, &payload);
        }

        match self.provider {
            Provider::Anthropic => {
                request = request.header("x-api-key", &self.api_key);
                if !self.anthropic_version.trim().is_empty() {
                    request = request.header("anthropic-version", &self.anthropic_version);
                }
            }
            Provider::OpenAi => {
                request = request.header("authorization", format!("Bearer {}", self.api_key));
            }
        }

        tracing::info!(
            target: "dualstream::api",
            url = %request_url,
            model = %self.model,
            tools = tools.len(),
            "opening stream"
        );

        let response = request
            .send()
            .await
            .map_err(|error| ApiError::from_reqwest(error, &request_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(&request_url, status.as_u16(), body).into());
        }

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| {
                anyhow::Error::from(ApiError::from_reqwest(error, &request_url_for_stream))
            })
        });
        Ok(Box::pin(stream))
    }

    fn request_payload(&self, messages: &[ApiMessage], tools: &[ToolDefinition]) -> Value {
        let mut payload = match self.provider {
            Provider::Anthropic => json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "stream": true,
                "system": SYSTEM_PROMPT,
                "messages": messages,
            }),
            Provider::OpenAi => json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "stream": true,
                "messages": openai_messages(messages, SYSTEM_PROMPT),
            }),
        };

        if !tools.is_empty() {
            if let Some(payload_object) = payload.as_object_mut() {
                match self.provider {
                    Provider::Anthropic => {
                        payload_object.insert("tool_choice".to_string(), json!({ "type": "auto" }));
                        payload_object.insert("tools".to_string(), tool_definitions(tools));
                    }
                    Provider::OpenAi => {
                        payload_object.insert("tool_choice".to_string(), json!("auto"));
                        payload_object.insert("tools".to_string(), tool_definitions_openai(tools));
                    }
                }
            }
        }

        payload
    }
}

fn openai_messages(messages: &[ApiMessage], system_prompt: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(json!({
        "role": "system",
        "content": system_prompt
    }));

    for message in messages {
        append_openai_message(&mut out, message);
    }

    out
}

fn append_openai_message(out: &mut Vec<Value>, message: &ApiMessage) {
    match (&message.role[..], &message.content) {
        (role, Content::Text(text)) => {
            out.push(json!({
                "role": role,
                "content": text
            }));
        }
        ("assistant", Content::Blocks(blocks)) => {
            let mut content = String::new();
            let mut tool_calls = Vec::new();

            for block in blocks {
                match block {
                    ContentBlock::Text { text } => content.push_str(text),
                    ContentBlock::ToolUse { id, name, input } => {
                        tool_calls.push(json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": tool_input_to_json_string(input),
                            }
                        }));
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }

            let mut assistant_message = serde_json::Map::new();
            assistant_message.insert("role".to_string(), json!("assistant"));
            if content.is_empty() {
                assistant_message.insert("content".to_string(), Value::Null);
            } else {
                assistant_message.insert("content".to_string(), Value::String(content));
            }
            if !tool_calls.is_empty() {
                assistant_message.insert("tool_calls".to_string(), Value::Array(tool_calls));
            }
            out.push(Value::Object(assistant_message));
        }
        (role, Content::Blocks(blocks)) => {
            let mut pushed = false;
            for block in blocks {
                match block {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => {
                        out.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content
                        }));
                        pushed = true;
                    }
                    ContentBlock::Text { text } => {
                        out.push(json!({
                            "role": role,
                            "content": text
                        }));
                        pushed = true;
                    }
                    ContentBlock::ToolUse { .. } => {}
                }
            }

            if !pushed {
                out.push(json!({
                    "role": role,
                    "content": ""
                }));
            }
        }
    }
}

fn tool_input_to_json_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        _ => serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()),
    }
}

fn tool_definitions(tools: &[ToolDefinition]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect(),
    )
}

fn tool_definitions_openai(tools: &[ToolDefinition]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect(),
    )
}
