use crate::api::ApiError;
use crate::tools::ToolError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One incremental unit of a generation, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GenerationEvent {
    Start,
    StartStep {
        step: usize,
    },
    TextDelta {
        text: String,
    },
    ToolInputStart {
        tool_call_id: String,
        tool_name: String,
    },
    ToolInputDelta {
        tool_call_id: String,
        delta: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: Value,
        preliminary: bool,
    },
    ToolError {
        tool_call_id: String,
        tool_name: String,
        error: ErrorRecord,
    },
    FinishStep {
        step: usize,
        finish_reason: FinishReason,
    },
    Finish {
        finish_reason: FinishReason,
        steps: usize,
    },
    Error {
        error: ErrorRecord,
    },
}

impl GenerationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationEvent::Start => "start",
            GenerationEvent::StartStep { .. } => "start-step",
            GenerationEvent::TextDelta { .. } => "text-delta",
            GenerationEvent::ToolInputStart { .. } => "tool-input-start",
            GenerationEvent::ToolInputDelta { .. } => "tool-input-delta",
            GenerationEvent::ToolCall { .. } => "tool-call",
            GenerationEvent::ToolResult { .. } => "tool-result",
            GenerationEvent::ToolError { .. } => "tool-error",
            GenerationEvent::FinishStep { .. } => "finish-step",
            GenerationEvent::Finish { .. } => "finish",
            GenerationEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    Error,
    Other,
    Unknown,
}

impl FinishReason {
    /// Map a provider stop reason (Anthropic vocabulary) onto a finish reason.
    pub fn from_stop_reason(stop_reason: Option<&str>) -> Self {
        match stop_reason {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            Some("tool_use") => FinishReason::ToolCalls,
            Some(_) => FinishReason::Other,
            None => FinishReason::Unknown,
        }
    }
}

/// Failures raised by the generation loop itself.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{message}")]
    Provider { error_type: String, message: String },
}

impl GenerationError {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationError::Provider { .. } => "ProviderError",
        }
    }
}

/// Serializable projection of an error: its name and message. The cause is
/// kept for display but never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub name: String,
    pub message: String,
    #[serde(skip)]
    pub cause: Option<String>,
}

impl ErrorRecord {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let name = if let Some(api) = error.downcast_ref::<ApiError>() {
            api.name()
        } else if let Some(tool) = error.downcast_ref::<ToolError>() {
            tool.name()
        } else if let Some(generation) = error.downcast_ref::<GenerationError>() {
            generation.name()
        } else {
            "Error"
        };

        Self {
            name: name.to_string(),
            message: error.to_string(),
            cause: error.chain().nth(1).map(|cause| cause.to_string()),
        }
    }

    pub fn from_tool_error(error: &ToolError) -> Self {
        Self {
            name: error.name().to_string(),
            message: error.to_string(),
            cause: std::error::Error::source(error).map(|cause| cause.to_string()),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for ErrorRecord {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub input: Value,
}

/// Final (non-preliminary) output of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResultRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub output: Value,
}
