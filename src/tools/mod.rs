pub mod greet;
pub mod registry;
pub mod schema;

use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use greet::GreetTool;
pub use registry::ToolRegistry;
pub use schema::{SchemaProperty, SchemaType, SchemaViolation, ToolSchema};

/// Lazy sequence of values produced by one tool execution. Every value but the
/// last is a progress update; the last one is the tool's result.
pub type ToolOutputStream = BoxStream<'static, Result<Value, ToolError>>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' is not registered")]
    NotFound(String),
    #[error("invalid input for tool '{tool}': {violation}")]
    InvalidInput {
        tool: String,
        #[source]
        violation: SchemaViolation,
    },
    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
}

impl ToolError {
    pub fn name(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "NoSuchToolError",
            ToolError::InvalidInput { .. } => "InvalidToolInputError",
            ToolError::Execution { .. } => "ToolExecutionError",
        }
    }
}

/// Name, description and JSON schema as sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> &ToolSchema;

    /// Start an execution. `input` has already passed `schema()` validation.
    fn execute(&self, input: Value) -> ToolOutputStream;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema().to_json(),
        }
    }
}
