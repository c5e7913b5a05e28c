use super::{GreetTool, Tool, ToolDefinition, ToolError, ToolOutputStream};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Tools offered to the model, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_tools(step_delay: Duration) -> Self {
        let mut registry = Self::new();
        registry.register(GreetTool::new(step_delay));
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, "tool registered");
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Look up `name`, validate `input` against its schema, and start it.
    pub fn execute(&self, name: &str, input: Value) -> Result<ToolOutputStream, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.schema()
            .validate(&input)
            .map_err(|violation| ToolError::InvalidInput {
                tool: name.to_string(),
                violation,
            })?;
        tracing::debug!(tool = %name, "tool execution started");
        Ok(tool.execute(input))
    }
}
