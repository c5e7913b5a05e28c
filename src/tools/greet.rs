use super::{SchemaProperty, SchemaType, Tool, ToolError, ToolOutputStream, ToolSchema};
use futures::{stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const GREET_TOOL_NAME: &str = "greet";

/// Progress reported by the greet tool, one value per yield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GreetStatus {
    Starting { message: String },
    Processing { message: String },
    Generating { message: String },
    Done { greeting: String },
}

impl GreetStatus {
    pub fn sequence(name: &str) -> Vec<GreetStatus> {
        vec![
            GreetStatus::Starting {
                message: format!("Starting greeting for {name}..."),
            },
            GreetStatus::Processing {
                message: "Processing request...".to_string(),
            },
            GreetStatus::Generating {
                message: "Generating greeting...".to_string(),
            },
            GreetStatus::Done {
                greeting: format!("Hello, {name}! Nice to meet you."),
            },
        ]
    }
}

/// Greets a person by name, reporting four status updates on the way.
pub struct GreetTool {
    schema: ToolSchema,
    step_delay: Duration,
}

impl GreetTool {
    pub fn new(step_delay: Duration) -> Self {
        Self {
            schema: ToolSchema::object().property(
                SchemaProperty::new("name", SchemaType::String)
                    .description("Name of the person to greet")
                    .required(),
            ),
            step_delay,
        }
    }
}

impl Tool for GreetTool {
    fn name(&self) -> &str {
        GREET_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Greet a person by name. Reports progress while the greeting is prepared."
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn execute(&self, input: Value) -> ToolOutputStream {
        let name = input
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("stranger")
            .to_string();
        let step_delay = self.step_delay;

        stream::iter(GreetStatus::sequence(&name).into_iter().enumerate())
            .then(move |(step, status)| async move {
                if step > 0 && !step_delay.is_zero() {
                    tokio::time::sleep(step_delay).await;
                }
                serde_json::to_value(&status).map_err(|error| ToolError::Execution {
                    tool: GREET_TOOL_NAME.to_string(),
                    message: error.to_string(),
                })
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn yields_four_statuses_in_order() {
        let tool = GreetTool::new(Duration::ZERO);
        let outputs: Vec<Value> = tool
            .execute(json!({"name": "Alice"}))
            .map(|item| item.expect("greet step"))
            .collect()
            .await;

        let statuses: Vec<&str> = outputs
            .iter()
            .map(|value| value["status"].as_str().unwrap())
            .collect();
        assert_eq!(statuses, ["starting", "processing", "generating", "done"]);
        assert_eq!(outputs[0]["message"], "Starting greeting for Alice...");
        assert_eq!(outputs[3]["greeting"], "Hello, Alice! Nice to meet you.");
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_steps() {
        let tool = GreetTool::new(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        let count = tool.execute(json!({"name": "Bob"})).count().await;
        assert_eq!(count, 4);
        assert!(started.elapsed() >= Duration::from_millis(750));
    }

    #[test]
    fn definition_requires_name() {
        let definition = GreetTool::new(Duration::ZERO).definition();
        assert_eq!(definition.name, "greet");
        assert_eq!(definition.input_schema["required"], json!(["name"]));
    }
}
