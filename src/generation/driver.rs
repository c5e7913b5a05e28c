use super::event::{
    ErrorRecord, FinishReason, GenerationError, GenerationEvent, ToolCallRecord, ToolResultRecord,
};
use super::{lock_record, GenerationRequest, SharedRecord};
use crate::api::stream::StreamParser;
use crate::api::ApiClient;
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::types::{ApiMessage, Content, ContentBlock, StreamEvent};
use anyhow::Result;
use futures::StreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

struct PendingToolInput {
    id: String,
    name: String,
    seed: Value,
    json: String,
}

impl PendingToolInput {
    fn into_call(self) -> ToolCallRecord {
        let input = if self.json.trim().is_empty() {
            self.seed
        } else {
            match serde_json::from_str(&self.json) {
                Ok(value) => value,
                Err(_) => Value::String(self.json),
            }
        };
        ToolCallRecord {
            tool_call_id: self.id,
            tool_name: self.name,
            input,
        }
    }
}

struct StepOutcome {
    text: String,
    tool_calls: Vec<ToolCallRecord>,
    finish_reason: FinishReason,
}

struct Driver {
    client: Arc<ApiClient>,
    tools: ToolRegistry,
    definitions: Vec<ToolDefinition>,
    messages: Vec<ApiMessage>,
    tx: mpsc::UnboundedSender<GenerationEvent>,
    record: SharedRecord,
}

pub(super) async fn run(
    client: Arc<ApiClient>,
    request: GenerationRequest,
    tx: mpsc::UnboundedSender<GenerationEvent>,
    record: SharedRecord,
) {
    let mut driver = Driver {
        client,
        definitions: request.tools.definitions(),
        tools: request.tools,
        messages: vec![ApiMessage::user_text(request.prompt)],
        tx,
        record,
    };

    driver.emit(GenerationEvent::Start);
    if let Err(error) = driver.run_steps(request.max_steps.max(1)).await {
        let error = ErrorRecord::from_anyhow(&error);
        tracing::warn!(
            target: "dualstream::generation",
            name = %error.name,
            message = %error.message,
            "generation failed"
        );
        {
            let mut record = lock_record(&driver.record);
            record.finish_reason = Some(FinishReason::Error);
            record.failure = Some(error.clone());
        }
        driver.emit(GenerationEvent::Error { error });
    }
}

impl Driver {
    fn emit(&self, event: GenerationEvent) {
        // The consumer may have stopped listening; the record still settles.
        let _ = self.tx.send(event);
    }

    async fn run_steps(&mut self, max_steps: usize) -> Result<()> {
        let mut finish_reason = FinishReason::Unknown;
        let mut steps = 0;

        for step in 1..=max_steps {
            steps = step;
            let outcome = self.run_step(step).await?;
            finish_reason = outcome.finish_reason;
            let results = self.execute_tool_calls(&outcome.tool_calls).await;

            {
                let mut record = lock_record(&self.record);
                record.text = outcome.text.clone();
                record.steps = step;
            }
            self.emit(GenerationEvent::FinishStep {
                step,
                finish_reason,
            });

            if outcome.tool_calls.is_empty() || step == max_steps {
                break;
            }
            self.append_round(outcome, results);
        }

        lock_record(&self.record).finish_reason = Some(finish_reason);
        tracing::debug!(
            target: "dualstream::generation",
            steps,
            ?finish_reason,
            "generation finished"
        );
        self.emit(GenerationEvent::Finish {
            finish_reason,
            steps,
        });
        Ok(())
    }

    async fn run_step(&mut self, step: usize) -> Result<StepOutcome> {
        self.emit(GenerationEvent::StartStep { step });

        let mut stream = self
            .client
            .create_stream(&self.messages, &self.definitions)
            .await?;
        let mut parser = StreamParser::new();
        let mut text = String::new();
        let mut pending: BTreeMap<usize, PendingToolInput> = BTreeMap::new();
        let mut tool_calls = Vec::new();
        let mut stop_reason: Option<String> = None;

        'stream: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in parser.process(&chunk)? {
                match event {
                    StreamEvent::ContentBlockStart {
                        index,
                        content_block,
                    } => match content_block {
                        ContentBlock::Text { text: initial } => {
                            if !initial.is_empty() {
                                text.push_str(&initial);
                                self.emit(GenerationEvent::TextDelta { text: initial });
                            }
                        }
                        ContentBlock::ToolUse { id, name, input } => {
                            self.emit(GenerationEvent::ToolInputStart {
                                tool_call_id: id.clone(),
                                tool_name: name.clone(),
                            });
                            pending.insert(
                                index,
                                PendingToolInput {
                                    id,
                                    name,
                                    seed: input,
                                    json: String::new(),
                                },
                            );
                        }
                        ContentBlock::ToolResult { .. } => {}
                    },
                    StreamEvent::ContentBlockDelta { index, delta } => {
                        if let Some(delta_text) = delta.text.filter(|t| !t.is_empty()) {
                            text.push_str(&delta_text);
                            self.emit(GenerationEvent::TextDelta { text: delta_text });
                        }
                        if let Some(partial_json) = delta.partial_json {
                            if let Some(input) = pending.get_mut(&index) {
                                input.json.push_str(&partial_json);
                                self.emit(GenerationEvent::ToolInputDelta {
                                    tool_call_id: input.id.clone(),
                                    delta: partial_json,
                                });
                            }
                        }
                    }
                    StreamEvent::ContentBlockStop { index } => {
                        if let Some(input) = pending.remove(&index) {
                            let call = input.into_call();
                            self.emit_tool_call(&call);
                            tool_calls.push(call);
                        }
                    }
                    StreamEvent::MessageDelta { delta } => {
                        if delta.stop_reason.is_some() {
                            stop_reason = delta.stop_reason;
                        }
                    }
                    StreamEvent::MessageStop => break 'stream,
                    StreamEvent::Error { error } => {
                        return Err(GenerationError::Provider {
                            error_type: error.error_type,
                            message: error.message,
                        }
                        .into());
                    }
                    StreamEvent::MessageStart { .. } | StreamEvent::Unknown => {}
                }
            }
        }

        // Blocks the provider never closed still count as calls.
        for (_, input) in std::mem::take(&mut pending) {
            let call = input.into_call();
            self.emit_tool_call(&call);
            tool_calls.push(call);
        }

        Ok(StepOutcome {
            text,
            tool_calls,
            finish_reason: FinishReason::from_stop_reason(stop_reason.as_deref()),
        })
    }

    fn emit_tool_call(&self, call: &ToolCallRecord) {
        lock_record(&self.record).tool_calls.push(call.clone());
        self.emit(GenerationEvent::ToolCall {
            tool_call_id: call.tool_call_id.clone(),
            tool_name: call.tool_name.clone(),
            input: call.input.clone(),
        });
    }

    /// Run each call to completion. Returns the tool-result blocks to send back
    /// to the model.
    async fn execute_tool_calls(&self, calls: &[ToolCallRecord]) -> Vec<ContentBlock> {
        let mut blocks = Vec::with_capacity(calls.len());

        for call in calls {
            let outputs = match self.tools.execute(&call.tool_name, call.input.clone()) {
                Ok(outputs) => outputs,
                Err(error) => {
                    let error = ErrorRecord::from_tool_error(&error);
                    blocks.push(tool_result_block(call, error.to_string(), true));
                    self.emit_tool_error(call, error);
                    continue;
                }
            };

            let mut outputs = outputs.peekable();
            let mut last = None;
            while let Some(item) = outputs.next().await {
                match item {
                    Ok(output) => {
                        let preliminary = Pin::new(&mut outputs).peek().await.is_some();
                        self.emit(GenerationEvent::ToolResult {
                            tool_call_id: call.tool_call_id.clone(),
                            tool_name: call.tool_name.clone(),
                            output: output.clone(),
                            preliminary,
                        });
                        last = Some(output);
                    }
                    Err(error) => {
                        let error = ErrorRecord::from_tool_error(&error);
                        blocks.push(tool_result_block(call, error.to_string(), true));
                        self.emit_tool_error(call, error);
                        last = None;
                        break;
                    }
                }
            }

            if let Some(output) = last {
                blocks.push(tool_result_block(call, output.to_string(), false));
                lock_record(&self.record).tool_results.push(ToolResultRecord {
                    tool_call_id: call.tool_call_id.clone(),
                    tool_name: call.tool_name.clone(),
                    output,
                });
            }
        }

        blocks
    }

    fn emit_tool_error(&self, call: &ToolCallRecord, error: ErrorRecord) {
        tracing::debug!(
            target: "dualstream::generation",
            tool = %call.tool_name,
            error = %error,
            "tool call failed"
        );
        self.emit(GenerationEvent::ToolError {
            tool_call_id: call.tool_call_id.clone(),
            tool_name: call.tool_name.clone(),
            error,
        });
    }

    fn append_round(&mut self, outcome: StepOutcome, results: Vec<ContentBlock>) {
        let mut assistant_blocks = Vec::new();
        if !outcome.text.is_empty() {
            assistant_blocks.push(ContentBlock::Text { text: outcome.text });
        }
        assistant_blocks.extend(outcome.tool_calls.into_iter().map(|call| {
            ContentBlock::ToolUse {
                id: call.tool_call_id,
                name: call.tool_name,
                input: call.input,
            }
        }));

        self.messages.push(ApiMessage {
            role: "assistant".to_string(),
            content: Content::Blocks(assistant_blocks),
        });
        self.messages.push(ApiMessage {
            role: "user".to_string(),
            content: Content::Blocks(results),
        });
    }
}

fn tool_result_block(call: &ToolCallRecord, content: String, is_error: bool) -> ContentBlock {
    ContentBlock::ToolResult {
        tool_use_id: call.tool_call_id.clone(),
        content,
        is_error,
    }
}
