//! Drives one generation to completion and turns it into panel lines.

use crate::api::ApiClient;
use crate::app::UiUpdate;
use crate::generation::{stream_text, ErrorRecord, GenerationEvent, GenerationRequest, GenerationStream};
use crate::trace::Tracer;
use crate::ui::{PanelLine, PanelSide};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumerOutcome {
    Completed,
    Failed(ErrorRecord),
}

impl ConsumerOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ConsumerOutcome::Failed(_))
    }
}

pub struct StreamConsumer {
    panel: PanelSide,
    client: Arc<ApiClient>,
    request: GenerationRequest,
    tracer: Option<Tracer>,
    updates: mpsc::UnboundedSender<UiUpdate>,
}

impl StreamConsumer {
    pub fn new(
        panel: PanelSide,
        client: Arc<ApiClient>,
        request: GenerationRequest,
        updates: mpsc::UnboundedSender<UiUpdate>,
    ) -> Self {
        Self {
            panel,
            client,
            request,
            tracer: None,
            updates,
        }
    }

    /// Route the generation through `tracer` before consuming it.
    pub fn traced(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Start the generation and consume it. Never fails: errors end up as
    /// panel lines and in the returned outcome.
    pub async fn consume(self) -> ConsumerOutcome {
        let mut generation = stream_text(Arc::clone(&self.client), self.request.clone());
        if let Some(tracer) = &self.tracer {
            generation = generation.observe(tracer.start(self.client.model()));
        }

        while let Some(event) = generation.next().await {
            self.emit(PanelLine::plain(format_event(&event)));
        }

        let outcome = match self.summarize(&mut generation).await {
            Ok(()) => {
                self.emit(PanelLine::success("Done!"));
                ConsumerOutcome::Completed
            }
            Err(error) => {
                for line in error_lines(&error) {
                    self.emit(line);
                }
                ConsumerOutcome::Failed(error)
            }
        };

        tracing::info!(
            target: "dualstream::consumer",
            panel = ?self.panel,
            failed = outcome.is_failed(),
            "consumer finished"
        );
        let _ = self.updates.send(UiUpdate::ConsumerFinished {
            panel: self.panel,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn summarize(&self, generation: &mut GenerationStream) -> Result<(), ErrorRecord> {
        let text = generation.text().await?;
        self.emit(PanelLine::heading("--- Final text ---"));
        self.emit(PanelLine::plain(if text.is_empty() {
            "(empty)".to_string()
        } else {
            text
        }));

        let tool_calls = generation.tool_calls().await?;
        self.emit(PanelLine::heading("--- Tool calls ---"));
        self.emit(PanelLine::plain(pretty(&tool_calls)));

        let tool_results = generation.tool_results().await?;
        self.emit(PanelLine::heading("--- Tool results ---"));
        self.emit(PanelLine::plain(pretty(&tool_results)));
        Ok(())
    }

    fn emit(&self, line: PanelLine) {
        let _ = self.updates.send(UiUpdate::Line {
            panel: self.panel,
            line,
        });
    }
}

/// Pretty JSON for one event. Error events carry only name and message.
pub fn format_event(event: &GenerationEvent) -> String {
    pretty(event)
}

/// The red error line, plus a cause line when there is one.
pub fn error_lines(error: &ErrorRecord) -> Vec<PanelLine> {
    let mut lines = vec![PanelLine::error(format!("Error: {error}"))];
    if let Some(cause) = &error.cause {
        lines.push(PanelLine::muted(format!("Cause: {cause}")));
    }
    lines
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| format!("<unprintable: {error}>"))
}
