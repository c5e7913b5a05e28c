//! Tracing wrapper for generations: observes a stream without changing what
//! its consumer sees, then records one span per generation.

use crate::generation::{
    ErrorRecord, FinishReason, GenerationEvent, GenerationObserver, GenerationRecord,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSpan {
    pub trace_id: Uuid,
    pub name: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub event_counts: BTreeMap<&'static str, usize>,
    pub tool_calls: Vec<String>,
    pub preliminary_results: usize,
    pub steps: usize,
    pub text_chars: usize,
    pub finish_reason: Option<FinishReason>,
    pub error: Option<ErrorRecord>,
}

impl TraceSpan {
    fn new(name: &str, model: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            name: name.to_string(),
            model: model.to_string(),
            started_at: Utc::now(),
            duration_ms: 0,
            event_counts: BTreeMap::new(),
            tool_calls: Vec::new(),
            preliminary_results: 0,
            steps: 0,
            text_chars: 0,
            finish_reason: None,
            error: None,
        }
    }

    pub fn count(&self, kind: &str) -> usize {
        self.event_counts.get(kind).copied().unwrap_or(0)
    }
}

pub trait TraceSink: Send + Sync {
    fn record(&self, span: &TraceSpan) -> Result<()>;
}

/// Appends one JSON object per span to a file.
pub struct JsonlTraceSink {
    path: PathBuf,
}

impl JsonlTraceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, span: &TraceSpan) -> Result<()> {
        let mut line = serde_json::to_string(span)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open trace file {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("cannot write trace file {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTraceSink {
    spans: Mutex<Vec<TraceSpan>>,
}

impl MemoryTraceSink {
    pub fn spans(&self) -> Vec<TraceSpan> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, span: &TraceSpan) -> Result<()> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct Tracer {
    name: String,
    sink: Arc<dyn TraceSink>,
}

impl Tracer {
    pub fn new(name: impl Into<String>, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }

    /// Open a span for one generation against `model`.
    pub fn start(&self, model: &str) -> TraceObserver {
        TraceObserver {
            sink: Arc::clone(&self.sink),
            span: TraceSpan::new(&self.name, model),
            started: Instant::now(),
        }
    }
}

pub struct TraceObserver {
    sink: Arc<dyn TraceSink>,
    span: TraceSpan,
    started: Instant,
}

impl GenerationObserver for TraceObserver {
    fn on_event(&mut self, event: &GenerationEvent) {
        *self.span.event_counts.entry(event.kind()).or_insert(0) += 1;
        match event {
            GenerationEvent::ToolCall { tool_name, .. } => {
                self.span.tool_calls.push(tool_name.clone());
            }
            GenerationEvent::ToolResult {
                preliminary: true, ..
            } => self.span.preliminary_results += 1,
            GenerationEvent::Error { error } => self.span.error = Some(error.clone()),
            _ => {}
        }
    }

    fn on_finish(&mut self, record: &GenerationRecord) {
        self.span.duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.span.steps = record.steps;
        self.span.text_chars = record.text.chars().count();
        self.span.finish_reason = record.finish_reason;
        if self.span.error.is_none() {
            self.span.error = record.failure.clone();
        }

        tracing::info!(
            target: "dualstream::trace",
            trace_id = %self.span.trace_id,
            name = %self.span.name,
            model = %self.span.model,
            duration_ms = self.span.duration_ms,
            tool_calls = self.span.tool_calls.len(),
            failed = self.span.error.is_some(),
            "generation traced"
        );
        if let Err(error) = self.sink.record(&self.span) {
            tracing::warn!(target: "dualstream::trace", error = %error, "trace span not recorded");
        }
    }
}
