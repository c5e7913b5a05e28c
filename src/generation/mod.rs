//! Streaming text generation with tool calls.
//!
//! [`stream_text`] starts the request immediately on a background task and
//! hands back a [`GenerationStream`]. The stream yields [`GenerationEvent`]s in
//! arrival order; the follow-up retrievals ([`GenerationStream::text`] and
//! friends) drain whatever is left and then answer from the settled record.

mod driver;
pub mod event;

pub use event::{
    ErrorRecord, FinishReason, GenerationError, GenerationEvent, ToolCallRecord, ToolResultRecord,
};

use crate::api::ApiClient;
use crate::tools::ToolRegistry;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

pub const DEFAULT_MAX_STEPS: usize = 1;

#[derive(Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub tools: ToolRegistry,
    /// Upper bound on model round-trips; tool results are fed back to the
    /// model only while steps remain.
    pub max_steps: usize,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            prompt: prompt.into(),
            tools,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }
}

/// Everything a generation produced, accumulated across steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRecord {
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tool_results: Vec<ToolResultRecord>,
    pub finish_reason: Option<FinishReason>,
    pub steps: usize,
    pub failure: Option<ErrorRecord>,
}

/// Sees every event of a generation as it is consumed, then the settled record.
pub trait GenerationObserver: Send {
    fn on_event(&mut self, event: &GenerationEvent);

    fn on_finish(&mut self, record: &GenerationRecord);
}

type SharedRecord = Arc<Mutex<GenerationRecord>>;

fn lock_record(record: &SharedRecord) -> MutexGuard<'_, GenerationRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct GenerationStream {
    events: mpsc::UnboundedReceiver<GenerationEvent>,
    record: SharedRecord,
    observers: Vec<Box<dyn GenerationObserver>>,
    exhausted: bool,
}

/// Start a generation. The provider request is issued right away, whether or
/// not the returned stream is ever polled.
pub fn stream_text(client: Arc<ApiClient>, request: GenerationRequest) -> GenerationStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let record = SharedRecord::default();
    tokio::spawn(driver::run(client, request, tx, Arc::clone(&record)));
    GenerationStream {
        events: rx,
        record,
        observers: Vec::new(),
        exhausted: false,
    }
}

impl GenerationStream {
    pub fn observe(mut self, observer: impl GenerationObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Final text of the generation.
    pub async fn text(&mut self) -> Result<String, ErrorRecord> {
        self.settled().await.map(|record| record.text)
    }

    pub async fn tool_calls(&mut self) -> Result<Vec<ToolCallRecord>, ErrorRecord> {
        self.settled().await.map(|record| record.tool_calls)
    }

    /// Final result of every tool call; preliminary updates are not included.
    pub async fn tool_results(&mut self) -> Result<Vec<ToolResultRecord>, ErrorRecord> {
        self.settled().await.map(|record| record.tool_results)
    }

    pub async fn finish_reason(&mut self) -> Result<FinishReason, ErrorRecord> {
        self.settled()
            .await
            .map(|record| record.finish_reason.unwrap_or(FinishReason::Unknown))
    }

    async fn settled(&mut self) -> Result<GenerationRecord, ErrorRecord> {
        while self.next().await.is_some() {}
        let record = lock_record(&self.record).clone();
        match record.failure {
            Some(failure) => Err(failure),
            None => Ok(record),
        }
    }
}

impl Stream for GenerationStream {
    type Item = GenerationEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.exhausted {
            return Poll::Ready(None);
        }

        match this.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                for observer in &mut this.observers {
                    observer.on_event(&event);
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.exhausted = true;
                let record = lock_record(&this.record).clone();
                for observer in &mut this.observers {
                    observer.on_finish(&record);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::api::mock_client::{anthropic_text_turn, anthropic_tool_turn, MockApiClient};
    use crate::types::{Content, ContentBlock};
    use std::time::Duration;

    fn client(mock: MockApiClient) -> Arc<ApiClient> {
        Arc::new(ApiClient::new_mock(Arc::new(mock)))
    }

    fn greet_request() -> GenerationRequest {
        GenerationRequest::new(
            "Greet Alice",
            ToolRegistry::with_builtin_tools(Duration::ZERO),
        )
    }

    #[derive(Clone, Default)]
    struct Recorder {
        kinds: Arc<Mutex<Vec<&'static str>>>,
        finished: Arc<Mutex<Option<GenerationRecord>>>,
    }

    impl GenerationObserver for Recorder {
        fn on_event(&mut self, event: &GenerationEvent) {
            self.kinds.lock().unwrap().push(event.kind());
        }

        fn on_finish(&mut self, record: &GenerationRecord) {
            *self.finished.lock().unwrap() = Some(record.clone());
        }
    }

    #[tokio::test]
    async fn tool_turn_streams_every_greet_update_in_order() {
        let mock = MockApiClient::new(vec![anthropic_tool_turn(
            "Let me greet them.",
            "toolu_1",
            "greet",
            r#"{"name":"Alice"}"#,
        )]);
        let events: Vec<GenerationEvent> = stream_text(client(mock), greet_request())
            .collect()
            .await;

        let kinds: Vec<&str> = events.iter().map(GenerationEvent::kind).collect();
        assert_eq!(
            kinds,
            [
                "start",
                "start-step",
                "text-delta",
                "tool-input-start",
                "tool-input-delta",
                "tool-call",
                "tool-result",
                "tool-result",
                "tool-result",
                "tool-result",
                "finish-step",
                "finish",
            ]
        );

        let results: Vec<(&str, bool)> = events
            .iter()
            .filter_map(|event| match event {
                GenerationEvent::ToolResult {
                    output,
                    preliminary,
                    ..
                } => Some((output["status"].as_str().unwrap_or_default(), *preliminary)),
                _ => None,
            })
            .collect();
        assert_eq!(
            results,
            [
                ("starting", true),
                ("processing", true),
                ("generating", true),
                ("done", false),
            ]
        );
    }

    #[tokio::test]
    async fn follow_ups_resolve_after_the_stream_settles() {
        let mock = MockApiClient::new(vec![anthropic_tool_turn(
            "On it.",
            "toolu_1",
            "greet",
            r#"{"name":"Alice"}"#,
        )]);
        let mut generation = stream_text(client(mock), greet_request());

        assert_eq!(generation.text().await.unwrap(), "On it.");
        let calls = generation.tool_calls().await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "greet");
        assert_eq!(calls[0].input["name"], "Alice");

        let results = generation.tool_results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output["greeting"], "Hello, Alice! Nice to meet you.");
        assert_eq!(
            generation.finish_reason().await.unwrap(),
            FinishReason::ToolCalls
        );
        assert!(generation.next().await.is_none());
    }

    #[tokio::test]
    async fn request_failure_surfaces_as_error_event_and_failed_follow_ups() {
        let mock = MockApiClient::failing(ApiError::status(
            "http://localhost:8000/v1/messages",
            500,
            "overloaded",
        ));
        let mut generation = stream_text(client(mock), greet_request());

        let first = generation.next().await.unwrap();
        assert_eq!(first, GenerationEvent::Start);
        let second = generation.next().await.unwrap();
        assert_eq!(second.kind(), "start-step");
        let GenerationEvent::Error { error } = generation.next().await.unwrap() else {
            panic!("expected error event");
        };
        assert_eq!(error.name, "APICallError");
        assert_eq!(error.cause.as_deref(), Some("overloaded"));

        let failure = generation.text().await.unwrap_err();
        assert_eq!(failure, error);
        assert_eq!(generation.tool_results().await.unwrap_err(), error);
    }

    #[tokio::test]
    async fn provider_error_frames_fail_the_generation() {
        let mock = MockApiClient::new(vec![vec![
            r#"event: error
data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#
                .to_string(),
        ]]);
        let mut generation = stream_text(client(mock), greet_request());
        let failure = generation.text().await.unwrap_err();
        assert_eq!(failure.name, "ProviderError");
        assert_eq!(failure.message, "Overloaded");
    }

    #[tokio::test]
    async fn unknown_tools_become_tool_error_events() {
        let mock = MockApiClient::new(vec![anthropic_tool_turn(
            "",
            "toolu_9",
            "weather",
            r#"{"city":"Oslo"}"#,
        )]);
        let mut generation = stream_text(client(mock), greet_request());
        let mut tool_errors = Vec::new();
        while let Some(event) = generation.next().await {
            if let GenerationEvent::ToolError { error, .. } = event {
                tool_errors.push(error);
            }
        }
        assert_eq!(tool_errors.len(), 1);
        assert_eq!(tool_errors[0].name, "NoSuchToolError");
        assert!(generation.tool_results().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_tool_input_is_rejected_before_execution() {
        let mock = MockApiClient::new(vec![anthropic_tool_turn(
            "",
            "toolu_2",
            "greet",
            r#"{"name":7}"#,
        )]);
        let events: Vec<GenerationEvent> = stream_text(client(mock), greet_request())
            .collect()
            .await;
        assert!(events.iter().all(|event| event.kind() != "tool-result"));
        assert!(events.iter().any(|event| matches!(
            event,
            GenerationEvent::ToolError { error, .. } if error.name == "InvalidToolInputError"
        )));
    }

    #[tokio::test]
    async fn extra_steps_feed_tool_results_back_to_the_model() {
        let mock = MockApiClient::new(vec![
            anthropic_tool_turn("", "toolu_1", "greet", r#"{"name":"Alice"}"#),
            anthropic_text_turn("Greeted Alice."),
        ]);
        let recorder = mock.clone();
        let mut generation =
            stream_text(client(mock), greet_request().max_steps(2));

        assert_eq!(generation.text().await.unwrap(), "Greeted Alice.");
        assert_eq!(generation.finish_reason().await.unwrap(), FinishReason::Stop);

        let requests = recorder.recorded_requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1];
        assert_eq!(follow_up.len(), 3);
        let Content::Blocks(blocks) = &follow_up[2].content else {
            panic!("tool results are sent as blocks");
        };
        assert!(matches!(
            &blocks[0],
            ContentBlock::ToolResult { tool_use_id, is_error: false, .. } if tool_use_id == "toolu_1"
        ));
    }

    #[tokio::test]
    async fn single_step_does_not_call_the_model_again() {
        let mock = MockApiClient::new(vec![anthropic_tool_turn(
            "",
            "toolu_1",
            "greet",
            r#"{"name":"Alice"}"#,
        )]);
        let recorder = mock.clone();
        let mut generation = stream_text(client(mock), greet_request());
        generation.tool_results().await.unwrap();
        assert_eq!(recorder.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn observers_see_every_event_and_the_final_record() {
        let mock = MockApiClient::new(vec![anthropic_text_turn("Hi there")]);
        let recorder = Recorder::default();
        let mut generation = stream_text(client(mock), greet_request()).observe(recorder.clone());

        assert_eq!(generation.text().await.unwrap(), "Hi there");
        assert_eq!(
            *recorder.kinds.lock().unwrap(),
            ["start", "start-step", "text-delta", "finish-step", "finish"]
        );
        let finished = recorder.finished.lock().unwrap().clone().unwrap();
        assert_eq!(finished.text, "Hi there");
        assert_eq!(finished.steps, 1);
    }
}
