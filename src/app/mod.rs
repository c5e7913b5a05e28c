//! Application controller: launches both consumers, routes their lines into
//! the panel pair and runs either the TUI or the headless line printer.

mod headless;

use crate::api::ApiClient;
use crate::config::Config;
use crate::consumer::{error_lines, ConsumerOutcome, StreamConsumer};
use crate::generation::{ErrorRecord, GenerationRequest};
use crate::terminal::{contain_panics, TerminalSession};
use crate::tools::ToolRegistry;
use crate::trace::{JsonlTraceSink, Tracer};
use crate::ui::input::KEY_HINTS;
use crate::ui::render::render_dual_panels;
use crate::ui::{Action, DualPanels, InputRouter, PanelLine, PanelSide};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::future::Future;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

pub const LEFT_TITLE: &str = "Direct";
pub const RIGHT_TITLE: &str = "Traced (wrapper)";
pub const EXIT_NOTICE: &str = "Press q to exit.";
const TRACE_SPAN_NAME: &str = "dualstream.traced";
const TUI_TICK_INTERVAL: Duration = Duration::from_millis(33);

pub enum UiUpdate {
    Line {
        panel: PanelSide,
        line: PanelLine,
    },
    ConsumerFinished {
        panel: PanelSide,
        outcome: ConsumerOutcome,
    },
    /// Both consumers are done, whatever their outcome.
    AllSettled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelRunState {
    Streaming,
    Done,
    Failed,
}

impl PanelRunState {
    fn label(self) -> &'static str {
        match self {
            PanelRunState::Streaming => "streaming",
            PanelRunState::Done => "done",
            PanelRunState::Failed => "failed",
        }
    }
}

pub struct App {
    model_label: String,
    panels: DualPanels,
    router: InputRouter,
    run_states: [PanelRunState; 2],
    settled: bool,
    should_quit: bool,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
    update_rx: mpsc::UnboundedReceiver<UiUpdate>,
}

impl App {
    pub fn new(model_label: impl Into<String>) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            model_label: model_label.into(),
            panels: DualPanels::new(LEFT_TITLE, RIGHT_TITLE),
            router: InputRouter,
            run_states: [PanelRunState::Streaming; 2],
            settled: false,
            should_quit: false,
            update_tx,
            update_rx,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<UiUpdate> {
        self.update_tx.clone()
    }

    pub fn panels(&self) -> &DualPanels {
        &self.panels
    }

    pub fn run_state(&self, side: PanelSide) -> PanelRunState {
        self.run_states[side.index()]
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Build both consumers from `config` and start them: left direct, right
    /// through the tracer.
    pub fn start(&self, config: &Config) -> Result<JoinHandle<()>> {
        let client = Arc::new(ApiClient::new(config)?);
        let request = GenerationRequest::new(
            config.prompt.clone(),
            ToolRegistry::with_builtin_tools(config.tool_step_delay),
        )
        .max_steps(config.max_steps);
        let tracer = Tracer::new(
            TRACE_SPAN_NAME,
            Arc::new(JsonlTraceSink::new(config.trace_path.clone())),
        );

        tracing::info!(
            target: "dualstream::app",
            model = %self.model_label,
            max_steps = config.max_steps,
            trace_path = %config.trace_path.display(),
            "starting consumers"
        );
        let direct = StreamConsumer::new(
            PanelSide::Left,
            Arc::clone(&client),
            request.clone(),
            self.sender(),
        );
        let traced =
            StreamConsumer::new(PanelSide::Right, client, request, self.sender()).traced(tracer);
        Ok(spawn_consumers(direct, traced, self.sender()))
    }

    pub async fn run(mut self, config: &Config) -> Result<()> {
        let _consumers = self.start(config)?;
        if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
            self.run_tui().await
        } else {
            self.run_headless().await
        }
    }

    /// Apply one update to the panels. Returns the lines appended, in order.
    pub fn apply_update(&mut self, update: UiUpdate) -> Vec<(PanelSide, PanelLine)> {
        match update {
            UiUpdate::Line { panel, line } => {
                self.panels.append(panel, line.clone());
                vec![(panel, line)]
            }
            UiUpdate::ConsumerFinished { panel, outcome } => {
                self.run_states[panel.index()] = match outcome {
                    ConsumerOutcome::Completed => PanelRunState::Done,
                    ConsumerOutcome::Failed(_) => PanelRunState::Failed,
                };
                Vec::new()
            }
            UiUpdate::AllSettled => {
                self.settled = true;
                PanelSide::BOTH
                    .into_iter()
                    .map(|side| {
                        let line = PanelLine::notice(EXIT_NOTICE);
                        self.panels.append(side, line.clone());
                        (side, line)
                    })
                    .collect()
            }
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::ToggleFocus => self.panels.toggle_focus(),
            Action::Scroll { target, action } => self.panels.scroll(target, action),
            Action::Quit => {
                tracing::info!(target: "dualstream::app", settled = self.settled, "quit requested");
                self.should_quit = true;
            }
        }
    }

    pub fn status_line(&self) -> String {
        let focused = match self.panels.focus().focused() {
            PanelSide::Left => LEFT_TITLE,
            PanelSide::Right => RIGHT_TITLE,
        };
        format!(
            "{}  {}: {}  {}: {}  focus: {}  {}",
            self.model_label,
            LEFT_TITLE,
            self.run_state(PanelSide::Left).label(),
            RIGHT_TITLE,
            self.run_state(PanelSide::Right).label(),
            focused,
            KEY_HINTS
        )
    }

    async fn run_tui(&mut self) -> Result<()> {
        let mut session = TerminalSession::enter()?;
        let mut tick = tokio::time::interval(TUI_TICK_INTERVAL);

        while !self.should_quit {
            if self.panels.take_render_request() {
                let status = self.status_line();
                let panels = &mut self.panels;
                session
                    .terminal()
                    .draw(|frame| render_dual_panels(frame, panels, &status))?;
            }
            self.process_terminal_events()?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {}
                update = self.update_rx.recv() => {
                    if let Some(update) = update {
                        self.apply_update(update);
                        self.panels.request_render();
                    }
                }
            }
        }
        Ok(())
    }

    fn process_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key)
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat =>
                {
                    if let Some(action) = self.router.route(key) {
                        self.handle_action(action);
                    }
                }
                Event::Resize(_, _) => self.panels.request_render(),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Spawn both consumers and a task that waits for both, whatever their
/// outcome, before announcing [`UiUpdate::AllSettled`].
pub fn spawn_consumers(
    left: StreamConsumer,
    right: StreamConsumer,
    updates: mpsc::UnboundedSender<UiUpdate>,
) -> JoinHandle<()> {
    spawn_settled(left.consume(), right.consume(), updates)
}

fn spawn_settled<L, R>(left: L, right: R, updates: mpsc::UnboundedSender<UiUpdate>) -> JoinHandle<()>
where
    L: Future<Output = ConsumerOutcome> + Send + 'static,
    R: Future<Output = ConsumerOutcome> + Send + 'static,
{
    let left_task = tokio::spawn(contain_panics(left));
    let right_task = tokio::spawn(contain_panics(right));

    tokio::spawn(async move {
        let (left_result, right_result) = tokio::join!(left_task, right_task);
        for (side, result) in [(PanelSide::Left, left_result), (PanelSide::Right, right_result)] {
            if let Err(join_error) = result {
                let error = join_error_record(join_error);
                tracing::error!(target: "dualstream::app", panel = ?side, error = %error, "consumer task aborted");
                for line in error_lines(&error) {
                    let _ = updates.send(UiUpdate::Line { panel: side, line });
                }
                let _ = updates.send(UiUpdate::ConsumerFinished {
                    panel: side,
                    outcome: ConsumerOutcome::Failed(error),
                });
            }
        }
        tracing::info!(target: "dualstream::app", "all consumers settled");
        let _ = updates.send(UiUpdate::AllSettled);
    })
}

fn join_error_record(join_error: JoinError) -> ErrorRecord {
    if !join_error.is_panic() {
        return ErrorRecord::new("JoinError", join_error.to_string());
    }
    let payload = join_error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "consumer task panicked".to_string());
    ErrorRecord::new("TaskPanic", message)
}
