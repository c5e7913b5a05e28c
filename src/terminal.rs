use crossterm::{
    cursor::{Hide, Show},
    event, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::cell::Cell;
use std::future::Future;
use std::io::{self, Stdout};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::Duration;

pub type TerminalType = Terminal<CrosstermBackend<Stdout>>;
static PANIC_HOOK_INSTALLED: Once = Once::new();

thread_local! {
    static CONTAINED_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Restores the terminal before the default hook prints, unless the panic
/// happens inside [`PanicContained`], where the runtime catches it and the
/// TUI keeps running.
pub fn install_panic_hook_once() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            if panic_is_contained() {
                tracing::error!(target: "dualstream::terminal", panic = %panic_info, "task panicked");
                return;
            }
            let _ = restore();
            original_hook(panic_info);
        }));
    });
}

/// True while the current thread is polling a [`PanicContained`] future.
pub fn panic_is_contained() -> bool {
    CONTAINED_DEPTH.with(Cell::get) > 0
}

/// Marks a spawned future whose panics end up in its `JoinHandle` rather
/// than tearing down the process.
pub struct PanicContained<F> {
    inner: Pin<Box<F>>,
}

pub fn contain_panics<F: Future>(future: F) -> PanicContained<F> {
    PanicContained {
        inner: Box::pin(future),
    }
}

impl<F: Future> Future for PanicContained<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = ContainedScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

struct ContainedScope;

impl ContainedScope {
    fn enter() -> Self {
        CONTAINED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        ContainedScope
    }
}

impl Drop for ContainedScope {
    fn drop(&mut self) {
        CONTAINED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub fn setup() -> anyhow::Result<TerminalType> {
    install_panic_hook_once();

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, Hide)?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore() -> anyhow::Result<()> {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    Ok(())
}

/// Owns the terminal while the TUI runs; restores it on drop.
pub struct TerminalSession {
    terminal: TerminalType,
}

impl TerminalSession {
    pub fn enter() -> anyhow::Result<Self> {
        let terminal = setup()?;
        drain_pending_events();
        tracing::debug!(target: "dualstream::terminal", "terminal entered raw mode");
        Ok(Self { terminal })
    }

    pub fn terminal(&mut self) -> &mut TerminalType {
        &mut self.terminal
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = restore();
        tracing::debug!(target: "dualstream::terminal", "terminal restored");
    }
}

/// Discard input that arrived before the TUI started.
fn drain_pending_events() {
    for _ in 0..1024 {
        match event::poll(Duration::from_millis(0)) {
            Ok(true) => {
                if event::read().is_err() {
                    break;
                }
            }
            Ok(false) | Err(_) => break,
        }
    }
}
