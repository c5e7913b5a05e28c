use super::{App, LEFT_TITLE, RIGHT_TITLE};
use crate::ui::{PanelLine, PanelSide};
use anyhow::Result;
use std::io::Write;

impl App {
    /// Print every panel line to stdout until both consumers settle.
    pub(super) async fn run_headless(&mut self) -> Result<()> {
        tracing::info!(target: "dualstream::app", "stdout is not a terminal; running headless");
        while !self.settled {
            tokio::select! {
                update = self.update_rx.recv() => {
                    let Some(update) = update else { break };
                    let mut stdout = std::io::stdout().lock();
                    for (side, line) in self.apply_update(update) {
                        for row in headless_rows(side, &line) {
                            writeln!(stdout, "{row}")?;
                        }
                    }
                    stdout.flush()?;
                }
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                    break;
                }
            }
        }
        Ok(())
    }
}

/// `line` as printed in headless mode: one row per text line, each prefixed
/// with the panel title.
pub(super) fn headless_rows(side: PanelSide, line: &PanelLine) -> Vec<String> {
    let title = match side {
        PanelSide::Left => LEFT_TITLE,
        PanelSide::Right => RIGHT_TITLE,
    };
    if line.text.is_empty() {
        return vec![format!("[{title}]")];
    }
    line.text
        .lines()
        .map(|row| format!("[{title}] {row}"))
        .collect()
}
