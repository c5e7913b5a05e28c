use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DualPaneLayout {
    pub left: Rect,
    pub right: Rect,
    pub status: Rect,
}

/// Two half-width panes over a one-row status line.
pub fn split_dual_pane_layout(area: Rect) -> DualPaneLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    DualPaneLayout {
        left: panes[0],
        right: panes[1],
        status: rows[1],
    }
}
