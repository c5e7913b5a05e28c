use crate::ui::layout::split_dual_pane_layout;
use crate::ui::pair::{DualPanels, PanelSide};
use crate::ui::panel::{LinePanel, LineTone};
use crate::ui::text::truncate_with_ellipsis;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn tone_style(tone: LineTone) -> Style {
    match tone {
        LineTone::Plain => Style::default().fg(Color::White),
        LineTone::Heading => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        LineTone::Success => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        LineTone::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        LineTone::Notice => Style::default().fg(Color::Yellow),
        LineTone::Muted => Style::default().fg(Color::DarkGray),
    }
}

/// Draw both panels and the status row. Viewports are updated from the
/// frame size before drawing so scroll offsets match what is shown.
pub fn render_dual_panels(frame: &mut Frame<'_>, panels: &mut DualPanels, status: &str) {
    let layout = split_dual_pane_layout(frame.area());
    let focused = panels.focus().focused();

    for (side, area) in [(PanelSide::Left, layout.left), (PanelSide::Right, layout.right)] {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        panels.set_viewport(side, inner.width as usize, inner.height as usize);
        render_panel(frame, area, panels.panel(side), side == focused);
    }
    render_status_line(frame, layout.status, status);
}

pub fn render_panel(frame: &mut Frame<'_>, area: Rect, panel: &LinePanel, focused: bool) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let border_style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" {} ", panel.title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows: Vec<Line<'_>> = panel
        .visible_rows()
        .iter()
        .map(|row| Line::styled(row.text.as_str(), tone_style(row.tone)))
        .collect();
    frame.render_widget(Paragraph::new(rows), inner);
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_with_ellipsis(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
