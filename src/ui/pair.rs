use super::input::{ScrollAction, ScrollTarget};
use super::panel::{LinePanel, PanelLine, ScrollChanged};
use super::sync::ScrollSynchronizer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanelSide {
    Left,
    Right,
}

impl PanelSide {
    pub const BOTH: [PanelSide; 2] = [PanelSide::Left, PanelSide::Right];

    pub fn other(self) -> Self {
        match self {
            PanelSide::Left => PanelSide::Right,
            PanelSide::Right => PanelSide::Left,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PanelSide::Left => 0,
            PanelSide::Right => 1,
        }
    }
}

/// Which panel receives line-scroll keys. Exactly one panel has focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FocusState {
    focused: PanelSide,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            focused: PanelSide::Left,
        }
    }
}

impl FocusState {
    pub fn focused(self) -> PanelSide {
        self.focused
    }

    pub fn toggle(&mut self) {
        self.focused = self.focused.other();
    }
}

/// The two panels, their focus and the scroll mirror between them.
#[derive(Debug)]
pub struct DualPanels {
    panels: [LinePanel; 2],
    focus: FocusState,
    sync: ScrollSynchronizer,
    render_requested: bool,
}

impl DualPanels {
    pub fn new(left_title: impl Into<String>, right_title: impl Into<String>) -> Self {
        Self {
            panels: [LinePanel::new(left_title), LinePanel::new(right_title)],
            focus: FocusState::default(),
            sync: ScrollSynchronizer::new(),
            render_requested: true,
        }
    }

    pub fn panel(&self, side: PanelSide) -> &LinePanel {
        &self.panels[side.index()]
    }

    pub fn focus(&self) -> FocusState {
        self.focus
    }

    pub fn toggle_focus(&mut self) {
        self.focus.toggle();
        self.render_requested = true;
    }

    pub fn synchronizer(&self) -> &ScrollSynchronizer {
        &self.sync
    }

    pub fn append(&mut self, side: PanelSide, line: PanelLine) {
        let changed = self.panels[side.index()].append(line);
        self.scrolled(side, changed);
    }

    pub fn set_scroll_percent(&mut self, side: PanelSide, percent: f64) {
        let changed = self.panels[side.index()].set_scroll_percent(percent);
        self.scrolled(side, changed);
    }

    pub fn set_viewport(&mut self, side: PanelSide, width: usize, height: usize) {
        self.panels[side.index()].set_viewport(width, height);
    }

    /// Resolve `target` against the current focus and apply `action` there.
    pub fn scroll(&mut self, target: ScrollTarget, action: ScrollAction) {
        let side = match target {
            ScrollTarget::Focused => self.focus.focused(),
            ScrollTarget::Primary => PanelSide::Left,
        };
        let panel = &mut self.panels[side.index()];
        let changed = match action {
            ScrollAction::LineUp => panel.scroll_by(-1),
            ScrollAction::LineDown => panel.scroll_by(1),
            ScrollAction::PageUp => panel.page_up(),
            ScrollAction::PageDown => panel.page_down(),
            ScrollAction::Top => panel.scroll_to_top(),
            ScrollAction::Bottom => panel.scroll_to_bottom(),
        };
        self.scrolled(side, changed);
    }

    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    /// Returns whether a redraw was requested since the last call.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    fn scrolled(&mut self, side: PanelSide, changed: ScrollChanged) {
        self.sync.on_scroll_changed(side, changed, &mut self.panels);
        self.render_requested = true;
    }
}
