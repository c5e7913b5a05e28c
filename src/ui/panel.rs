use super::text::wrap_display_lines;

const DEFAULT_CONTENT_WIDTH: usize = 80;

/// Color class of a panel line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineTone {
    Plain,
    Heading,
    Success,
    Error,
    Notice,
    Muted,
}

/// One logical line appended by a consumer. May span several wrapped rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelLine {
    pub text: String,
    pub tone: LineTone,
}

impl PanelLine {
    pub fn new(text: impl Into<String>, tone: LineTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, LineTone::Plain)
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self::new(text, LineTone::Heading)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, LineTone::Success)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, LineTone::Error)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(text, LineTone::Notice)
    }

    pub fn muted(text: impl Into<String>) -> Self {
        Self::new(text, LineTone::Muted)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedRow {
    pub text: String,
    pub tone: LineTone,
}

/// Raised by every scroll-position write. The owner of the panel pair decides
/// whether it propagates.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollChanged {
    pub percent: f64,
}

/// Append-only scrollable text region. The scroll percentage is the source of
/// truth; the row offset is derived from it and the current viewport.
#[derive(Clone, Debug)]
pub struct LinePanel {
    title: String,
    lines: Vec<PanelLine>,
    rows: Vec<WrappedRow>,
    scroll_percent: f64,
    content_width: usize,
    viewport_height: usize,
}

impl LinePanel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
            rows: Vec::new(),
            scroll_percent: 100.0,
            content_width: DEFAULT_CONTENT_WIDTH,
            viewport_height: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[PanelLine] {
        &self.lines
    }

    pub fn rows(&self) -> &[WrappedRow] {
        &self.rows
    }

    pub fn scroll_percent(&self) -> f64 {
        self.scroll_percent
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn append(&mut self, line: PanelLine) -> ScrollChanged {
        push_rows(&mut self.rows, &line, self.content_width);
        self.lines.push(line);
        self.scroll_to_bottom()
    }

    pub fn set_scroll_percent(&mut self, percent: f64) -> ScrollChanged {
        self.scroll_percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        ScrollChanged {
            percent: self.scroll_percent,
        }
    }

    pub fn scroll_by(&mut self, delta_lines: isize) -> ScrollChanged {
        let max_offset = self.max_offset();
        if max_offset == 0 {
            return self.set_scroll_percent(self.scroll_percent);
        }
        let offset = self.scroll_offset() as isize;
        let target = offset.saturating_add(delta_lines).clamp(0, max_offset as isize);
        self.set_scroll_percent(target as f64 * 100.0 / max_offset as f64)
    }

    pub fn page_up(&mut self) -> ScrollChanged {
        self.scroll_by(-(self.page_size() as isize))
    }

    pub fn page_down(&mut self) -> ScrollChanged {
        self.scroll_by(self.page_size() as isize)
    }

    pub fn scroll_to_top(&mut self) -> ScrollChanged {
        self.set_scroll_percent(0.0)
    }

    pub fn scroll_to_bottom(&mut self) -> ScrollChanged {
        self.set_scroll_percent(100.0)
    }

    /// Resize to the drawable area. Content is re-wrapped when the width
    /// changes; the scroll percentage is kept.
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        if width != self.content_width {
            self.content_width = width;
            self.rows.clear();
            for line in &self.lines {
                push_rows(&mut self.rows, line, width);
            }
        }
        self.viewport_height = height;
    }

    pub fn max_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.viewport_height)
    }

    pub fn scroll_offset(&self) -> usize {
        let max_offset = self.max_offset();
        let offset = (self.scroll_percent / 100.0 * max_offset as f64).round() as usize;
        offset.min(max_offset)
    }

    pub fn visible_rows(&self) -> &[WrappedRow] {
        let start = self.scroll_offset();
        let end = start.saturating_add(self.viewport_height).min(self.rows.len());
        &self.rows[start..end]
    }

    fn page_size(&self) -> usize {
        self.viewport_height.max(1)
    }
}

fn push_rows(rows: &mut Vec<WrappedRow>, line: &PanelLine, width: usize) {
    rows.extend(
        wrap_display_lines(&line.text, width)
            .into_iter()
            .map(|text| WrappedRow {
                text,
                tone: line.tone,
            }),
    );
}
