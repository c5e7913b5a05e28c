use unicode_width::UnicodeWidthChar;

/// Break `text` into rows no wider than `width` display columns. Embedded
/// newlines start a new row; an empty input still yields one empty row.
pub fn wrap_display_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = vec![String::new()];
    let mut row_width = 0usize;
    for ch in text.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            rows.push(String::new());
            row_width = 0;
            continue;
        }
        if ch == '\t' {
            for _ in 0..4 {
                push_char(&mut rows, &mut row_width, ' ', 1, width);
            }
            continue;
        }
        push_char(&mut rows, &mut row_width, ch, char_display_width(ch), width);
    }
    rows
}

fn push_char(rows: &mut Vec<String>, row_width: &mut usize, ch: char, ch_width: usize, width: usize) {
    if *row_width + ch_width > width && *row_width > 0 {
        rows.push(String::new());
        *row_width = 0;
    }
    if let Some(row) = rows.last_mut() {
        row.push(ch);
    }
    *row_width += ch_width;
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width && used > 0 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Fit `text` into `width` columns, ending with `...` when something was cut.
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    let width = width.max(1);
    if display_width(text) <= width {
        return text.to_string();
    }
    if width < 4 {
        return truncate_to_display_width(text, width);
    }
    let mut out = truncate_to_display_width(text, width - 3);
    out.push_str("...");
    out
}

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}
