use crossterm::event::KeyCode;
use ratatui::buffer::Buffer;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::keys::KeyInput;
use crate::theme::Theme;
use crate::view::{fill, View, ViewBase};

/// Paged, scrollable, read-only text view
pub struct TextView {
    base: ViewBase,
    lines: Vec<String>,
    xpos: usize,
    ypos: usize,
    max_width: usize,
}

impl TextView {
    pub fn new(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let max_width = lines.iter().map(|l| l.width()).max().unwrap_or(0);
        Self {
            base: ViewBase::new(),
            lines,
            xpos: 0,
            ypos: 0,
            max_width,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn ypos(&self) -> usize {
        self.ypos
    }

    pub fn xpos(&self) -> usize {
        self.xpos
    }

    fn viewport_height(&self) -> usize {
        self.base.rect().height as usize
    }

    fn viewport_width(&self) -> usize {
        self.base.rect().width as usize
    }

    /// Largest valid first-line offset for the current viewport
    fn max_ypos(&self) -> usize {
        self.lines.len().saturating_sub(self.viewport_height())
    }

    /// The visible window `[first, last]`, clamped so it never overruns the
    /// text: when the bottom would pass the end both edges shift up
    /// together, preserving the window height, down to line 0. The window
    /// always holds exactly `min(height, total)` lines.
    pub fn visible_window(&self) -> Option<(usize, usize)> {
        let height = self.viewport_height();
        let total = self.lines.len();
        if height == 0 || total == 0 {
            return None;
        }
        let last = (self.ypos + height - 1).min(total - 1);
        let first = (last + 1).saturating_sub(height);
        Some((first, last))
    }

    pub fn scroll_forward(&mut self) {
        if self.ypos < self.max_ypos() {
            self.ypos += 1;
            self.base.mark_dirty();
        }
    }

    pub fn scroll_back(&mut self) {
        if self.ypos > 0 {
            self.ypos -= 1;
            self.base.mark_dirty();
        }
    }

    pub fn scroll_left(&mut self) {
        if self.xpos > 0 {
            self.xpos -= 1;
            self.base.mark_dirty();
        }
    }

    pub fn scroll_right(&mut self) {
        if self.xpos + self.viewport_width() < self.max_width {
            self.xpos += 1;
            self.base.mark_dirty();
        }
    }

    /// Jump a full viewport height forward, clamped to the last window
    pub fn scroll_page_forward(&mut self) {
        self.ypos = (self.ypos + self.viewport_height()).min(self.max_ypos());
        self.base.mark_dirty();
    }

    pub fn scroll_page_back(&mut self) {
        self.ypos = self.ypos.saturating_sub(self.viewport_height());
        self.base.mark_dirty();
    }
}

impl View for TextView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn handle_input(&mut self, key: KeyInput) {
        match key.code {
            KeyCode::Down => self.scroll_forward(),
            KeyCode::Up => self.scroll_back(),
            KeyCode::Left => self.scroll_left(),
            KeyCode::Right => self.scroll_right(),
            KeyCode::PageDown => self.scroll_page_forward(),
            KeyCode::PageUp => self.scroll_page_back(),
            _ => self.base.dispatch(key),
        }
    }

    fn draw(&mut self, buf: &mut Buffer) {
        let rect = self.base.rect();
        if rect.width == 0 || rect.height == 0 {
            return;
        }

        let window = self.visible_window();
        for row in 0..rect.height as usize {
            let y = rect.y + row as u16;
            let text = match window {
                Some((first, last)) if first + row <= last => {
                    // Sliced from xpos columns in; blank when xpos is past
                    // the end of the line
                    slice_columns(&self.lines[first + row], self.xpos)
                }
                _ => String::new(),
            };
            buf.set_string(rect.x, y, fill(&text, rect.width), Theme::text());
        }
    }
}

/// The tail of `line` starting `xpos` display columns in. Horizontal
/// offsets are in columns, the same unit as `max_width`; a wide character
/// straddling the cut renders as a pad space for its visible half.
fn slice_columns(line: &str, xpos: usize) -> String {
    let mut out = String::new();
    let mut col = 0;
    for c in line.chars() {
        let w = c.width().unwrap_or(0);
        if col >= xpos {
            out.push(c);
        } else if col + w > xpos {
            out.push(' ');
        }
        col += w;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::layout::Rect;

    fn text_view(lines: usize, width: u16, height: u16) -> TextView {
        let text = (0..lines)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let mut view = TextView::new(&text);
        view.set_rect(Rect::new(0, 0, width, height));
        view
    }

    #[test]
    fn test_window_has_min_height_total_lines() {
        let view = text_view(100, 30, 10);
        let (first, last) = view.visible_window().unwrap();
        assert_eq!(last - first + 1, 10);
        assert!(last < 100);

        let short = text_view(4, 30, 10);
        let (first, last) = short.visible_window().unwrap();
        assert_eq!((first, last), (0, 3));
    }

    #[test]
    fn test_page_forward_clamps_at_end() {
        // 100 lines, viewport 10: paging from the top walks in full
        // viewport strides and pins at 90.
        let mut view = text_view(100, 30, 10);
        for expected in [10, 20, 30, 40, 50, 60, 70, 80, 90] {
            view.scroll_page_forward();
            assert_eq!(view.ypos(), expected);
        }
        view.scroll_page_forward();
        assert_eq!(view.ypos(), 90);
        let (first, last) = view.visible_window().unwrap();
        assert_eq!((first, last), (90, 99));
    }

    #[test]
    fn test_page_back_saturates_at_top() {
        let mut view = text_view(100, 30, 10);
        view.scroll_page_forward();
        view.scroll_page_back();
        view.scroll_page_back();
        assert_eq!(view.ypos(), 0);
    }

    #[test]
    fn test_line_scroll_stops_at_last_window() {
        let mut view = text_view(12, 30, 10);
        for _ in 0..20 {
            view.scroll_forward();
        }
        assert_eq!(view.ypos(), 2);
        for _ in 0..5 {
            view.scroll_back();
        }
        assert_eq!(view.ypos(), 0);
    }

    #[test]
    fn test_horizontal_slice_blank_past_line_end() {
        let mut view = TextView::new("ab\nabcdefgh");
        view.set_rect(Rect::new(0, 0, 4, 2));
        for _ in 0..4 {
            view.scroll_right();
        }
        assert_eq!(view.xpos(), 4);

        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 2));
        view.draw(&mut buf);
        // First line is shorter than xpos and renders blank
        assert_eq!(buf[(0, 0)].symbol(), " ");
        assert_eq!(buf[(0, 1)].symbol(), "e");
    }

    #[test]
    fn test_wide_lines_scroll_in_columns() {
        // Three CJK characters span six columns; the scroll clamp and the
        // rendered slice must agree on that unit.
        let mut view = TextView::new("\u{65E5}\u{672C}\u{8A9E}");
        view.set_rect(Rect::new(0, 0, 4, 1));
        view.scroll_right();
        view.scroll_right();
        assert_eq!(view.xpos(), 2);

        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 1));
        view.draw(&mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "\u{672C}");

        // max_width 6, viewport 4: offset 2 is already the last window
        view.scroll_right();
        assert_eq!(view.xpos(), 2);
    }

    #[test]
    fn test_slice_columns_pads_straddled_wide_char() {
        assert_eq!(slice_columns("\u{65E5}\u{672C}", 1), " \u{672C}");
        assert_eq!(slice_columns("abc", 1), "bc");
        assert_eq!(slice_columns("ab", 5), "");
    }

    #[test]
    fn test_empty_text_renders_blank() {
        let mut view = TextView::new("");
        view.set_rect(Rect::new(0, 0, 4, 2));
        assert!(view.visible_window().is_none());
        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 2));
        view.draw(&mut buf);
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }
}
