use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use crate::keys::{KeyBinding, KeyInput};
use crate::theme::Theme;
use crate::view::{fill, KeyHandler, RedrawHandle, View, ViewBase};

const TOP_LEFT: &str = "\u{250C}";
const TOP_RIGHT: &str = "\u{2510}";
const BOTTOM_LEFT: &str = "\u{2514}";
const BOTTOM_RIGHT: &str = "\u{2518}";
const HORIZONTAL: &str = "\u{2500}";
const VERTICAL: &str = "\u{2502}";

/// Border decoration drawn around a titled container's child.
///
/// Each variant is a pure function of the title and the outer rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderStyle {
    /// No decoration beyond the reserved title row
    None,
    /// Reverse-video title bar across the top
    #[default]
    Header,
    /// Title bar plus filled side and bottom rules
    Full,
    /// Box-drawing border with the title inset into the top rule
    Line,
}

/// Rectangle left for the child after the border's insets: one row is
/// always reserved for the title bar, plus one cell per bordered side.
pub fn inner_rect(rect: Rect, border: BorderStyle) -> Rect {
    match border {
        BorderStyle::None | BorderStyle::Header => Rect {
            x: rect.x,
            y: rect.y.saturating_add(1),
            width: rect.width,
            height: rect.height.saturating_sub(1),
        },
        BorderStyle::Full | BorderStyle::Line => Rect {
            x: rect.x.saturating_add(1),
            y: rect.y.saturating_add(1),
            width: rect.width.saturating_sub(2),
            height: rect.height.saturating_sub(2),
        },
    }
}

/// Decorates a single child view with a title bar and optional border,
/// forwarding focus and input to the child verbatim.
pub struct TitledContainer {
    base: ViewBase,
    title: String,
    child: Box<dyn View>,
    border: BorderStyle,
}

impl TitledContainer {
    pub fn new(title: impl Into<String>, child: Box<dyn View>, border: BorderStyle) -> Self {
        Self {
            base: ViewBase::new(),
            title: title.into(),
            child,
            border,
        }
    }

    pub fn border(&self) -> BorderStyle {
        self.border
    }

    pub fn child(&self) -> &dyn View {
        self.child.as_ref()
    }

    fn draw_border(&self, buf: &mut Buffer) {
        let rect = self.base.rect();
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let bar_style = if self.child.is_focused() {
            Theme::title_bar_focused()
        } else {
            Theme::title_bar()
        };

        match self.border {
            BorderStyle::None => {}
            BorderStyle::Header => {
                buf.set_string(rect.x, rect.y, fill(&self.title, rect.width), bar_style);
            }
            BorderStyle::Full => {
                buf.set_string(rect.x, rect.y, fill(&self.title, rect.width), bar_style);
                let bottom = rect.y + rect.height - 1;
                buf.set_string(rect.x, bottom, fill("", rect.width), bar_style);
                for y in rect.y + 1..bottom {
                    buf.set_string(rect.x, y, " ", bar_style);
                    buf.set_string(rect.x + rect.width - 1, y, " ", bar_style);
                }
            }
            BorderStyle::Line => {
                if rect.width < 2 || rect.height < 2 {
                    return;
                }
                let style = if self.child.is_focused() {
                    Theme::border_focused()
                } else {
                    Theme::border()
                };
                let inner = rect.width as usize - 2;
                let title: String = self.title.chars().take(inner).collect();
                let top = format!(
                    "{}{}{}{}",
                    TOP_LEFT,
                    title,
                    HORIZONTAL.repeat(inner - title.chars().count()),
                    TOP_RIGHT
                );
                let bottom_row = rect.y + rect.height - 1;
                let bottom = format!(
                    "{}{}{}",
                    BOTTOM_LEFT,
                    HORIZONTAL.repeat(inner),
                    BOTTOM_RIGHT
                );
                buf.set_string(rect.x, rect.y, top, style);
                buf.set_string(rect.x, bottom_row, bottom, style);
                for y in rect.y + 1..bottom_row {
                    buf.set_string(rect.x, y, VERTICAL, style);
                    buf.set_string(rect.x + rect.width - 1, y, VERTICAL, style);
                }
            }
        }
    }
}

impl View for TitledContainer {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn set_rect(&mut self, rect: Rect) {
        self.base.set_rect(rect);
        self.child.set_rect(inner_rect(rect, self.border));
    }

    // Focus, focusability and input belong to the child; the container
    // itself is never the focus target.
    fn is_focusable(&self) -> bool {
        self.child.is_focusable()
    }

    fn set_focusable(&mut self, focusable: bool) {
        self.child.set_focusable(focusable);
    }

    fn is_focused(&self) -> bool {
        self.child.is_focused()
    }

    fn set_focused(&mut self, focused: bool) {
        self.base.mark_dirty();
        self.child.set_focused(focused);
    }

    fn handle_input(&mut self, key: KeyInput) {
        self.child.handle_input(key);
    }

    fn add_key_handler(&mut self, key: KeyBinding, handler: KeyHandler) {
        self.child.add_key_handler(key, handler);
    }

    fn set_redraw_notifier(&mut self, handle: RedrawHandle) {
        self.base.set_redraw_notifier(handle.clone());
        self.child.set_redraw_notifier(handle);
    }

    fn is_dirty(&self) -> bool {
        self.base.is_dirty() || self.child.is_dirty()
    }

    fn clear_dirty(&mut self) {
        self.base.clear_dirty();
        self.child.clear_dirty();
    }

    fn draw(&mut self, buf: &mut Buffer) {
        self.draw_border(buf);
        self.child.draw(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextView;

    #[test]
    fn test_inner_rect_insets() {
        let outer = Rect::new(2, 3, 20, 10);
        assert_eq!(
            inner_rect(outer, BorderStyle::Header),
            Rect::new(2, 4, 20, 9)
        );
        assert_eq!(inner_rect(outer, BorderStyle::None), Rect::new(2, 4, 20, 9));
        assert_eq!(inner_rect(outer, BorderStyle::Line), Rect::new(3, 4, 18, 8));
        assert_eq!(inner_rect(outer, BorderStyle::Full), Rect::new(3, 4, 18, 8));
    }

    #[test]
    fn test_inner_rect_saturates_on_tiny_outer() {
        let outer = Rect::new(0, 0, 1, 1);
        let inner = inner_rect(outer, BorderStyle::Line);
        assert_eq!((inner.width, inner.height), (0, 0));
    }

    #[test]
    fn test_set_rect_allocates_child_rect() {
        let child = TextView::new("hello");
        let mut container =
            TitledContainer::new("Title", Box::new(child), BorderStyle::Line);
        container.set_rect(Rect::new(0, 0, 10, 5));
        assert_eq!(container.child().rect(), Rect::new(1, 1, 8, 3));
    }

    #[test]
    fn test_focus_and_input_forwarded_to_child() {
        let child = TextView::new("a\nb\nc\nd\ne\nf");
        let mut container =
            TitledContainer::new("Title", Box::new(child), BorderStyle::Header);
        container.set_rect(Rect::new(0, 0, 10, 4));

        assert!(!container.is_focused());
        container.set_focused(true);
        assert!(container.is_focused());

        container.clear_dirty();
        container.handle_input(KeyInput::from(crossterm::event::KeyCode::Down));
        // The child TextView scrolled and marked itself dirty
        assert!(container.is_dirty());
    }

    #[test]
    fn test_line_border_title_inset() {
        let child = TextView::new("x");
        let mut container = TitledContainer::new("Logs", Box::new(child), BorderStyle::Line);
        container.set_rect(Rect::new(0, 0, 10, 3));
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 3));
        container.draw(&mut buf);

        assert_eq!(buf[(0, 0)].symbol(), TOP_LEFT);
        assert_eq!(buf[(1, 0)].symbol(), "L");
        assert_eq!(buf[(9, 0)].symbol(), TOP_RIGHT);
        assert_eq!(buf[(0, 2)].symbol(), BOTTOM_LEFT);
        assert_eq!(buf[(0, 1)].symbol(), VERTICAL);
    }
}
