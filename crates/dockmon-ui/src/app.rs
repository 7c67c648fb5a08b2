use crossterm::event::KeyCode;
use ratatui::buffer::Buffer;

use crate::keys::KeyInput;
use crate::view::{RedrawHandle, View};

/// The application shell: owns the top-level view sequence (insertion
/// order is the tab-cycle order), the focus cycle, an optional modal
/// popup, and the running flag.
///
/// While a popup is set it exclusively receives input; the background
/// tree keeps rendering underneath and the popup is painted on top.
pub struct Application {
    views: Vec<Box<dyn View>>,
    current: usize,
    popup: Option<Box<dyn View>>,
    running: bool,
    redraw: RedrawHandle,
}

impl Application {
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            current: 0,
            popup: None,
            running: true,
            redraw: RedrawHandle::new(),
        }
    }

    /// Append a top-level view. The first added view becomes focused, and
    /// the application registers itself as the view's redraw listener.
    pub fn add(&mut self, mut view: Box<dyn View>) {
        view.set_redraw_notifier(self.redraw.clone());
        if self.views.is_empty() {
            view.set_focused(true);
        }
        self.views.push(view);
        self.redraw.request();
    }

    pub fn show_popup(&mut self, mut view: Box<dyn View>) {
        view.set_redraw_notifier(self.redraw.clone());
        self.popup = Some(view);
        self.redraw.request();
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
        self.redraw.request();
    }

    pub fn has_popup(&self) -> bool {
        self.popup.is_some()
    }

    /// Move focus to the next focusable top-level view, wrapping to the
    /// first after the last.
    pub fn cycle_focus(&mut self) {
        if self.views.is_empty() {
            return;
        }
        self.views[self.current].set_focused(false);
        let len = self.views.len();
        for step in 1..=len {
            let next = (self.current + step) % len;
            if self.views[next].is_focusable() {
                self.current = next;
                break;
            }
        }
        // With no focusable view the cursor stays put and nothing is focused
        if self.views[self.current].is_focusable() {
            self.views[self.current].set_focused(true);
        }
    }

    pub fn focused_index(&self) -> usize {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Dispatch one key event: the cancel key closes an open popup or
    /// stops the loop, the switch-focus key cycles, everything else goes
    /// to the popup if present, else the focused view.
    pub fn handle_key(&mut self, key: KeyInput) {
        match key.code {
            KeyCode::Esc => {
                if self.popup.is_some() {
                    self.close_popup();
                } else {
                    self.stop();
                }
            }
            KeyCode::Tab => self.cycle_focus(),
            _ => {
                if let Some(popup) = self.popup.as_mut() {
                    popup.handle_input(key);
                } else if let Some(view) = self.views.get_mut(self.current) {
                    view.handle_input(key);
                }
            }
        }
    }

    /// True when any view requested a redraw since the last render pass
    pub fn needs_redraw(&self) -> bool {
        self.redraw.take()
            || self.views.iter().any(|v| v.is_dirty())
            || self.popup.as_ref().is_some_and(|p| p.is_dirty())
    }

    /// Full redraw pass: every visible top-level view in order, then the
    /// popup overlaid on top.
    pub fn render(&mut self, buf: &mut Buffer) {
        for view in &mut self.views {
            if view.is_visible() {
                view.draw(buf);
            }
            view.clear_dirty();
        }
        if let Some(popup) = self.popup.as_mut() {
            popup.draw(buf);
            popup.clear_dirty();
        }
        // Drop requests raised while drawing
        self.redraw.take();
    }

    pub fn views_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn View>> {
        self.views.iter_mut()
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextView;
    use crossterm::event::KeyEvent;
    use ratatui::layout::Rect;

    fn key(code: KeyCode) -> KeyInput {
        KeyEvent::from(code)
    }

    fn app_with_two_views() -> Application {
        let mut app = Application::new();
        app.add(Box::new(TextView::new("one")));
        app.add(Box::new(TextView::new("two")));
        app
    }

    #[test]
    fn test_first_added_view_is_focused() {
        let mut app = Application::new();
        app.add(Box::new(TextView::new("one")));
        app.add(Box::new(TextView::new("two")));
        assert_eq!(app.focused_index(), 0);
    }

    #[test]
    fn test_cycle_wraps_in_insertion_order() {
        let mut app = app_with_two_views();
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focused_index(), 1);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focused_index(), 0);
    }

    #[test]
    fn test_cycle_skips_unfocusable_views() {
        let mut app = Application::new();
        app.add(Box::new(TextView::new("one")));
        let mut second = TextView::new("two");
        second.set_focusable(false);
        app.add(Box::new(second));
        app.add(Box::new(TextView::new("three")));

        app.cycle_focus();
        assert_eq!(app.focused_index(), 2);
    }

    #[test]
    fn test_cycle_with_no_focusable_views_focuses_nothing() {
        let mut app = app_with_two_views();
        for view in app.views_mut() {
            view.set_focusable(false);
            view.set_focused(false);
        }

        app.cycle_focus();
        assert!(app.views_mut().all(|v| !v.is_focused()));
    }

    #[test]
    fn test_cancel_closes_popup_before_stopping() {
        let mut app = app_with_two_views();
        app.show_popup(Box::new(TextView::new("popup")));
        assert!(app.has_popup());

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.has_popup());
        assert!(app.is_running());

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.is_running());
    }

    #[test]
    fn test_popup_receives_input_exclusively() {
        let mut app = Application::new();
        let mut list = TextView::new("a\nb\nc\nd\ne\nf\ng\nh");
        list.set_rect(Rect::new(0, 0, 5, 3));
        app.add(Box::new(list));

        let mut popup = TextView::new("p1\np2\np3\np4\np5\np6");
        popup.set_rect(Rect::new(1, 1, 3, 2));
        app.show_popup(Box::new(popup));

        let mut buf = Buffer::empty(Rect::new(0, 0, 5, 3));
        app.render(&mut buf);
        assert!(!app.needs_redraw());

        // Scroll goes to the popup, not the background view
        app.handle_key(key(KeyCode::Down));
        assert!(app.needs_redraw());
    }

    #[test]
    fn test_render_clears_dirty_state() {
        let mut app = app_with_two_views();
        for view in app.views_mut() {
            view.set_rect(Rect::new(0, 0, 10, 2));
        }
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 4));
        assert!(app.needs_redraw());
        app.render(&mut buf);
        assert!(!app.needs_redraw());
    }
}
