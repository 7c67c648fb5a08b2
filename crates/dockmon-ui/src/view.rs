use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use unicode_width::UnicodeWidthChar;

use crate::keys::{KeyBinding, KeyInput};

/// A closure invoked when the bound key is pressed on a focused view
pub type KeyHandler = Box<dyn FnMut(KeyInput) + Send>;

/// Shared redraw-request flag handed to views by the application.
///
/// Views signal through the handle instead of holding a reference to their
/// parent; the application is the sole consumer and triggers the render
/// pass when the flag is set. The handle is cheap to clone and safe to
/// trigger from background threads.
#[derive(Clone, Default)]
pub struct RedrawHandle(Arc<AtomicBool>);

impl RedrawHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a redraw on the next render pass
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the pending request, if any
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// State common to every view: geometry, visibility, focus, the dirty
/// flag and the per-key handler table.
pub struct ViewBase {
    rect: Rect,
    visible: bool,
    focusable: bool,
    focused: bool,
    dirty: bool,
    handlers: HashMap<KeyBinding, KeyHandler>,
    redraw: Option<RedrawHandle>,
}

impl ViewBase {
    pub fn new() -> Self {
        Self {
            rect: Rect::default(),
            visible: true,
            focusable: true,
            focused: false,
            dirty: true,
            handlers: HashMap::new(),
            redraw: None,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
        self.mark_dirty();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.mark_dirty();
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn set_focusable(&mut self, focusable: bool) {
        self.focusable = focusable;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.mark_dirty();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Flag the view for redraw and propagate the request upward
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        if let Some(redraw) = &self.redraw {
            redraw.request();
        }
    }

    pub fn set_redraw_notifier(&mut self, handle: RedrawHandle) {
        self.redraw = Some(handle);
    }

    pub fn redraw_notifier(&self) -> Option<RedrawHandle> {
        self.redraw.clone()
    }

    pub fn add_key_handler(&mut self, key: KeyBinding, handler: KeyHandler) {
        self.handlers.insert(key, handler);
    }

    /// Invoke the handler registered for this exact key, if any.
    /// Unrecognized keys are silently ignored.
    pub fn dispatch(&mut self, key: KeyInput) {
        if let Some(handler) = self.handlers.get_mut(&KeyBinding::from_event(&key)) {
            handler(key);
        }
    }
}

impl Default for ViewBase {
    fn default() -> Self {
        Self::new()
    }
}

/// The capability set every UI element implements.
///
/// Components embed a [`ViewBase`] and get the bookkeeping operations for
/// free; they override `draw` and, where they intercept keys or decorate a
/// child, `handle_input` and the focus/geometry setters. None of these
/// calls draw synchronously; drawing happens only from the render pass.
pub trait View: Send {
    fn base(&self) -> &ViewBase;
    fn base_mut(&mut self) -> &mut ViewBase;

    /// Paint the view into the frame buffer at its assigned rectangle
    fn draw(&mut self, buf: &mut Buffer);

    fn rect(&self) -> Rect {
        self.base().rect()
    }

    fn set_rect(&mut self, rect: Rect) {
        self.base_mut().set_rect(rect);
    }

    fn is_visible(&self) -> bool {
        self.base().is_visible()
    }

    fn set_visible(&mut self, visible: bool) {
        self.base_mut().set_visible(visible);
    }

    fn is_focusable(&self) -> bool {
        self.base().is_focusable()
    }

    fn set_focusable(&mut self, focusable: bool) {
        self.base_mut().set_focusable(focusable);
    }

    fn is_focused(&self) -> bool {
        self.base().is_focused()
    }

    fn set_focused(&mut self, focused: bool) {
        self.base_mut().set_focused(focused);
    }

    fn is_dirty(&self) -> bool {
        self.base().is_dirty()
    }

    fn clear_dirty(&mut self) {
        self.base_mut().clear_dirty();
    }

    fn set_redraw_notifier(&mut self, handle: RedrawHandle) {
        self.base_mut().set_redraw_notifier(handle);
    }

    fn add_key_handler(&mut self, key: KeyBinding, handler: KeyHandler) {
        self.base_mut().add_key_handler(key, handler);
    }

    fn handle_input(&mut self, key: KeyInput) {
        self.base_mut().dispatch(key);
    }
}

/// Pad or truncate `text` to exactly `width` display columns
pub fn fill(text: &str, width: u16) -> String {
    let width = width as usize;
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    while used < width {
        out.push(' ');
        used += 1;
    }
    out
}
