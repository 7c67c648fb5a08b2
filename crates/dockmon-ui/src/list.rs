use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossterm::event::KeyCode;
use parking_lot::{Mutex, RwLock};
use ratatui::buffer::Buffer;

use crate::keys::KeyInput;
use crate::theme::Theme;
use crate::view::{fill, RedrawHandle, View, ViewBase};

/// One renderable row of a list
pub trait ListItem: Send + Sync {
    /// Single-line string representation, truncated by the list on draw
    fn text(&self) -> String;

    /// Access to the underlying value for key handlers
    fn as_any(&self) -> &dyn Any;
}

/// Callback handle invoked after a model update changed the visible sequence
pub type ModelListener = Arc<dyn Fn() + Send + Sync>;

/// Data-binding contract decoupling a renderable list from its data source.
///
/// Implementations are shared between the UI thread and background pollers,
/// so all methods take `&self` and snapshots live behind interior
/// mutability. Listeners must be notified exactly once per completed
/// update, never mid-update.
pub trait ListModel: Send + Sync {
    fn len(&self) -> usize;

    fn item(&self, index: usize) -> Option<Arc<dyn ListItem>>;

    /// Open-ended named property, e.g. toggling an "only running" filter
    fn set_property(&self, _key: &str, _value: Option<&str>) {}

    /// Force a refresh from the backing source
    fn update(&self) {}

    fn subscribe(&self, _listener: ModelListener) {}
}

/// Default model bound to a list before a real one is set
pub struct EmptyModel;

impl ListModel for EmptyModel {
    fn len(&self) -> usize {
        0
    }

    fn item(&self, _index: usize) -> Option<Arc<dyn ListItem>> {
        None
    }
}

/// Listener bookkeeping shared by model implementations
#[derive(Default)]
pub struct ModelListeners {
    listeners: RwLock<Vec<ModelListener>>,
}

impl ModelListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: ModelListener) {
        self.listeners.write().push(listener);
    }

    /// Invoke every listener once, in registration order
    pub fn notify(&self) {
        for listener in self.listeners.read().iter() {
            listener();
        }
    }
}

/// Cloneable handle onto a list's current selection, for key handlers
#[derive(Clone)]
pub struct ListSelection {
    index: Arc<AtomicUsize>,
    model: Arc<dyn ListModel>,
}

impl ListSelection {
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// The currently selected item, if the model is non-empty
    pub fn item(&self) -> Option<Arc<dyn ListItem>> {
        let count = self.model.len();
        if count == 0 {
            return None;
        }
        self.model.item(self.index().min(count - 1))
    }
}

// Cross-thread notification state: the model listener runs on a poller
// thread while the redraw handle is only attached once the list joins the
// application tree.
struct ListNotify {
    model_changed: AtomicBool,
    redraw: Mutex<Option<RedrawHandle>>,
}

/// A model-bound, scrollable, selectable list view
pub struct List {
    base: ViewBase,
    model: Arc<dyn ListModel>,
    start_index: usize,
    selected: Arc<AtomicUsize>,
    notify: Arc<ListNotify>,
}

impl List {
    pub fn new() -> Self {
        Self {
            base: ViewBase::new(),
            model: Arc::new(EmptyModel),
            start_index: 0,
            selected: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(ListNotify {
                model_changed: AtomicBool::new(false),
                redraw: Mutex::new(None),
            }),
        }
    }

    /// Bind a model and subscribe to its change notifications
    pub fn set_model(&mut self, model: Arc<dyn ListModel>) {
        let notify = Arc::clone(&self.notify);
        model.subscribe(Arc::new(move || {
            notify.model_changed.store(true, Ordering::Release);
            if let Some(redraw) = notify.redraw.lock().as_ref() {
                redraw.request();
            }
        }));
        self.model = model;
        self.base.mark_dirty();
    }

    pub fn model(&self) -> Arc<dyn ListModel> {
        Arc::clone(&self.model)
    }

    /// Shared handle onto the selection, usable from key-handler closures
    pub fn selection(&self) -> ListSelection {
        ListSelection {
            index: Arc::clone(&self.selected),
            model: Arc::clone(&self.model),
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected.load(Ordering::Acquire)
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    fn visible_rows(&self) -> usize {
        self.base.rect().height as usize
    }

    /// Move the selection down one row. The window only advances once the
    /// cursor reaches its bottom edge (no overscroll).
    pub fn scroll_forward(&mut self) {
        let count = self.model.len();
        let selected = self.selected_index();
        if count == 0 || selected + 1 >= count {
            return;
        }
        let selected = selected + 1;
        self.selected.store(selected, Ordering::Release);

        let rows = self.visible_rows();
        if rows > 0 && selected >= self.start_index + rows {
            self.start_index = selected + 1 - rows;
        }
        self.base.mark_dirty();
    }

    /// Move the selection up one row, dragging the window down with it
    pub fn scroll_back(&mut self) {
        let selected = self.selected_index();
        if selected > 0 {
            self.selected.store(selected - 1, Ordering::Release);
        }
        let selected = self.selected_index();
        if self.start_index > selected {
            self.start_index = selected;
        }
        self.base.mark_dirty();
    }

    /// Re-clamp selection and window after the model changed size
    fn sync_with_model(&mut self) {
        let count = self.model.len();
        let mut selected = self.selected_index();
        if count == 0 {
            selected = 0;
        } else if selected >= count {
            selected = count - 1;
        }
        self.selected.store(selected, Ordering::Release);

        let rows = self.visible_rows();
        if rows > 0 && selected >= self.start_index + rows {
            self.start_index = selected + 1 - rows;
        }
        if self.start_index > selected {
            self.start_index = selected;
        }
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl View for List {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn set_redraw_notifier(&mut self, handle: RedrawHandle) {
        *self.notify.redraw.lock() = Some(handle.clone());
        self.base.set_redraw_notifier(handle);
    }

    fn is_dirty(&self) -> bool {
        self.base.is_dirty() || self.notify.model_changed.load(Ordering::Acquire)
    }

    fn handle_input(&mut self, key: KeyInput) {
        // Arrow keys are intercepted before the generic handler table
        match key.code {
            KeyCode::Down => self.scroll_forward(),
            KeyCode::Up => self.scroll_back(),
            _ => self.base.dispatch(key),
        }
    }

    fn draw(&mut self, buf: &mut Buffer) {
        let rect = self.base.rect();
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        self.notify.model_changed.store(false, Ordering::Release);
        self.sync_with_model();

        let count = self.model.len();
        let selected = self.selected_index();
        let focused = self.base.is_focused();

        for row in 0..rect.height as usize {
            let index = self.start_index + row;
            let y = rect.y + row as u16;
            // Rows past the end are blank-filled to erase stale content
            let (text, style) = if index < count {
                let text = self
                    .model
                    .item(index)
                    .map(|item| item.text())
                    .unwrap_or_default();
                let style = if focused && index == selected {
                    Theme::list_item_selected()
                } else {
                    Theme::list_item()
                };
                (text, style)
            } else {
                (String::new(), Theme::list_item())
            };
            buf.set_string(rect.x, y, fill(&text, rect.width), style);
        }
    }
}
