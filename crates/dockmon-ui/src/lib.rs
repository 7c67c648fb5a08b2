//! Terminal UI composition engine for dockmon
//!
//! This crate provides the retained view tree (geometry, focus, dirty
//! tracking, per-key handlers), the list/text components with their
//! scrolling semantics, the application shell with its modal popup and
//! focus cycle, and the terminal/input plumbing.

mod app;
mod event;
mod keys;
mod list;
mod terminal;
mod text;
mod theme;
mod titled;
mod view;

pub use app::Application;
pub use event::{Event, EventHandler};
pub use keys::{KeyBinding, KeyInput};
pub use list::{EmptyModel, List, ListItem, ListModel, ListSelection, ModelListener, ModelListeners};
pub use terminal::Tui;
pub use text::TextView;
pub use theme::Theme;
pub use titled::{inner_rect, BorderStyle, TitledContainer};
pub use view::{fill, KeyHandler, RedrawHandle, View, ViewBase};

// Geometry is ratatui's cell-based rectangle
pub use ratatui::layout::Rect;
