//! Terminal UI: setup, teardown, and rendering

pub mod terminal;
pub mod ui;

pub use terminal::Tui;
pub use ui::render;
