//! Application screens and coordination

pub mod screen;

pub use screen::{AppCoordinator, MenuOption, Screen};
