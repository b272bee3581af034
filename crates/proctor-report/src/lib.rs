//! Renderers for run progress: a terminal-friendly `HumanReporter` and a
//! machine-readable `JsonReporter`.

pub mod human;
pub mod json;
mod writer;

pub use human::*;
pub use json::*;
pub use writer::SharedBuffer;
