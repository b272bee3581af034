//! Snapshot ("golden") files: captured processor responses stored as
//! expectations and replayed as the expected baseline.

pub mod convert;
pub mod memory;
pub mod store;

pub use convert::*;
pub use memory::*;
pub use store::*;
