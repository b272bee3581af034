//! Unordered, partial-field comparison of expected outcomes against the
//! responses a processor actually produced.
//!
//! Everything here is pure: no I/O and no shared state.

pub mod compare;
pub mod format;
pub mod report;

pub use compare::compare;
pub use format::*;
pub use report::*;
