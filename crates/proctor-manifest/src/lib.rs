//! YAML test manifests: discovery, parsing, formatting and pre-execution
//! validation.

pub mod format;
pub mod loader;
pub mod validate;

pub use format::*;
pub use loader::*;
pub use validate::*;
