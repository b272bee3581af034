#![forbid(unsafe_code)]

//! Shared data model for proctor: processing phases, the abstract HTTP request
//! a test drives, the processor protocol messages, and declarative
//! expectations.

pub mod expectation;
pub mod phase;
pub mod protocol;
pub mod request;
pub mod testcase;
pub mod text;

pub use expectation::*;
pub use phase::*;
pub use protocol::*;
pub use request::*;
pub use testcase::*;
