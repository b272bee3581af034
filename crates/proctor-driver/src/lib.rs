//! Drives one processor stream per test case.
//!
//! `Driver` turns an `HttpRequestSpec` into the ordered request-phase
//! messages, collects one response per message and stops early on an
//! immediate response. Transports plug in through `ProcessorTransport`.

pub mod cancel;
pub mod driver;
pub mod scripted;
pub mod transport;

pub use cancel::*;
pub use driver::*;
pub use scripted::*;
pub use transport::*;
