//! gRPC transport speaking Envoy's `ext_proc.v3` external processor protocol
//! over TCP, TLS or a Unix-domain socket.

pub mod client;
pub mod convert;
pub mod target;

pub use client::*;
pub use target::*;
