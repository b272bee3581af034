pub mod config;
pub mod error;
pub mod ids;
pub mod orchestrator;
pub mod result;
pub mod select;
pub mod sink;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use orchestrator::*;
pub use result::*;
pub use select::*;
pub use sink::*;
