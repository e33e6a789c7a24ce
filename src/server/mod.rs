//! MCP server surface
//!
//! The service ties the invocation core to the protocol: tools run Auggie,
//! resources expose workspace configuration and telemetry, prompts return
//! fixed request templates.

pub mod prompts;
pub mod resources;
pub mod tools;

pub use tools::AugmentService;
