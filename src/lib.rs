//! Augment MCP: an MCP server front-end for the Augment Auggie CLI
//!
//! # Architecture
//!
//! - [`auggie`]: the external-process invocation core. Spawn, bidirectional
//!   pipe exchange, deadline and cancellation supervision, outcome
//!   classification. Everything else sits on top of it.
//! - [`server`]: the MCP surface. Tools, workspace and telemetry resources,
//!   prompt templates.
//! - [`workspace`]: `.augment/` settings and custom command discovery.
//! - [`search`]: workspace text search with an rg, grep, built-in fallback
//!   chain.
//! - [`telemetry`]: in-memory counters and run history.
//! - [`config`], [`cli`], [`doctor`]: configuration, argument parsing, and
//!   environment diagnostics.

pub mod auggie;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod errors;
pub mod search;
pub mod server;
pub mod telemetry;
pub mod workspace;

// Re-export commonly used types
pub use auggie::{
    run_auggie, run_auggie_command, AuggieInvocation, AuggieRunResult, CommandSpec, RunOptions,
};
pub use errors::{AuggieError, Result};
pub use server::AugmentService;
