//! External-process invocation core for the Auggie CLI
//!
//! Layered bottom-up: [`command`] describes a run, [`runner`] executes it
//! under deadline and cancellation supervision, and [`invoke`] assembles the
//! review and custom-command argument shapes the server uses.

pub mod command;
pub mod invoke;
pub mod runner;

pub use command::CommandSpec;
pub use invoke::{
    command_spec, run_auggie, run_auggie_command, AuggieInvocation, RunOptions, BINARY_PATH_ENV,
    DEFAULT_BINARY, SESSION_AUTH_ENV,
};
pub use runner::{AuggieRunResult, TERMINATE_GRACE};
