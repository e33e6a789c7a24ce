//! Command-line argument definitions

use clap::{Parser, Subcommand};

/// Augment MCP server command line
#[derive(Parser, Debug)]
#[command(
    name = "augment-mcp",
    version,
    about = "MCP server that delegates reviews to the Augment Auggie CLI"
)]
pub struct Args {
    /// Override the Auggie binary path for this process
    #[arg(long, global = true)]
    pub binary_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP over stdio (the default when no subcommand is given)
    Serve,

    /// Run environment diagnostics
    Doctor,

    /// Run a one-shot review and print the result
    Review {
        /// Instruction for Auggie to follow
        instruction: String,

        /// Workspace the review runs against
        #[arg(long)]
        workspace_root: Option<String>,

        /// Model passed through to Auggie
        #[arg(long)]
        model: Option<String>,

        /// Request compact output
        #[arg(long)]
        compact: bool,

        /// File loaded as context; may be repeated
        #[arg(long = "path")]
        paths: Vec<String>,

        /// Deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no_subcommand() {
        let args = Args::parse_from(["augment-mcp"]);
        assert!(args.command.is_none());
        assert!(args.binary_path.is_none());
    }

    #[test]
    fn test_review_arguments() {
        let args = Args::parse_from([
            "augment-mcp",
            "review",
            "check this",
            "--path",
            "src/a.rs",
            "--path",
            "src/b.rs",
            "--timeout-ms",
            "5000",
        ]);
        match args.command {
            Some(Commands::Review {
                instruction,
                paths,
                timeout_ms,
                compact,
                ..
            }) => {
                assert_eq!(instruction, "check this");
                assert_eq!(paths, vec!["src/a.rs", "src/b.rs"]);
                assert_eq!(timeout_ms, Some(5000));
                assert!(!compact);
            }
            other => panic!("expected review command, got {other:?}"),
        }
    }
}
