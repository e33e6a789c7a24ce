//! Augment MCP server entry point

use anyhow::Result;
use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use augment_mcp::auggie::{run_auggie, AuggieInvocation, RunOptions};
use augment_mcp::cli::{Args, Commands};
use augment_mcp::config::ServerConfig;
use augment_mcp::doctor::{Doctor, HealthStatus};
use augment_mcp::server::AugmentService;
use augment_mcp::workspace;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load()?;
    if let Some(binary_path) = args.binary_path {
        config.binary_path = Some(binary_path);
    }
    init_tracing(&config);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Doctor => doctor(config).await,
        Commands::Review {
            instruction,
            workspace_root,
            model,
            compact,
            paths,
            timeout_ms,
        } => {
            review(
                config,
                instruction,
                workspace_root,
                model,
                compact,
                paths,
                timeout_ms,
            )
            .await
        }
    }
}

/// Logs go to stderr; stdout carries the MCP transport.
fn init_tracing(config: &ServerConfig) {
    let filter = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(config: ServerConfig) -> Result<()> {
    info!("starting Augment MCP server on stdio");
    let service = AugmentService::new(config).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

async fn doctor(config: ServerConfig) -> Result<()> {
    let checks = Doctor::new(config).run_diagnostics().await;

    let mut failed = false;
    for check in &checks {
        match &check.status {
            HealthStatus::Pass => println!("[pass] {}", check.name),
            HealthStatus::Warn(message) => println!("[warn] {}: {message}", check.name),
            HealthStatus::Fail(message) => {
                failed = true;
                println!("[fail] {}: {message}", check.name);
            }
        }
    }

    if failed {
        anyhow::bail!("doctor found failing checks");
    }
    Ok(())
}

async fn review(
    config: ServerConfig,
    instruction: String,
    workspace_root: Option<String>,
    model: Option<String>,
    compact: bool,
    paths: Vec<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let context = if paths.is_empty() {
        None
    } else {
        Some(workspace::load_paths(&paths)?)
    };

    let options = RunOptions::default()
        .with_timeout_ms(config.resolved_timeout_ms(timeout_ms))
        .with_session_token(config.resolved_session_token(None))
        .with_binary_path(config.resolved_binary(None));
    let invocation = AuggieInvocation::new(instruction)
        .with_input_text(context)
        .with_workspace_root(workspace_root)
        .with_model(model)
        .with_compact(compact)
        .with_options(options);

    let result = run_auggie(invocation).await?;
    if !result.stderr.trim().is_empty() {
        eprintln!("{}", result.stderr.trim());
    }
    println!("{}", result.stdout.trim());
    Ok(())
}
