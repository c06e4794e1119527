//! Stepchain REST API entry point.
//!
//! Binary name: `stepchain`
//!
//! Parses CLI arguments, wires the orchestrator against the remote workflow
//! service, and starts the REST API server.

mod http;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use http::router::build_router;
use state::AppState;

/// Sequential workflow-chain orchestration service.
#[derive(Debug, Parser)]
#[command(name = "stepchain", version)]
struct Cli {
    /// Address to bind the API server to.
    #[arg(long, env = "STEPCHAIN_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the API server to.
    #[arg(long, env = "STEPCHAIN_PORT", default_value_t = 8088)]
    port: u16,

    /// Base URL of the remote workflow-execution service (no trailing slash).
    #[arg(long, env = "STEPCHAIN_API_BASE")]
    api_base: String,

    /// Opaque end-user id attached to every workflow run.
    #[arg(long, env = "STEPCHAIN_USER", default_value = "stepchain")]
    user: String,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,stepchain=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let state = AppState::init(&cli.api_base, &cli.user);
    let router = build_router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = addr.as_str(), "stepchain API listening");

    axum::serve(listener, router).await?;
    Ok(())
}
