//! Tether demo host.
//!
//! Registers a demo command set and serves the bridge as JSON lines on
//! stdin/stdout. Logs go to stderr.

mod commands;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tether_core::{CommandBridge, CommandRegistry, LifecycleChange, TetherConfig};
use tokio::io::{BufReader, stdin, stdout};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use commands::DemoCommands;
use transport::LineTransport;

/// Tether demo - serves debug commands to a developer tool over stdio
#[derive(Parser, Debug)]
#[command(name = "tether-demo", author, version, about = "Serve demo debug commands over stdio")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name reported by getInfo and greet
    #[arg(long, default_value = "tether-demo")]
    app_name: String,

    /// Delay of the slowOp command in milliseconds
    #[arg(long, default_value_t = 2000)]
    slow_op_ms: u64,

    /// Print the command list and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => TetherConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TetherConfig::default(),
    };

    let registry = Arc::new(CommandRegistry::with_config(&config.registry));
    let bridge = CommandBridge::with_config(registry, &config.bridge);

    let host = Arc::new(DemoCommands::new(args.app_name, Duration::from_millis(args.slow_op_ms)));
    let warnings = bridge
        .on_host_lifecycle_change(&host, LifecycleChange::Added)
        .await
        .context("Failed to register demo commands")?;
    for warning in &warnings {
        warn!(%warning, "Command skipped");
    }

    let mut transport = LineTransport::new(&bridge, BufReader::new(stdin()), stdout());

    if args.list || config.bridge.announce_on_start {
        transport.announce().await?;
    }
    if args.list {
        return Ok(());
    }

    info!(commands = bridge.registry().count().await, "Serving commands on stdio");
    transport.serve().await?;

    let mut notices = bridge.notices();
    bridge.on_host_lifecycle_change(&host, LifecycleChange::Removed).await?;
    transport.flush_notices(&mut notices).await?;

    Ok(())
}
