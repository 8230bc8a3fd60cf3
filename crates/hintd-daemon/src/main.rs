//! hintd - power hint arbitration daemon.
//!
//! Loads a node configuration, synchronizes every `reset_on_init` node at
//! startup, then keeps arbitrating as leases are granted and lapse. The
//! apply side effect in this binary is a structured log line; embedders
//! link `hintd-core` and register a sink that writes to their actual
//! control surface.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hintd_core::{ArbiterConfig, CallbackSink, HintManager, SystemTimeSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hintd", about = "Power hint arbitration daemon")]
struct Args {
    /// Path to the node configuration (.toml or .json).
    #[arg(long)]
    config: PathBuf,

    /// Write a diagnostics snapshot to stdout before exiting.
    #[arg(long)]
    dump_on_exit: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ArbiterConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    let sink = Arc::new(CallbackSink::new(
        |name: &str, identifier: &str, value: &str| {
            info!(node = name, identifier, value, "applied");
        },
    ));
    let manager = HintManager::from_config(&config, sink, Arc::new(SystemTimeSource))
        .context("failed to build node registry")?;
    info!(nodes = manager.node_count(), "hintd running");

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .context("failed to install signal handler")?;
    let _ = shutdown_rx.recv();

    if args.dump_on_exit {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        manager.dump(&mut out);
    }
    info!("hintd shutting down");
    Ok(())
}
