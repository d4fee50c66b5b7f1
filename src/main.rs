//! termlink - headless serial and TCP terminal
//!
//! Opens one transport (serial port, TCP client or TCP server), prints every
//! received frame and forwards stdin lines to the peer until stdin closes.

mod config;
mod terminal;

use clap::Parser;
use config::{Config, TransportKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "termlink")]
#[command(about = "Headless terminal for serial ports and TCP sockets")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "TERMLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Transport to open (serial, client, server), overrides the config file
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).map_err(|e| {
        tracing::error!("Failed to load config: {}", e);
        e
    })?;
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    config.validate()?;

    if let Some(path) = cli.write_config {
        config.save(&path)?;
        tracing::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    tracing::info!("Starting termlink");
    tracing::info!("  Transport: {}", config.transport);
    match config.transport {
        TransportKind::Serial => tracing::info!("  Port: {}", config.serial),
        TransportKind::Client => tracing::info!(
            "  Server: {}:{} ({})",
            config.client.address,
            config.client.port,
            config.client.mode
        ),
        TransportKind::Server => tracing::info!(
            "  Listening: port {}, up to {} clients ({})",
            config.server.port,
            config.server.max_clients,
            config.server.mode
        ),
    }

    terminal::run(&config)?;

    tracing::info!("termlink stopped");
    Ok(())
}
