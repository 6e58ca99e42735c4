// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Papercrop server entry point. Initialises file logging, wires SIGINT to
// the shutdown signal, and runs the accept loop until interrupted.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use papercrop_core::{Result, ServerConfig};
use papercrop_net::Server;

/// Receive photographs of paper sheets over TCP, crop them to the
/// detected sheet, and send them back.
#[derive(Debug, Parser)]
#[command(name = "papercrop-server", version)]
struct Args {
    /// Bind address (hostname or IP).
    #[arg(long)]
    host: Option<String>,

    /// Listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Workers per pool; defaults to the CPU count.
    #[arg(long)]
    workers: Option<usize>,

    /// Optional JSON configuration file; CLI flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file receiving all diagnostics.
    #[arg(long, default_value = "server.log")]
    log_file: PathBuf,
}

impl Args {
    /// Resolve the effective configuration: defaults, then the config
    /// file, then CLI flags.
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(workers) = self.workers {
            config.num_workers = workers;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("failed to open log file {}: {e}", args.log_file.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(std::sync::Arc::new(log_file))
        .init();

    info!("starting server");

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal server error");
        eprintln!("papercrop-server: {e}");
        std::process::exit(1);
    }

    info!("server shut down gracefully");
}

async fn run(args: Args) -> Result<()> {
    let config = args.into_config()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Without signal delivery there is no way to stop
                // gracefully; keep the sender alive so the server runs on.
                error!(error = %e, "failed to listen for interrupt signal");
                std::future::pending::<()>().await;
            }
        }
    });

    println!("The server is running... (press Ctrl+C to stop)");

    let server = Server::bind(config, shutdown_rx).await?;
    server.run().await;
    Ok(())
}
