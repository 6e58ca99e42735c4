// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Papercrop client: stream an image file to the server, receive the
// cropped reply, and write it next to the working directory as
// `output_<basename>`.

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{error, info};

use papercrop_core::{PapercropError, Result};
use papercrop_net::codec::EOF_MARKER;

/// Socket write chunk size, matching the server's framing.
const BUFFER_SIZE: usize = 1024;

/// Send an image to a papercrop server and save the cropped result.
#[derive(Debug, Parser)]
#[command(name = "papercrop-client", version)]
struct Args {
    /// Path of the image file to send (JPEG or PNG).
    image: PathBuf,

    /// Server address.
    #[arg(default_value = "localhost:14750")]
    addr: String,

    /// Log file receiving all diagnostics.
    #[arg(long, default_value = "client.log")]
    log_file: PathBuf,
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

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal client error");
        eprintln!("papercrop-client: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let image = tokio::fs::read(&args.image).await?;
    info!(path = %args.image.display(), bytes = image.len(), "image file read");

    let mut stream = TcpStream::connect(&args.addr).await?;
    info!(addr = %args.addr, "connected to server");

    for chunk in image.chunks(BUFFER_SIZE) {
        stream.write_all(chunk).await?;
    }
    stream.write_all(EOF_MARKER).await?;
    stream.flush().await?;
    info!("image sent");

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    if reply.is_empty() {
        return Err(PapercropError::Server(
            "server closed the connection without a reply".into(),
        ));
    }
    info!(bytes = reply.len(), "reply received");

    let output = output_path(Path::new("."), &args.image);
    tokio::fs::write(&output, &reply).await?;
    info!(path = %output.display(), "cropped image written");

    Ok(())
}

/// `output_<basename>` in `dir`, disambiguated with a numeric infix while
/// the target already exists.
fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let base = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());

    let mut candidate = dir.join(format!("output_{base}"));
    let mut index = 1;
    while candidate.exists() {
        candidate = dir.join(format!("output_{index}_{base}"));
        index += 1;
    }
    candidate
}
