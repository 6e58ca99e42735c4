// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The TCP server: accept loop, connection cap, and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use papercrop_core::{PapercropError, Result, ServerConfig};

use crate::pipeline::{self, WorkerPools};

/// The papercrop TCP server.
///
/// Owns the listener, the three worker pools, the connection-cap
/// semaphore, and a receiver for the process-wide shutdown signal. One
/// pipeline runs per accepted connection; the semaphore bounds how many
/// make progress concurrently, independent of how many sockets are
/// accepted.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    pools: WorkerPools,
    connection_cap: Arc<Semaphore>,
    shutdown: watch::Receiver<bool>,
}

impl Server {
    /// Bind the listener and start the worker pools.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the address
    /// cannot be bound.
    pub async fn bind(config: ServerConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        config.validate()?;

        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| PapercropError::Server(format!("bind {addr}: {e}")))?;

        info!(
            addr = %addr,
            workers = config.num_workers,
            connection_cap = config.connection_cap,
            "server listening"
        );

        let pools = WorkerPools::start(config.num_workers);
        let connection_cap = Arc::new(Semaphore::new(config.connection_cap));

        Ok(Self {
            listener,
            config,
            pools,
            connection_cap,
            shutdown,
        })
    }

    /// The address the listener actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the shutdown signal fires.
    ///
    /// Each connection is handled in its own task. Dropping `self` on
    /// return closes the listener and the pool queues; workers finish
    /// whatever is in flight, then stop.
    pub async fn run(mut self) {
        enum Event {
            Shutdown,
            Accepted(std::io::Result<(tokio::net::TcpStream, SocketAddr)>),
        }

        loop {
            let event = tokio::select! {
                _ = self.shutdown.wait_for(|&stop| stop) => Event::Shutdown,
                accepted = self.listener.accept() => Event::Accepted(accepted),
            };

            match event {
                Event::Shutdown => {
                    info!("shutdown signal received; closing listener");
                    break;
                }
                Event::Accepted(Ok((stream, peer))) => {
                    info!(peer = %peer, "incoming connection");
                    self.spawn_handler(stream, peer);
                }
                Event::Accepted(Err(e)) => {
                    // Transient accept failures are logged and the
                    // loop keeps serving.
                    warn!(error = %e, "failed to accept connection");
                }
            }
        }

        info!("server stopped accepting; workers drain remaining tasks");
    }

    /// Run one connection pipeline in its own task, gated on the
    /// connection-cap semaphore.
    fn spawn_handler(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let pools = self.pools.clone();
        let config = self.config.clone();
        let mut shutdown = self.shutdown.clone();
        let cap = Arc::clone(&self.connection_cap);

        tokio::spawn(async move {
            // Blocks while the cap is reached; permits free as handlers
            // finish.
            let _permit = match cap.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let mut stream = stream;
            match pipeline::handle(&mut stream, peer, &pools, &config, &mut shutdown).await {
                Ok(()) => info!(peer = %peer, "connection finished"),
                Err(PapercropError::ShuttingDown) => {
                    info!(peer = %peer, "connection abandoned during shutdown");
                }
                Err(e) => {
                    // Dropping the stream without a reply is how errors
                    // surface to the client.
                    warn!(peer = %peer, error = %e, "connection handler failed");
                }
            }
        });
    }
}
