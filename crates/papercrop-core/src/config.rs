// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PapercropError, Result};

/// Server settings.
///
/// All fields have working defaults; a JSON config file and CLI flags can
/// override them. `num_workers` sizes each of the three worker pools and
/// the tiling fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (hostname or IP).
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Parallelism per worker pool. Defaults to the CPU count.
    pub num_workers: usize,
    /// Socket read/write chunk size in bytes.
    pub buffer_size: usize,
    /// Rows of overlap added to each non-first band before edge detection.
    pub overlap_size: u32,
    /// Maximum number of connections processed concurrently.
    pub connection_cap: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 14750,
            num_workers: default_num_workers(),
            buffer_size: 1024,
            overlap_size: 20,
            connection_cap: 5,
        }
    }
}

impl ServerConfig {
    /// Load settings from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(PapercropError::Config("num_workers must be at least 1".into()));
        }
        if self.buffer_size == 0 {
            return Err(PapercropError::Config("buffer_size must be at least 1".into()));
        }
        if self.connection_cap == 0 {
            return Err(PapercropError::Config(
                "connection_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The `host:port` string the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Number of CPUs, falling back to 1 if the platform will not say.
fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
