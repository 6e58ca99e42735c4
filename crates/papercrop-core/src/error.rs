// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for papercrop.

use thiserror::Error;

/// Top-level error type for all papercrop operations.
#[derive(Debug, Error)]
pub enum PapercropError {
    // -- Codec errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    // -- Pipeline errors --
    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("result channel closed before all {0} results arrived")]
    ChannelClosed(&'static str),

    /// Raised when a handler observes the shutdown signal mid-pipeline.
    /// The connection is abandoned without a reply.
    #[error("server is shutting down")]
    ShuttingDown,

    // -- Server / transport --
    #[error("server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PapercropError>;
