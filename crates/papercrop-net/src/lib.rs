// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Papercrop Net — the networked half of the paper detector: the wire
// codec (EOF-delimited image frames), the generic worker pool, band
// tiling/stitching, the per-connection pipeline, and the TCP server that
// ties them together.

pub mod codec;
pub mod pipeline;
pub mod server;
pub mod tile;
pub mod worker;

pub use codec::ImageKind;
pub use pipeline::WorkerPools;
pub use server::Server;
pub use worker::{start_pool, Task};
