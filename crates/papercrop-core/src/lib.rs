// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Papercrop — Core types, error and configuration definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod geometry;

pub use config::ServerConfig;
pub use error::{PapercropError, Result};
pub use geometry::{polygon_area, Contour, ContourWithArea, Point, Rect};
