// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canny edge detection over a single gray band: Gaussian blur, dynamic
// threshold estimation, Sobel gradients, non-maximum suppression, and
// two-pass hysteresis.

use image::{GrayImage, Luma};
use tracing::trace;

use crate::convolve::apply_kernel;
use crate::kernel::{gaussian, sobel_pair};
use crate::sobel::{dynamic_thresholds, sobel_gradient, Gradient};

/// Gaussian smoothing kernel side length.
const GAUSSIAN_SIZE: usize = 5;

/// Gaussian smoothing standard deviation.
const GAUSSIAN_SIGMA: f64 = 1.4;

/// Multiplier applied to the mean gradient magnitude to obtain the high
/// hysteresis threshold. The sensitivity knob of the whole detector.
const SENSITIVITY: f64 = 1.5;

/// Marker value for confirmed edge pixels.
const STRONG: u8 = 255;

/// Marker value for candidate edge pixels awaiting promotion.
const WEAK: u8 = 75;

/// Run the full Canny stack on one gray band.
///
/// The thresholds are recomputed per band from the blurred pixels, so a
/// band's sensitivity adapts to its own contrast. The output has the same
/// dimensions as the input; edge pixels are 255, everything else 0 (or the
/// weak marker 75 for unpromoted candidates, which downstream stages treat
/// as background).
pub fn canny(img: &GrayImage) -> GrayImage {
    let blurred = apply_kernel(img, &gaussian(GAUSSIAN_SIZE, GAUSSIAN_SIGMA));

    let (low, high) = dynamic_thresholds(&blurred, SENSITIVITY);
    trace!(low, high, "hysteresis thresholds computed");

    let (kx, ky) = sobel_pair(3);
    let gradient = sobel_gradient(&blurred, &kx, &ky);

    let thinned = non_max_suppression(&gradient);

    hysteresis(&thinned, low, high)
}

/// Suppress gradient magnitudes that are not local maxima along their
/// gradient direction, thinning edges to single-pixel chains.
fn non_max_suppression(gradient: &Gradient) -> GrayImage {
    let (width, height) = gradient.magnitude.dimensions();
    let mut suppressed = GrayImage::new(width, height);

    for y in 1..(height as i32 - 1) {
        for x in 1..(width as i32 - 1) {
            let (x, y) = (x as u32, y as u32);
            let angle = gradient.angle(x, y);
            let mag = gradient.magnitude.get_pixel(x, y).0[0];

            // Quantize the angle to one of four directions and pick the
            // two neighbours perpendicular to the edge.
            let (n1, n2) = if (-22.5..=22.5).contains(&angle) || angle >= 157.5 || angle <= -157.5
            {
                (
                    gradient.magnitude.get_pixel(x - 1, y).0[0],
                    gradient.magnitude.get_pixel(x + 1, y).0[0],
                )
            } else if (angle > 22.5 && angle <= 67.5) || (angle >= -157.5 && angle < -112.5) {
                (
                    gradient.magnitude.get_pixel(x - 1, y - 1).0[0],
                    gradient.magnitude.get_pixel(x + 1, y + 1).0[0],
                )
            } else if (angle > 67.5 && angle <= 112.5) || (angle >= -112.5 && angle < -67.5) {
                (
                    gradient.magnitude.get_pixel(x, y - 1).0[0],
                    gradient.magnitude.get_pixel(x, y + 1).0[0],
                )
            } else {
                (
                    gradient.magnitude.get_pixel(x - 1, y + 1).0[0],
                    gradient.magnitude.get_pixel(x + 1, y - 1).0[0],
                )
            };

            if mag >= n1 && mag >= n2 {
                suppressed.put_pixel(x, y, Luma([mag]));
            }
        }
    }

    suppressed
}

/// Two-pass hysteresis thresholding.
///
/// Pass 1 labels pixels strong (>= high), weak (>= low), or background.
/// Pass 2 promotes a weak pixel to strong when any 8-neighbour is strong
/// and drops it otherwise. Promotion is single-pass: weak chains not
/// directly adjacent to a strong seed are dropped.
///
/// Pixels with magnitude 0 were suppressed (or never computed) and are
/// never edge candidates, even when a featureless band collapses both
/// thresholds to 0.
fn hysteresis(img: &GrayImage, low: f64, high: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mag = f64::from(img.get_pixel(x, y).0[0]);
            let label = if mag > 0.0 && mag >= high {
                STRONG
            } else if mag > 0.0 && mag >= low {
                WEAK
            } else {
                0
            };
            out.put_pixel(x, y, Luma([label]));
        }
    }

    let mut promoted = out.clone();
    for y in 0..height {
        for x in 0..width {
            if out.get_pixel(x, y).0[0] == WEAK {
                let label = if has_strong_neighbor(&out, x, y) { STRONG } else { 0 };
                promoted.put_pixel(x, y, Luma([label]));
            }
        }
    }

    promoted
}

/// True when any of the 8 neighbours of `(x, y)` is a strong edge.
fn has_strong_neighbor(img: &GrayImage, x: u32, y: u32) -> bool {
    let (width, height) = img.dimensions();
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx >= 0
                && ny >= 0
                && nx < width as i32
                && ny < height as i32
                && img.get_pixel(nx as u32, ny as u32).0[0] == STRONG
            {
                return true;
            }
        }
    }
    false
}
