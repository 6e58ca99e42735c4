// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sobel gradient computation and the dynamic threshold estimate used by
// the Canny hysteresis stage.

use image::{GrayImage, Luma};

use crate::kernel::{sobel_pair, Kernel};

/// Gradient magnitudes and directions for one image.
///
/// Magnitudes are clamped to `0..=255` and stored as a grayscale buffer;
/// angles are `atan2(gy, gx)` in degrees, one per pixel.
pub struct Gradient {
    pub magnitude: GrayImage,
    angles: Vec<f64>,
    width: usize,
}

impl Gradient {
    /// Gradient direction at `(x, y)` in degrees, in `[-180, 180]`.
    pub fn angle(&self, x: u32, y: u32) -> f64 {
        self.angles[y as usize * self.width + x as usize]
    }
}

/// Convolve with a Sobel X/Y kernel pair.
///
/// Only pixels a full kernel radius away from every border are computed;
/// the margin stays at magnitude 0. Both kernels must have the same size.
pub fn sobel_gradient(img: &GrayImage, kx: &Kernel, ky: &Kernel) -> Gradient {
    debug_assert_eq!(kx.size(), ky.size());

    let (width, height) = img.dimensions();
    let mut magnitude = GrayImage::new(width, height);
    let mut angles = vec![0.0; width as usize * height as usize];
    let radius = kx.radius();

    for y in radius..(height as i32 - radius) {
        for x in radius..(width as i32 - radius) {
            let mut gx = 0.0;
            let mut gy = 0.0;

            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let gray = f64::from(
                        img.get_pixel((x + dx) as u32, (y + dy) as u32).0[0],
                    );
                    gx += gray * kx.at((dy + radius) as usize, (dx + radius) as usize);
                    gy += gray * ky.at((dy + radius) as usize, (dx + radius) as usize);
                }
            }

            let mag = (gx * gx + gy * gy).sqrt().min(255.0);
            magnitude.put_pixel(x as u32, y as u32, Luma([mag as u8]));
            angles[y as usize * width as usize + x as usize] =
                gy.atan2(gx) * (180.0 / std::f64::consts::PI);
        }
    }

    Gradient {
        magnitude,
        angles,
        width: width as usize,
    }
}

/// Compute the hysteresis thresholds for one (blurred) band.
///
/// The mean 5x5 Sobel magnitude over the interior pixels sets
/// `high = alpha * mean` and `low = 0.4 * high`. A featureless band has
/// mean 0 and therefore thresholds (0, 0); the hysteresis stage treats
/// zero-magnitude pixels as background, so no edges are produced.
///
/// Returns `(low, high)`.
pub fn dynamic_thresholds(img: &GrayImage, alpha: f64) -> (f64, f64) {
    let (width, height) = img.dimensions();
    let (kx, ky) = sobel_pair(5);
    let gradient = sobel_gradient(img, &kx, &ky);

    let mut total = 0.0;
    let mut count = 0u64;
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            total += f64::from(gradient.magnitude.get_pixel(x, y).0[0]);
            count += 1;
        }
    }

    let mean = if count == 0 { 0.0 } else { total / count as f64 };
    let high = alpha * mean;
    let low = 0.4 * high;

    (low, high)
}
