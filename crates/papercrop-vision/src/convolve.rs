// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kernel convolution over grayscale buffers.

use image::{GrayImage, Luma};

use crate::kernel::Kernel;

/// Convolve a grayscale image with a kernel.
///
/// Border policy: only in-bounds neighbours are accumulated and the result
/// is divided by the actual sum of the weights used, so normalized kernels
/// (e.g. Gaussian) stay normalized next to the image edge.
pub fn apply_kernel(img: &GrayImage, kernel: &Kernel) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);
    let radius = kernel.radius();

    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let mut sum = 0.0;
            let mut weight_sum = 0.0;

            for ky in -radius..=radius {
                for kx in -radius..=radius {
                    let px = x + kx;
                    let py = y + ky;
                    if px >= 0 && px < width as i32 && py >= 0 && py < height as i32 {
                        let w = kernel.at((ky + radius) as usize, (kx + radius) as usize);
                        sum += f64::from(img.get_pixel(px as u32, py as u32).0[0]) * w;
                        weight_sum += w;
                    }
                }
            }

            out.put_pixel(x as u32, y as u32, Luma([(sum / weight_sum) as u8]));
        }
    }

    out
}
