// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RGBA-to-luminance conversion over a band of a shared source image.

use image::{GrayImage, Luma, RgbaImage};
use papercrop_core::Rect;

/// Convert one band of an RGBA image to 8-bit luminance.
///
/// `band` addresses a sub-rectangle of `source` in image coordinates; the
/// returned buffer is band-sized with its own origin. The weights are the
/// standard Rec. 601 luma coefficients applied as integers,
/// `(299*R + 587*G + 114*B) / 1000`. Alpha is ignored.
///
/// The conversion is idempotent on pixels with R = G = B: the weights sum
/// to 1000, so the value passes through unchanged.
pub fn grayscale_band(source: &RgbaImage, band: Rect) -> GrayImage {
    let mut out = GrayImage::new(band.width() as u32, band.height() as u32);

    for y in 0..band.height() {
        for x in 0..band.width() {
            let pixel = source.get_pixel((band.min.x + x) as u32, (band.min.y + y) as u32);
            let [r, g, b, _] = pixel.0;
            let gray =
                (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
            out.put_pixel(x as u32, y as u32, Luma([gray as u8]));
        }
    }

    out
}
