// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic helpers: paint a contour onto an image and mask an image to
// the inside of a quadrilateral.

use image::{Rgba, RgbaImage};
use papercrop_core::Point;

/// Return a copy of `img` with every contour point painted red.
///
/// Points outside the image are ignored. Intended for debugging dumps of
/// intermediate pipeline state.
pub fn draw_contour(img: &RgbaImage, contour: &[Point]) -> RgbaImage {
    let mut out = img.clone();
    let red = Rgba([255, 0, 0, 255]);

    for point in contour {
        if point.x >= 0
            && point.y >= 0
            && point.x < out.width() as i32
            && point.y < out.height() as i32
        {
            out.put_pixel(point.x as u32, point.y as u32, red);
        }
    }

    out
}

/// Mask `img` to the interior of `quad`: pixels inside the polygon are
/// copied, everything else is opaque black. The output keeps the input
/// dimensions.
pub fn extract_region(img: &RgbaImage, quad: &[Point]) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(img.width(), img.height(), Rgba([0, 0, 0, 255]));

    for (x, y, pixel) in img.enumerate_pixels() {
        if is_inside_quad(x as i32, y as i32, quad) {
            out.put_pixel(x, y, *pixel);
        }
    }

    out
}

/// Even-odd ray-cast point-in-polygon test.
fn is_inside_quad(x: i32, y: i32, quad: &[Point]) -> bool {
    let n = quad.len();
    let mut count = 0;

    for i in 0..n {
        let j = (i + 1) % n;
        let (a, b) = (quad[i], quad[j]);
        if (a.y > y) != (b.y > y) {
            let intersect_x = f64::from(b.x - a.x) * f64::from(y - a.y)
                / f64::from(b.y - a.y)
                + f64::from(a.x);
            if f64::from(x) < intersect_x {
                count += 1;
            }
        }
    }

    count % 2 == 1
}
