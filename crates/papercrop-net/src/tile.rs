// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Band tiling and stitching.
//
// The pipeline slices images into horizontal row-bands, one per worker.
// Bands fed to convolution stages carry extra rows of context at the top
// (the overlap) so kernels read correct neighbours near the seam; the
// stitcher discards those duplicated rows, so the trimmed bands exactly
// tile the source bounds.

use image::GrayImage;
use papercrop_core::Rect;

/// One horizontal slab of an image assigned to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// The extended input region, including the top overlap.
    pub rect: Rect,
    /// Rows at the top of `rect` duplicated from the previous band.
    /// Zero for the first band.
    pub overlap_rows: i32,
}

/// A processed band: the pixels produced for [`Band::rect`].
#[derive(Debug)]
pub struct GrayBand {
    pub rect: Rect,
    pub overlap_rows: i32,
    pub pixels: GrayImage,
}

/// Compute the overlapped bands for the grayscale/Canny stages.
///
/// Base band height is `ceil(rows / num_workers)`; band `i` nominally
/// covers `[min_y + i*h, min_y + (i+1)*h)` clamped to `max_y`, and every
/// band except the first is extended upward by `overlap` rows (clamped at
/// `min_y`). Zero-height bands (an image with fewer rows than workers)
/// are skipped.
pub fn color_bands(bounds: Rect, num_workers: usize, overlap: u32) -> Vec<Band> {
    let total_rows = bounds.height();
    let workers = num_workers.max(1) as i32;
    let band_height = (total_rows + workers - 1) / workers;
    let mut bands = Vec::new();

    if band_height == 0 {
        return bands;
    }

    for i in 0..workers {
        let nominal_start = bounds.min.y + i * band_height;
        let nominal_end = (nominal_start + band_height).min(bounds.max.y);
        if nominal_start >= nominal_end {
            break;
        }

        let extended_start = if i == 0 {
            nominal_start
        } else {
            (nominal_start - overlap as i32).max(bounds.min.y)
        };

        bands.push(Band {
            rect: Rect::new(bounds.min.x, extended_start, bounds.max.x, nominal_end),
            overlap_rows: nominal_start - extended_start,
        });
    }

    bands
}

/// Compute the non-overlapping bands for the contour stage.
pub fn contour_bands(bounds: Rect, num_workers: usize) -> Vec<Rect> {
    color_bands(bounds, num_workers, 0)
        .into_iter()
        .map(|band| band.rect)
        .collect()
}

/// Split `len` contour indices into `num_workers` contiguous slices; the
/// last slice absorbs the remainder. Slices may be empty.
pub fn partition_slices(len: usize, num_workers: usize) -> Vec<std::ops::Range<usize>> {
    let workers = num_workers.max(1);
    let chunk = len / workers;

    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i == workers - 1 { len } else { (i + 1) * chunk };
            start..end
        })
        .collect()
}

/// Reassemble processed bands into one full-size buffer.
///
/// Bands are sorted by their Y origin; each contributes only the rows at
/// and below its own overlap, drawn at the nominal offset, so every
/// output row comes from exactly one band.
pub fn stitch(bounds: Rect, mut bands: Vec<GrayBand>) -> GrayImage {
    bands.sort_by_key(|band| band.rect.min.y);

    let mut out = GrayImage::new(bounds.width() as u32, bounds.height() as u32);

    for band in &bands {
        for row in band.overlap_rows..band.rect.height() {
            let out_y = (band.rect.min.y + row - bounds.min.y) as u32;
            for col in 0..band.rect.width() {
                let pixel = band.pixels.get_pixel(col as u32, row as u32);
                out.put_pixel((band.rect.min.x + col - bounds.min.x) as u32, out_y, *pixel);
            }
        }
    }

    out
}
