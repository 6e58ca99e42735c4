// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connected-component contour extraction over a binary edge map.

use std::collections::{HashSet, VecDeque};

use image::GrayImage;
use papercrop_core::{Contour, Point, Rect};

/// Components with this many points or fewer are discarded as noise.
const MIN_CONTOUR_LEN: usize = 50;

/// 8-connectivity: Canny edges are often diagonal single-pixel chains,
/// so 4-connectivity would shred them.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Extract the connected components of set pixels within `band`.
///
/// A pixel is "set" when its value exceeds 128 (strong edges are 255).
/// Each component is returned as one contour in BFS-traversal order; the
/// list is in scan-line discovery order. Traversal is clamped to the band,
/// so a component crossing a band seam surfaces as two separate contours.
pub fn find_contours(edges: &GrayImage, band: Rect) -> Vec<Contour> {
    let mut visited: HashSet<Point> = HashSet::new();
    let mut contours = Vec::new();

    for y in band.min.y..band.max.y {
        for x in band.min.x..band.max.x {
            let seed = Point::new(x, y);
            if !is_set(edges, seed) || visited.contains(&seed) {
                continue;
            }

            let mut contour: Contour = Vec::new();
            let mut queue: VecDeque<Point> = VecDeque::from([seed]);

            while let Some(current) = queue.pop_front() {
                if !visited.insert(current) {
                    continue;
                }
                contour.push(current);

                for (dx, dy) in DIRECTIONS {
                    let neighbor = Point::new(current.x + dx, current.y + dy);
                    if band.contains(neighbor)
                        && is_set(edges, neighbor)
                        && !visited.contains(&neighbor)
                    {
                        queue.push_back(neighbor);
                    }
                }
            }

            if contour.len() > MIN_CONTOUR_LEN {
                contours.push(contour);
            }
        }
    }

    contours
}

/// Whether the edge map holds a set pixel at `p`. Out-of-bounds reads as
/// unset.
fn is_set(edges: &GrayImage, p: Point) -> bool {
    if p.x < 0 || p.y < 0 || p.x >= edges.width() as i32 || p.y >= edges.height() as i32 {
        return false;
    }
    edges.get_pixel(p.x as u32, p.y as u32).0[0] > 128
}
