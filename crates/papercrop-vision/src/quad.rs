// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Largest-quadrilateral selection and bounding-corner computation.

use papercrop_core::{polygon_area, Contour, ContourWithArea, Point, Rect};

/// Pick the contour with the largest shoelace area from a slice of the
/// contour universe.
///
/// An empty slice (or one whose contours all have zero area) yields the
/// default result with area 0, which downstream means "no quadrilateral
/// found".
pub fn largest_quadrilateral(contours: Vec<Contour>) -> ContourWithArea {
    let mut best = ContourWithArea::default();

    for contour in contours {
        let area = polygon_area(&contour);
        if area > best.area {
            best = ContourWithArea { contour, area };
        }
    }

    best
}

/// Compute the axis-aligned bounding box of a contour.
///
/// Both corners start at `center`, so an empty contour (or one that never
/// expands past the centre) degenerates to a zero-size box at the image
/// centre rather than an arbitrary rectangle.
pub fn find_corner(contour: &[Point], center: Point) -> Rect {
    let mut lower = center;
    let mut upper = center;

    for point in contour {
        lower.x = lower.x.min(point.x);
        lower.y = lower.y.min(point.y);
        upper.x = upper.x.max(point.x);
        upper.y = upper.y.max(point.y);
    }

    Rect { min: lower, max: upper }
}
