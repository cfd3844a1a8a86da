// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry shared by the contour selector and the rectifier: contours,
// bounding boxes, labelled quadrilateral corners and the projective transform.

use imageproc::geometric_transformations::Projection;
use imageproc::point::Point;

/// A closed polygon traced around a connected region of an edge map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed area (shoelace formula).
    pub fn area(&self) -> f64 {
        shoelace_area(&self.points)
    }

    /// Axis-aligned bounding box, or `None` for an empty contour.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let mut bbox = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &self.points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }
}

/// Inclusive pixel bounds of a contour.
///
/// Widths and heights count pixels, so a box spanning columns 10..=19 is
/// 10 wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x) as u32 + 1
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y) as u32 + 1
    }

    /// A box with no extent on some axis cannot describe a receipt.
    pub fn is_degenerate(&self) -> bool {
        self.min_x == self.max_x || self.min_y == self.max_y
    }

    /// Corners `(x, y)`, `(x + w, y)`, `(x + w, y + h)`, `(x, y + h)`.
    pub fn corners(&self) -> [(f32, f32); 4] {
        let x = self.min_x as f32;
        let y = self.min_y as f32;
        let w = self.width() as f32;
        let h = self.height() as f32;
        [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
    }
}

/// Four corners labelled by position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCorners {
    pub top_left: (f32, f32),
    pub top_right: (f32, f32),
    pub bottom_right: (f32, f32),
    pub bottom_left: (f32, f32),
}

impl QuadCorners {
    /// Label four points regardless of the order they are given in.
    ///
    /// Top-left has the smallest `x + y`, bottom-right the largest; top-right
    /// has the smallest `y - x`, bottom-left the largest. Ties are broken by
    /// `x`.
    pub fn from_points(points: [(f32, f32); 4]) -> Self {
        let sum = |p: &(f32, f32)| p.0 + p.1;
        let diff = |p: &(f32, f32)| p.1 - p.0;
        Self {
            top_left: extreme(&points, sum, false),
            top_right: extreme(&points, diff, false),
            bottom_right: extreme(&points, sum, true),
            bottom_left: extreme(&points, diff, true),
        }
    }

    /// Divide every coordinate by `ratio`.
    pub fn unscaled(&self, ratio: f64) -> Self {
        let f = |p: (f32, f32)| ((p.0 as f64 / ratio) as f32, (p.1 as f64 / ratio) as f32);
        Self {
            top_left: f(self.top_left),
            top_right: f(self.top_right),
            bottom_right: f(self.bottom_right),
            bottom_left: f(self.bottom_left),
        }
    }

    /// `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn to_array(&self) -> [(f32, f32); 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Output size of the flattened quadrilateral: the longer of each pair of
    /// opposite edges, floored, at least one pixel.
    pub fn target_size(&self) -> (u32, u32) {
        let width_bottom = distance(self.bottom_left, self.bottom_right);
        let width_top = distance(self.top_left, self.top_right);
        let height_right = distance(self.top_right, self.bottom_right);
        let height_left = distance(self.top_left, self.bottom_left);

        let width = (width_bottom as u32).max(width_top as u32).max(1);
        let height = (height_right as u32).max(height_left as u32).max(1);
        (width, height)
    }
}

/// Projective mapping from a quadrilateral onto a `width` x `height` rectangle.
#[derive(Debug, Clone)]
pub struct TransformMatrix {
    projection: Projection,
    width: u32,
    height: u32,
}

impl TransformMatrix {
    /// Map `quad` onto `(0,0)`, `(w-1,0)`, `(w-1,h-1)`, `(0,h-1)`.
    ///
    /// An axis one pixel long is solved against a unit span and shifted so
    /// that the quad's centre line lands on that single row or column.
    /// Returns `None` when the corners are collinear.
    pub fn onto_rectangle(quad: &QuadCorners, width: u32, height: u32) -> Option<Self> {
        let span = |size: u32| size.saturating_sub(1).max(1) as f32;
        let (right, bottom) = (span(width), span(height));
        let dest = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
        let mut projection = Projection::from_control_points(quad.to_array(), dest)?;

        let centre = |size: u32| if size <= 1 { -0.5 } else { 0.0 };
        if width <= 1 || height <= 1 {
            projection = projection.and_then(Projection::translate(centre(width), centre(height)));
        }
        Some(Self {
            projection,
            width,
            height,
        })
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

fn extreme(
    points: &[(f32, f32); 4],
    key: impl Fn(&(f32, f32)) -> f32,
    largest: bool,
) -> (f32, f32) {
    let cmp = |a: &&(f32, f32), b: &&(f32, f32)| {
        key(a).total_cmp(&key(b)).then(a.0.total_cmp(&b.0))
    };
    let found = if largest {
        points.iter().max_by(cmp)
    } else {
        points.iter().min_by(cmp)
    };
    *found.unwrap_or(&points[0])
}

/// Euclidean distance between two points.
pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Area of a closed polygon using the shoelace formula. The vertices should
/// be in order (CW or CCW).
pub fn shoelace_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}

/// Drop vertices that continue a straight run in the same direction.
///
/// The polygon is treated as closed. Reversals (one-pixel spurs) are kept.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut kept = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let (ax, ay) = (cur.x - prev.x, cur.y - prev.y);
        let (bx, by) = (next.x - cur.x, next.y - cur.y);
        let cross = ax * by - ay * bx;
        let dot = ax * bx + ay * by;
        if cross != 0 || dot <= 0 {
            kept.push(cur);
        }
    }
    if kept.is_empty() {
        // Every point was mid-run: only possible for duplicated points.
        kept.push(points[0]);
    }
    kept
}
