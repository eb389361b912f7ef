//! Plain data types for placed pieces.

use nalgebra::Vector2;

use super::transform::{bounds, transform};
use crate::shape::BaseShape;

/// Rigid-transform parameters `(x, y, θ)` for one piece. θ in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub deg: f64,
}

impl Placement {
    /// Build a placement; θ wraps into `[0, 360)`.
    #[inline]
    pub fn new(x: f64, y: f64, deg: f64) -> Self {
        Self {
            x,
            y,
            deg: wrap_degrees(deg),
        }
    }

    /// Shift by `(dx, dy, dθ)`; θ wraps.
    #[inline]
    pub fn shifted(&self, dx: f64, dy: f64, ddeg: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.deg + ddeg)
    }
}

/// Wrap an angle into `[0, 360)`.
#[inline]
pub(crate) fn wrap_degrees(deg: f64) -> f64 {
    let w = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.
    if w >= 360.0 {
        0.0
    } else {
        w
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// The empty box: union identity.
    pub const EMPTY: Bounds = Bounds {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    #[inline]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Side of the smallest axis-aligned square containing the box. 0 when empty.
    #[inline]
    pub fn side(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width().max(self.height())
        }
    }

    /// Closed-interval overlap test; touching boxes count as overlapping.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Transformed outline plus its bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    points: Vec<Vector2<f64>>,
    bounds: Bounds,
}

impl Polygon {
    pub fn new(points: Vec<Vector2<f64>>) -> Self {
        let bounds = bounds(&points);
        Self { points, bounds }
    }

    #[inline]
    pub fn points(&self) -> &[Vector2<f64>] {
        &self.points
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn area(&self) -> f64 {
        crate::overlap::polygon_area(&self.points)
    }
}

/// One instance of the base shape with its own placement.
///
/// Invariant: `polygon == transform(shape, placement)`. Both fields are private
/// and only `place` writes them, together.
#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    placement: Placement,
    polygon: Polygon,
}

impl Piece {
    pub fn new(shape: &BaseShape, placement: Placement) -> Self {
        Self {
            placement,
            polygon: transform(shape, placement),
        }
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    #[inline]
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Move the piece; returns the previous placement.
    pub(crate) fn place(&mut self, shape: &BaseShape, placement: Placement) -> Placement {
        let old = self.placement;
        self.placement = placement;
        self.polygon = transform(shape, placement);
        old
    }
}
