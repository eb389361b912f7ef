//! Rotate-then-translate and its inverse.

use nalgebra::{Isometry2, Point2, Vector2};

use super::types::{Bounds, Placement, Polygon};
use crate::shape::BaseShape;

#[inline]
fn isometry(p: Placement) -> Isometry2<f64> {
    Isometry2::new(Vector2::new(p.x, p.y), p.deg.to_radians())
}

/// Rotate `shape` by θ about the origin, then translate by `(x, y)`.
pub fn transform(shape: &BaseShape, placement: Placement) -> Polygon {
    let iso = isometry(placement);
    Polygon::new(
        shape
            .vertices()
            .iter()
            .map(|v| iso.transform_point(&Point2::from(*v)).coords)
            .collect(),
    )
}

/// Translate by `−(x, y)`, then rotate by `−θ`.
pub fn inverse_transform(points: &[Vector2<f64>], placement: Placement) -> Vec<Vector2<f64>> {
    let iso = isometry(placement);
    points
        .iter()
        .map(|v| iso.inverse_transform_point(&Point2::from(*v)).coords)
        .collect()
}

/// `(min_x, min_y, max_x, max_y)` of a point set. `Bounds::EMPTY` for no points.
pub fn bounds(points: &[Vector2<f64>]) -> Bounds {
    points.iter().fold(Bounds::EMPTY, |b, p| Bounds {
        min_x: b.min_x.min(p.x),
        min_y: b.min_y.min(p.y),
        max_x: b.max_x.max(p.x),
        max_y: b.max_y.max(p.y),
    })
}
