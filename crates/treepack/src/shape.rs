//! The base outline shared by every piece.
//!
//! A closed 15-vertex polygon resembling a tree with a trunk. Vertices run
//! clockwise from the tip; the trunk hangs below the origin. The outline is
//! immutable once built: vertex count and ordering never change.

use std::fmt;

use nalgebra::Vector2;

use crate::piece::{bounds, Bounds};

/// Number of vertices in the base outline.
pub const VERTEX_COUNT: usize = 15;

/// Tree outline, local coordinates `(x, y)`.
pub const TREE_VERTICES: [(f64, f64); VERTEX_COUNT] = [
    (0.0, 0.8),
    (0.125, 0.5),
    (0.0625, 0.5),
    (0.2, 0.25),
    (0.1, 0.25),
    (0.35, 0.0),
    (0.075, 0.0),
    (0.075, -0.2),
    (-0.075, -0.2),
    (-0.075, 0.0),
    (-0.35, 0.0),
    (-0.1, 0.25),
    (-0.2, 0.25),
    (-0.0625, 0.5),
    (-0.125, 0.5),
];

/// Malformed base outline. Not recoverable.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeError {
    VertexCount { expected: usize, found: usize },
    NonFinite { index: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::VertexCount { expected, found } => {
                write!(f, "base shape needs {expected} vertices, got {found}")
            }
            ShapeError::NonFinite { index } => {
                write!(f, "base shape vertex {index} is not finite")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// Immutable polygon outline in local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseShape {
    vertices: Vec<Vector2<f64>>,
}

impl BaseShape {
    /// The canonical tree outline.
    pub fn tree() -> Self {
        Self {
            vertices: TREE_VERTICES
                .iter()
                .map(|&(x, y)| Vector2::new(x, y))
                .collect(),
        }
    }

    /// Validate a custom outline (exactly `VERTEX_COUNT` finite vertices).
    pub fn from_vertices(vertices: Vec<Vector2<f64>>) -> Result<Self, ShapeError> {
        if vertices.len() != VERTEX_COUNT {
            return Err(ShapeError::VertexCount {
                expected: VERTEX_COUNT,
                found: vertices.len(),
            });
        }
        if let Some(index) = vertices
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite()))
        {
            return Err(ShapeError::NonFinite { index });
        }
        Ok(Self { vertices })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.vertices
    }

    /// Enclosed area (shoelace, orientation-independent).
    pub fn area(&self) -> f64 {
        crate::overlap::polygon_area(&self.vertices)
    }

    /// Local axis-aligned bounding box (placement at the origin, no rotation).
    pub fn bounds(&self) -> Bounds {
        bounds(&self.vertices)
    }
}

impl Default for BaseShape {
    fn default() -> Self {
        Self::tree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_area_and_bounds() {
        let shape = BaseShape::tree();
        assert_eq!(shape.vertices().len(), VERTEX_COUNT);
        // trunk 0.03 + tiers 0.1125 + 0.065625 + 0.0375
        assert!((shape.area() - 0.245625).abs() < 1e-12);
        let b = shape.bounds();
        assert!((b.min_x + 0.35).abs() < 1e-12);
        assert!((b.max_x - 0.35).abs() < 1e-12);
        assert!((b.min_y + 0.2).abs() < 1e-12);
        assert!((b.max_y - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_vertex_count() {
        let mut v: Vec<_> = BaseShape::tree().vertices().to_vec();
        v.pop();
        assert_eq!(
            BaseShape::from_vertices(v),
            Err(ShapeError::VertexCount {
                expected: 15,
                found: 14
            })
        );
    }

    #[test]
    fn rejects_non_finite_vertex() {
        let mut v: Vec<_> = BaseShape::tree().vertices().to_vec();
        v[3].y = f64::NAN;
        assert_eq!(
            BaseShape::from_vertices(v),
            Err(ShapeError::NonFinite { index: 3 })
        );
    }

    #[test]
    fn accepts_valid_custom_outline() {
        let v: Vec<_> = BaseShape::tree().vertices().to_vec();
        let shape = BaseShape::from_vertices(v).unwrap();
        assert_eq!(shape, BaseShape::tree());
    }
}
