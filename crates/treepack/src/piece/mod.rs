//! Piece geometry: placements, rigid transforms, and bounds.
//!
//! Conventions
//! - Angles are degrees, counter-clockwise, about the local origin (0,0).
//! - A transform rotates first, then translates: `p' = R(θ)·p + (x, y)`.
//! - A `Piece` owns its transformed polygon; it is rebuilt whenever the
//!   placement changes and cannot be mutated any other way.

mod transform;
mod types;

pub use transform::{bounds, inverse_transform, transform};
pub use types::{Bounds, Piece, Placement, Polygon};
