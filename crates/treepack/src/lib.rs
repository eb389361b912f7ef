//! Packing N copies of a fixed non-convex tree polygon into the smallest square.
//!
//! Layout (leaves first)
//! - `shape`: the immutable 15-vertex base outline.
//! - `piece`: placements, rigid transforms, bounds, and the cached polygon.
//! - `configuration`: the N pieces of one group size and their bounding square.
//! - `overlap`: pairwise intersection areas (non-convex, via `i_overlay`).
//! - `energy`: side² plus a heavily weighted overlap penalty.
//! - `anneal`: the simulated-annealing driver.
//! - `record`: placement records and the marker-prefixed numeric encoding.
//! - `score`: per-group and total scores.
//! - `task`: optimizer task abstraction and the per-run stagnation context.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API; the CLI
//!   crate is the only consumer.

pub mod anneal;
pub mod configuration;
pub mod energy;
pub mod overlap;
pub mod piece;
pub mod record;
pub mod score;
pub mod shape;
pub mod task;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use nalgebra::Vector2 as Vec2;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::anneal::{anneal, AnnealCfg, AnnealError, AnnealReport, AnnealState, Annealer};
    pub use crate::configuration::{ConfigError, Configuration};
    pub use crate::energy::{energy, Energy, EnergyCfg};
    pub use crate::overlap::{intersection_area, overlapping_pairs, total_overlap};
    pub use crate::piece::{bounds, inverse_transform, transform, Bounds, Piece, Placement, Polygon};
    pub use crate::record::{decode, encode, MarkedValue, PieceId, PlacementRecord, RecordError};
    pub use crate::score::{score, ScoreBoard};
    pub use crate::shape::{BaseShape, ShapeError};
    pub use crate::task::{
        classify_progress, AnnealTask, PackingTask, Progress, RunContext, TaskError, TaskOutcome,
        TaskParams,
    };
    pub use nalgebra::Vector2 as Vec2;
}
