//! The N pieces of one group size.
//!
//! A configuration is created from a deterministic grid seed or from persisted
//! placements, mutated one piece at a time by the annealer, and read by the
//! encoder. Configurations for different N share nothing mutable; the base
//! shape is behind an `Arc` so workers can hold their own copies.

use std::fmt;
use std::sync::Arc;

use crate::piece::{Bounds, Piece, Placement};
use crate::shape::BaseShape;

/// Default grid spacing for seeds. Wider and taller than one tree.
pub const DEFAULT_GRID_SPACING: f64 = 1.5;

/// Structurally invalid configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// N = 0 has no valid configuration.
    Empty,
    PieceCount { expected: usize, found: usize },
    BadSpacing { spacing: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Empty => write!(f, "a configuration needs at least one piece"),
            ConfigError::PieceCount { expected, found } => {
                write!(f, "expected {expected} pieces, found {found}")
            }
            ConfigError::BadSpacing { spacing } => {
                write!(f, "grid spacing must be finite and > 0, got {spacing}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Ordered collection of exactly N pieces.
#[derive(Clone, Debug)]
pub struct Configuration {
    shape: Arc<BaseShape>,
    pieces: Vec<Piece>,
}

impl Configuration {
    /// Build from explicit placements (index order is kept).
    pub fn from_placements(
        shape: Arc<BaseShape>,
        placements: &[Placement],
    ) -> Result<Self, ConfigError> {
        if placements.is_empty() {
            return Err(ConfigError::Empty);
        }
        let pieces = placements.iter().map(|&p| Piece::new(&shape, p)).collect();
        Ok(Self { shape, pieces })
    }

    /// Like `from_placements`, but the caller states N up front.
    pub fn with_group_size(
        shape: Arc<BaseShape>,
        n: usize,
        placements: &[Placement],
    ) -> Result<Self, ConfigError> {
        if placements.len() != n {
            return Err(ConfigError::PieceCount {
                expected: n,
                found: placements.len(),
            });
        }
        Self::from_placements(shape, placements)
    }

    /// Row-major square grid, `ceil(sqrt(n))` columns, no rotation.
    pub fn grid(shape: Arc<BaseShape>, n: usize, spacing: f64) -> Result<Self, ConfigError> {
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(ConfigError::BadSpacing { spacing });
        }
        let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
        let placements: Vec<Placement> = (0..n)
            .map(|i| {
                let (r, c) = (i / cols, i % cols);
                Placement::new(c as f64 * spacing, r as f64 * spacing, 0.0)
            })
            .collect();
        Self::from_placements(shape, &placements)
    }

    /// Group size N.
    #[inline]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Always false: construction rejects N = 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    #[inline]
    pub fn shape(&self) -> &Arc<BaseShape> {
        &self.shape
    }

    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    #[inline]
    pub fn placement(&self, index: usize) -> Placement {
        self.pieces[index].placement()
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.pieces.iter().map(Piece::placement).collect()
    }

    /// Move piece `index` and refresh its polygon; returns the old placement.
    ///
    /// Panics if `index >= len()`.
    pub fn set_placement(&mut self, index: usize, placement: Placement) -> Placement {
        self.pieces[index].place(&self.shape, placement)
    }

    /// Bounding box of all transformed polygons.
    pub fn bounds(&self) -> Bounds {
        self.pieces
            .iter()
            .fold(Bounds::EMPTY, |b, p| b.union(&p.polygon().bounds()))
    }

    /// Bounding square side: `max(width, height)` of `bounds()`.
    #[inline]
    pub fn side(&self) -> f64 {
        self.bounds().side()
    }

    /// Score(N) = side² / N.
    #[inline]
    pub fn score(&self) -> f64 {
        crate::score::score(self)
    }
}
