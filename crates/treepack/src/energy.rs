//! Energy: bounding-square side² plus a weighted overlap penalty.
//!
//! The penalty weight is large enough that any real overlap outweighs any
//! achievable area gain, but finite so that shrinking overlap still lowers
//! the energy step by step.

use crate::configuration::Configuration;
use crate::overlap::total_overlap;

/// Default overlap penalty weight W.
pub const DEFAULT_PENALTY_WEIGHT: f64 = 10_000.0;

#[derive(Clone, Copy, Debug)]
pub struct EnergyCfg {
    pub penalty_weight: f64,
}

impl Default for EnergyCfg {
    fn default() -> Self {
        Self {
            penalty_weight: DEFAULT_PENALTY_WEIGHT,
        }
    }
}

/// Energy breakdown for one configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Energy {
    pub side: f64,
    pub overlap: f64,
    pub total: f64,
}

impl Energy {
    #[inline]
    pub fn combine(side: f64, overlap: f64, cfg: EnergyCfg) -> Self {
        Self {
            side,
            overlap,
            total: side * side + cfg.penalty_weight * overlap,
        }
    }

    #[inline]
    pub fn is_overlap_free(&self) -> bool {
        self.overlap == 0.0
    }
}

/// `side² + W · total_overlap`.
pub fn energy(config: &Configuration, cfg: EnergyCfg) -> Energy {
    Energy::combine(config.side(), total_overlap(config), cfg)
}
