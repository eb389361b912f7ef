//! Annealing configuration, state, and report types.

use std::fmt;

use crate::configuration::Configuration;
use crate::energy::{Energy, EnergyCfg};

/// Parameter problems caught before a run starts.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnealError {
    InvalidParams { reason: String },
}

impl AnnealError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AnnealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams { reason } => write!(f, "invalid anneal params: {reason}"),
        }
    }
}

impl std::error::Error for AnnealError {}

/// Annealing schedule and move sizes.
///
/// Move scales are linear in temperature:
/// `move_scale = T · move_factor`, `rot_scale = T · rotate_factor` (degrees).
#[derive(Clone, Copy, Debug)]
pub struct AnnealCfg {
    /// Iteration budget; the only termination criterion.
    pub iterations: usize,
    pub start_temperature: f64,
    /// Geometric cooling per iteration, in (0, 1).
    pub cooling_rate: f64,
    pub move_factor: f64,
    pub rotate_factor: f64,
    /// ε: acceptance divides by `max(T, ε)`.
    pub min_temperature: f64,
    /// Exponents above this saturate to certain acceptance.
    pub exponent_cap: f64,
    pub energy: EnergyCfg,
    pub seed: u64,
}

impl Default for AnnealCfg {
    fn default() -> Self {
        Self {
            iterations: 1000,
            start_temperature: 1.0,
            cooling_rate: 0.99,
            move_factor: 2.0,
            rotate_factor: 180.0,
            min_temperature: 1e-5,
            exponent_cap: 700.0,
            energy: EnergyCfg::default(),
            seed: 0,
        }
    }
}

impl AnnealCfg {
    pub fn validate(&self) -> Result<(), AnnealError> {
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(AnnealError::invalid(format!(
                "cooling_rate must be in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if !(self.start_temperature.is_finite() && self.start_temperature > 0.0) {
            return Err(AnnealError::invalid(format!(
                "start_temperature must be finite and > 0, got {}",
                self.start_temperature
            )));
        }
        if !(self.move_factor.is_finite() && self.move_factor >= 0.0)
            || !(self.rotate_factor.is_finite() && self.rotate_factor >= 0.0)
        {
            return Err(AnnealError::invalid("move/rotate factors must be finite and >= 0"));
        }
        if !(self.min_temperature > 0.0) {
            return Err(AnnealError::invalid("min_temperature must be > 0"));
        }
        let w = self.energy.penalty_weight;
        if !(w.is_finite() && w >= 0.0) {
            return Err(AnnealError::invalid(format!(
                "penalty_weight must be finite and >= 0, got {w}"
            )));
        }
        Ok(())
    }

    /// Copy with a different RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Driver state machine: `Running` until the budget is spent, then `Terminated`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnnealState {
    Running {
        temperature: f64,
        current_energy: f64,
        best_energy: f64,
    },
    Terminated,
}

/// Result of a finished run.
#[derive(Clone, Debug)]
pub struct AnnealReport {
    /// Lowest-energy configuration seen (may differ from the final one).
    pub best: Configuration,
    pub best_energy: Energy,
    /// Smallest overlap-free configuration seen, if any. Under a finite
    /// penalty weight this can differ from `best`, which may still overlap.
    pub best_valid: Option<Configuration>,
    pub initial_energy: Energy,
    pub final_energy: Energy,
    pub final_temperature: f64,
    pub iterations: usize,
    pub accepted: usize,
    pub improvements: usize,
}

/// Derive a per-group seed from a run seed (SplitMix64-style mixing).
pub fn group_seed(seed: u64, group: usize) -> u64 {
    fn mix(mut x: u64) -> u64 {
        x ^= x >> 30;
        x = x.wrapping_mul(0xbf58476d1ce4e5b9);
        x ^= x >> 27;
        x = x.wrapping_mul(0x94d049bb133111eb);
        x ^ (x >> 31)
    }
    mix(seed ^ mix((group as u64).wrapping_add(0x9e3779b97f4a7c15)))
}
