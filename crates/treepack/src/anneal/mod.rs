//! Simulated-annealing driver for one group size.
//!
//! Per iteration
//! - pick one piece uniformly, shift it by uniform `(Δx, Δy, Δθ)` scaled by
//!   the current temperature, and refresh its polygon;
//! - score the whole configuration;
//! - accept if strictly better, else with Metropolis probability;
//! - on rejection restore the exact previous placement;
//! - remember the lowest-energy configuration seen, and separately the
//!   smallest overlap-free one;
//! - cool geometrically, whether or not the move was accepted.
//!
//! The loop is strictly sequential: `step` returns only after the mutation
//! is committed or reverted, so callers may stop between any two steps.
//! The only termination criterion is the iteration budget.

mod accept;
mod types;

pub use accept::acceptance_probability;
pub use types::{group_seed, AnnealCfg, AnnealError, AnnealReport, AnnealState};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::configuration::Configuration;
use crate::energy::{energy, Energy};

/// Run a full anneal with `cfg.iterations` steps.
pub fn anneal(config: Configuration, cfg: AnnealCfg) -> Result<AnnealReport, AnnealError> {
    let mut annealer = Annealer::new(config, cfg)?;
    annealer.run();
    Ok(annealer.finish())
}

/// Owns one configuration for the duration of a run.
pub struct Annealer {
    cfg: AnnealCfg,
    rng: StdRng,
    current: Configuration,
    current_energy: Energy,
    best: Configuration,
    best_energy: Energy,
    /// Smallest-side overlap-free configuration seen, with its side.
    best_valid: Option<(Configuration, f64)>,
    initial_energy: Energy,
    temperature: f64,
    iteration: usize,
    accepted: usize,
    improvements: usize,
}

impl Annealer {
    pub fn new(config: Configuration, cfg: AnnealCfg) -> Result<Self, AnnealError> {
        cfg.validate()?;
        let e0 = energy(&config, cfg.energy);
        Ok(Self {
            cfg,
            rng: StdRng::seed_from_u64(cfg.seed),
            best: config.clone(),
            best_valid: e0.is_overlap_free().then(|| (config.clone(), e0.side)),
            current: config,
            current_energy: e0,
            best_energy: e0,
            initial_energy: e0,
            temperature: cfg.start_temperature,
            iteration: 0,
            accepted: 0,
            improvements: 0,
        })
    }

    pub fn state(&self) -> AnnealState {
        if self.iteration >= self.cfg.iterations {
            AnnealState::Terminated
        } else {
            AnnealState::Running {
                temperature: self.temperature,
                current_energy: self.current_energy.total,
                best_energy: self.best_energy.total,
            }
        }
    }

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[inline]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    #[inline]
    pub fn current(&self) -> &Configuration {
        &self.current
    }

    #[inline]
    pub fn current_energy(&self) -> Energy {
        self.current_energy
    }

    #[inline]
    pub fn best(&self) -> &Configuration {
        &self.best
    }

    #[inline]
    pub fn best_energy(&self) -> Energy {
        self.best_energy
    }

    #[inline]
    pub fn best_valid(&self) -> Option<&Configuration> {
        self.best_valid.as_ref().map(|(c, _)| c)
    }

    /// One perturb → evaluate → accept/reject → cool cycle.
    ///
    /// Returns `None` once the budget is spent, else whether the move was kept.
    pub fn step(&mut self) -> Option<bool> {
        if self.iteration >= self.cfg.iterations {
            return None;
        }
        let t = self.temperature;
        let index = self.rng.gen_range(0..self.current.len());
        let dx = symmetric(&mut self.rng, t * self.cfg.move_factor);
        let dy = symmetric(&mut self.rng, t * self.cfg.move_factor);
        let ddeg = symmetric(&mut self.rng, t * self.cfg.rotate_factor);

        let proposed = self.current.placement(index).shifted(dx, dy, ddeg);
        let previous = self.current.set_placement(index, proposed);
        let candidate = energy(&self.current, self.cfg.energy);

        let accept = candidate.total < self.current_energy.total || {
            let p = acceptance_probability(
                self.current_energy.total,
                candidate.total,
                t,
                self.cfg.min_temperature,
                self.cfg.exponent_cap,
            );
            self.rng.gen::<f64>() < p
        };

        if accept {
            self.current_energy = candidate;
            self.accepted += 1;
            if candidate.total < self.best_energy.total {
                self.best_energy = candidate;
                self.best = self.current.clone();
                self.improvements += 1;
                tracing::debug!(
                    iteration = self.iteration,
                    energy = candidate.total,
                    side = candidate.side,
                    overlap = candidate.overlap,
                    "new best"
                );
            }
            if candidate.is_overlap_free()
                && self.best_valid.as_ref().map_or(true, |(_, side)| candidate.side < *side)
            {
                self.best_valid = Some((self.current.clone(), candidate.side));
            }
        } else {
            self.current.set_placement(index, previous);
        }

        self.temperature *= self.cfg.cooling_rate;
        self.iteration += 1;
        Some(accept)
    }

    /// Step until the budget is spent.
    pub fn run(&mut self) {
        while self.step().is_some() {}
    }

    pub fn finish(self) -> AnnealReport {
        tracing::debug!(
            n = self.current.len(),
            iterations = self.iteration,
            accepted = self.accepted,
            improvements = self.improvements,
            initial = self.initial_energy.total,
            best = self.best_energy.total,
            "anneal finished"
        );
        AnnealReport {
            best: self.best,
            best_energy: self.best_energy,
            best_valid: self.best_valid.map(|(c, _)| c),
            initial_energy: self.initial_energy,
            final_energy: self.current_energy,
            final_temperature: self.temperature,
            iterations: self.iteration,
            accepted: self.accepted,
            improvements: self.improvements,
        }
    }
}

/// Uniform draw from `[−scale, scale]`; 0 when the scale has vanished.
#[inline]
fn symmetric<R: Rng>(rng: &mut R, scale: f64) -> f64 {
    if scale > 0.0 {
        rng.gen_range(-scale..=scale)
    } else {
        0.0
    }
}
