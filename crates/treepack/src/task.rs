//! Optimizer tasks and the per-run context that schedules them.
//!
//! A task maps `(configuration, params)` to `(configuration, diagnostics)`,
//! whether it anneals in-process or drives an external optimizer. Both speak
//! the same progress-line protocol ("Initial score", "New best", "No
//! improvement") so one classifier reads either.
//!
//! Stagnation tracking lives in an explicit `RunContext` owned by the caller,
//! one entry per group size.

use std::collections::BTreeMap;
use std::fmt;

use crate::anneal::{anneal, group_seed, AnnealCfg, AnnealReport};
use crate::configuration::Configuration;
use crate::overlap::total_overlap;
use crate::score::score;

/// Stagnation counter ceiling.
pub const STAGNATION_CAP: u32 = 10;
/// Extra iterations granted per stagnation step.
pub const ITERATIONS_PER_STAGNATION: usize = 2000;

/// Budget for one task invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskParams {
    pub iterations: usize,
    /// Independent restarts (replicas); at least one always runs.
    pub restarts: usize,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            restarts: 16,
        }
    }
}

/// Failure at the task boundary. Always names the group size.
#[derive(Debug)]
pub enum TaskError {
    InvalidInput { group: usize, reason: String },
    Io { group: usize, stage: &'static str, source: std::io::Error },
    Exit { group: usize, status: Option<i32>, diagnostics: String },
    Output { group: usize, reason: String },
}

impl TaskError {
    pub fn group(&self) -> usize {
        match self {
            TaskError::InvalidInput { group, .. }
            | TaskError::Io { group, .. }
            | TaskError::Exit { group, .. }
            | TaskError::Output { group, .. } => *group,
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::InvalidInput { group, reason } => {
                write!(f, "group {group}: invalid input: {reason}")
            }
            TaskError::Io { group, stage, source } => {
                write!(f, "group {group}: i/o failure while {stage}: {source}")
            }
            TaskError::Exit {
                group,
                status,
                diagnostics,
            } => match status {
                Some(code) => write!(f, "group {group}: optimizer exited with {code}: {diagnostics}"),
                None => write!(f, "group {group}: optimizer killed by signal: {diagnostics}"),
            },
            TaskError::Output { group, reason } => {
                write!(f, "group {group}: unreadable optimizer output: {reason}")
            }
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Meaning of one progress line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
    Improved,
    NoImprovement,
    InitialScore(Option<f64>),
}

/// Recognise a progress line. "No improvement" wins over improvement markers.
pub fn classify_progress(line: &str) -> Option<Progress> {
    if line.contains("No improvement") {
        return Some(Progress::NoImprovement);
    }
    if line.contains("IMPROVED") || line.contains("New best") || line.contains("Improvement:") {
        return Some(Progress::Improved);
    }
    if let Some(pos) = line.find("Initial score") {
        let rest = &line[pos + "Initial score".len()..];
        let value = rest
            .trim_start_matches(|c: char| c == ':' || c == '=' || c.is_whitespace())
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse::<f64>().ok());
        return Some(Progress::InitialScore(value));
    }
    None
}

/// What a task said while it ran.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    pub lines: Vec<String>,
    pub initial_score: Option<f64>,
    pub improved: bool,
}

impl Diagnostics {
    /// Improved iff some line reports an improvement and none reports its absence.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let mut initial_score = None;
        let mut improved = false;
        let mut denied = false;
        for line in &lines {
            match classify_progress(line) {
                Some(Progress::Improved) => improved = true,
                Some(Progress::NoImprovement) => denied = true,
                Some(Progress::InitialScore(v)) => initial_score = initial_score.or(v),
                None => {}
            }
        }
        Self {
            lines,
            initial_score,
            improved: improved && !denied,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskOutcome {
    /// The improved configuration, or the input unchanged.
    pub configuration: Configuration,
    pub diagnostics: Diagnostics,
}

/// An optimizer for one group size.
pub trait PackingTask {
    fn name(&self) -> &str;

    fn run(&mut self, config: Configuration, params: &TaskParams)
        -> Result<TaskOutcome, TaskError>;
}

/// In-process annealing with restarts.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnnealTask {
    /// Schedule template; `iterations` and `seed` are set per restart.
    pub cfg: AnnealCfg,
}

impl AnnealTask {
    pub fn new(cfg: AnnealCfg) -> Self {
        Self { cfg }
    }

    fn restart(
        &self,
        config: &Configuration,
        iterations: usize,
        restart: usize,
    ) -> Result<AnnealReport, TaskError> {
        let group = config.len();
        let cfg = AnnealCfg {
            iterations,
            ..self
                .cfg
                .with_seed(group_seed(self.cfg.seed.wrapping_add(restart as u64), group))
        };
        anneal(config.clone(), cfg).map_err(|e| TaskError::InvalidInput {
            group,
            reason: e.to_string(),
        })
    }
}

impl PackingTask for AnnealTask {
    fn name(&self) -> &str {
        "anneal"
    }

    fn run(
        &mut self,
        config: Configuration,
        params: &TaskParams,
    ) -> Result<TaskOutcome, TaskError> {
        let start_score = score(&config);
        let start_valid = total_overlap(&config) == 0.0;
        let mut lines = vec![format!("Initial score: {start_score}")];

        let reports = (0..params.restarts.max(1))
            .map(|restart| self.restart(&config, params.iterations, restart))
            .collect::<Result<Vec<_>, _>>()?;

        let candidate = best_overlap_free(&reports)
            .map(|c| (score(c), c))
            .filter(|(end_score, _)| !start_valid || *end_score < start_score);
        let configuration = match candidate {
            Some((end_score, c)) => {
                lines.push(format!("New best: {end_score} (was {start_score})"));
                c.clone()
            }
            None => {
                let lowest = reports
                    .iter()
                    .min_by(|a, b| a.best_energy.total.total_cmp(&b.best_energy.total));
                if let Some(r) = lowest {
                    lines.push(format!(
                        "No improvement (best {}, overlap {})",
                        score(&r.best),
                        r.best_energy.overlap
                    ));
                }
                config
            }
        };
        Ok(TaskOutcome {
            configuration,
            diagnostics: Diagnostics::from_lines(lines),
        })
    }
}

/// Smallest-score overlap-free configuration across restarts, regardless
/// of which restart reached the lowest energy.
fn best_overlap_free(reports: &[AnnealReport]) -> Option<&Configuration> {
    reports
        .iter()
        .filter_map(|r| r.best_valid.as_ref())
        .min_by(|a, b| score(a).total_cmp(&score(b)))
}

/// Per-run scheduling state across group sizes.
///
/// Groups that keep failing to improve get larger budgets, up to a cap.
#[derive(Clone, Debug)]
pub struct RunContext {
    base: TaskParams,
    stagnation: BTreeMap<usize, u32>,
}

impl RunContext {
    pub fn new(base: TaskParams) -> Self {
        Self {
            base,
            stagnation: BTreeMap::new(),
        }
    }

    pub fn stagnation(&self, group: usize) -> u32 {
        self.stagnation.get(&group).copied().unwrap_or(0)
    }

    /// Base budget scaled by the group's stagnation.
    pub fn params_for(&self, group: usize) -> TaskParams {
        let s = self.stagnation(group);
        TaskParams {
            iterations: self.base.iterations + ITERATIONS_PER_STAGNATION * s as usize,
            restarts: self.base.restarts + (s / 2) as usize,
        }
    }

    /// Reset on improvement, else count up to `STAGNATION_CAP`.
    pub fn record(&mut self, group: usize, improved: bool) -> u32 {
        let s = self.stagnation.entry(group).or_insert(0);
        *s = if improved {
            0
        } else {
            (*s + 1).min(STAGNATION_CAP)
        };
        *s
    }

    /// Run `task` on `config` with this group's budget and record the result.
    pub fn run_task(
        &mut self,
        task: &mut dyn PackingTask,
        config: Configuration,
    ) -> Result<TaskOutcome, TaskError> {
        let group = config.len();
        let params = self.params_for(group);
        tracing::debug!(task = task.name(), group, ?params, "task start");
        let result = task.run(config, &params);
        let improved = matches!(&result, Ok(o) if o.diagnostics.improved);
        self.record(group, improved);
        result
    }
}
