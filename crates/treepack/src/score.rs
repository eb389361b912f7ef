//! Per-group and total scores.
//!
//! Score(N) = side² / N, always recomputed from placements. Small groups weigh
//! the most per piece, so reports list the worst groups first.

use std::collections::BTreeMap;

use crate::configuration::Configuration;
use crate::overlap::overlapping_pairs;

/// Largest group size in a complete submission.
pub const MAX_GROUP: usize = 200;

/// `side² / N`.
pub fn score(config: &Configuration) -> f64 {
    let side = config.side();
    side * side / config.len() as f64
}

/// One group's row in a `ScoreBoard`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupScore {
    pub group: usize,
    pub side: f64,
    pub score: f64,
    /// Number of overlapping piece pairs (0 for a valid group).
    pub overlapping_pairs: usize,
}

/// Scores for a set of groups.
#[derive(Clone, Debug, Default)]
pub struct ScoreBoard {
    groups: BTreeMap<usize, GroupScore>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score `config` and file it under its group size.
    pub fn insert(&mut self, config: &Configuration) -> GroupScore {
        let row = GroupScore {
            group: config.len(),
            side: config.side(),
            score: score(config),
            overlapping_pairs: overlapping_pairs(config).len(),
        };
        self.groups.insert(row.group, row);
        row
    }

    pub fn get(&self, group: usize) -> Option<&GroupScore> {
        self.groups.get(&group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of Score(N) over all scored groups.
    pub fn total(&self) -> f64 {
        self.groups.values().map(|g| g.score).sum()
    }

    /// Group sizes in `1..=MAX_GROUP` without a score.
    pub fn missing(&self) -> Vec<usize> {
        (1..=MAX_GROUP)
            .filter(|n| !self.groups.contains_key(n))
            .collect()
    }

    /// The `k` highest scores, worst first.
    pub fn worst(&self, k: usize) -> Vec<GroupScore> {
        let mut rows: Vec<GroupScore> = self.groups.values().copied().collect();
        rows.sort_by(|a, b| b.score.total_cmp(&a.score));
        rows.truncate(k);
        rows
    }

    /// Groups that still contain overlapping pieces.
    pub fn overlapping(&self) -> Vec<usize> {
        self.groups
            .values()
            .filter(|g| g.overlapping_pairs > 0)
            .map(|g| g.group)
            .collect()
    }
}
