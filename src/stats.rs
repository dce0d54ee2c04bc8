//! Batch tallies and the confidence-based retry estimate

use crate::simulation::SimulationResult;
use serde::Serialize;

/// Cumulative success probabilities the estimate is reported for
pub const CONFIDENCE_TARGETS: [f64; 3] = [0.50, 0.75, 0.95];

/// Attempts needed to reach `target` cumulative success probability given an
/// observed per-attempt `success_rate`.
///
/// `None` means no viable estimate: nothing has matched yet, or the target is
/// not a probability strictly between 0 and 1.
pub fn rolls_needed(success_rate: f64, target: f64) -> Option<u64> {
    if !(target > 0.0 && target < 1.0) || !(success_rate > 0.0) {
        return None;
    }
    if success_rate >= 1.0 {
        return Some(1);
    }
    let rolls = ((1.0 - target).ln() / (1.0 - success_rate).ln()).ceil();
    Some((rolls as u64).max(1))
}

/// One line of the retry estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollEstimate {
    pub target: f64,
    pub rolls: Option<u64>,
}

impl RollEstimate {
    /// Worth showing only while the observed rate is below the target
    pub fn is_informative(&self, success_rate: f64) -> bool {
        success_rate < self.target
    }
}

/// Snapshot of a batch: tallies plus the retained matching results
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub attempts: u64,
    pub matches: u64,
    pub samples: Vec<SimulationResult>,
    pub cancelled: bool,
}

impl BatchSummary {
    /// `matches / attempts`, 0 before the first attempt
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.matches as f64 / self.attempts as f64
        }
    }

    pub fn roll_estimates(&self) -> Vec<RollEstimate> {
        let rate = self.success_rate();
        CONFIDENCE_TARGETS
            .iter()
            .map(|&target| RollEstimate {
                target,
                rolls: rolls_needed(rate, target),
            })
            .collect()
    }
}
