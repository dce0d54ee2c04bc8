//! Monte Carlo batches: repeat one augment request and tally the matches

use crate::armor::{ArmorPiece, SkillCatalog};
use crate::augment::Augment;
use crate::catalog::WeightBy;
use crate::criteria::{check_feasibility, matches_criteria, Criteria};
use crate::error::AugmentError;
use crate::mode::{AugmentMode, ModeStrategy};
use crate::sampler::{FastRng, RollSource};
use crate::simulation::{run_with_strategy, SimulationResult};
use crate::stats::BatchSummary;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How long a batch runs and how much it keeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Attempt cap for the whole batch
    pub attempts: u64,
    /// Attempts per resumable step
    pub slice: u64,
    /// Matching results kept verbatim
    pub samples: usize,
    /// Fixed seed for a reproducible batch; entropy when absent
    pub seed: Option<u64>,
    pub weight_by: WeightBy,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            attempts: 100_000,
            slice: 100,
            samples: 10,
            seed: None,
            weight_by: WeightBy::Cost,
        }
    }
}

impl BatchSettings {
    pub fn validate(&self) -> Result<(), AugmentError> {
        if self.attempts == 0 {
            return Err(AugmentError::InvalidSettings("attempts must be positive".into()));
        }
        if self.slice == 0 {
            return Err(AugmentError::InvalidSettings("slice must be positive".into()));
        }
        Ok(())
    }
}

/// Everything one simulation needs besides its random source
#[derive(Debug, Clone, Copy)]
pub struct AugmentRequest<'a> {
    pub armor: &'a ArmorPiece,
    pub pool: &'a [Augment],
    pub skills: &'a SkillCatalog,
    pub budget: u32,
    pub mode: AugmentMode,
}

impl<'a> AugmentRequest<'a> {
    /// Reject the request before any roll: bad inputs, infeasible criteria or
    /// a mode whose sub-pools cannot be drawn from.
    pub fn prepare(
        &self,
        criteria: &Criteria,
        weight_by: WeightBy,
    ) -> Result<ModeStrategy<'a>, AugmentError> {
        self.armor.validate(self.skills)?;
        criteria.validate(self.skills)?;
        check_feasibility(self.armor, criteria, self.mode)?;
        ModeStrategy::new(self.pool, self.mode, weight_by)
    }
}

/// Cooperative stop flag shared with whoever drives the batch
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Running totals after a completed slice.
///
/// `new_samples` only holds what this slice retained; the running set is
/// [`BatchSimulator::samples`], with `sample_count` entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub attempts: u64,
    pub matches: u64,
    /// Samples retained so far, this slice included
    pub sample_count: usize,
    /// Matches retained during this slice
    pub new_samples: Vec<SimulationResult>,
}

/// Resumable batch. Each call to `next` runs one slice and commits its tallies.
pub struct BatchSimulator<'a, R = FastRng> {
    request: AugmentRequest<'a>,
    criteria: &'a Criteria,
    strategy: ModeStrategy<'a>,
    settings: BatchSettings,
    rng: R,
    attempts: u64,
    matches: u64,
    samples: Vec<SimulationResult>,
    cancel: CancelToken,
}

impl<'a> BatchSimulator<'a, FastRng> {
    /// Seeded from `settings.seed`, or from entropy when none is set
    pub fn new(
        request: AugmentRequest<'a>,
        criteria: &'a Criteria,
        settings: BatchSettings,
    ) -> Result<Self, AugmentError> {
        let rng = settings.seed.map_or_else(FastRng::from_entropy, FastRng::new);
        Self::with_rng(request, criteria, settings, rng)
    }
}

impl<'a, R: RollSource> BatchSimulator<'a, R> {
    pub fn with_rng(
        request: AugmentRequest<'a>,
        criteria: &'a Criteria,
        settings: BatchSettings,
        rng: R,
    ) -> Result<Self, AugmentError> {
        settings.validate()?;
        let strategy = request.prepare(criteria, settings.weight_by)?;
        info!(
            "batch: {} on {} (budget {}, up to {} attempts)",
            request.mode, request.armor.name, request.budget, settings.attempts
        );
        Ok(Self {
            request,
            criteria,
            strategy,
            samples: Vec::with_capacity(settings.samples),
            settings,
            rng,
            attempts: 0,
            matches: 0,
            cancel: CancelToken::new(),
        })
    }

    /// Token that stops the batch before its next slice
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drop all tallies and start a new logical batch with the same inputs
    pub fn restart(&mut self) {
        debug!("batch restarted after {} attempts", self.attempts);
        self.attempts = 0;
        self.matches = 0;
        self.samples.clear();
        self.cancel.reset();
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn matches(&self) -> u64 {
        self.matches
    }

    pub fn samples(&self) -> &[SimulationResult] {
        &self.samples
    }

    pub fn is_finished(&self) -> bool {
        self.attempts >= self.settings.attempts || self.cancel.is_cancelled()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            attempts: self.attempts,
            matches: self.matches,
            samples: self.samples.clone(),
            cancelled: self.cancel.is_cancelled(),
        }
    }

    /// Drive every remaining slice
    pub fn run_to_end(&mut self) -> BatchSummary {
        while self.next().is_some() {}
        let summary = self.summary();
        info!(
            "batch finished: {} / {} matched ({:.4}%)",
            summary.matches,
            summary.attempts,
            summary.success_rate() * 100.0
        );
        summary
    }

    fn run_slice(&mut self, count: u64) -> BatchProgress {
        let mut matches = 0;
        let mut new_samples = Vec::new();
        let room = self.settings.samples.saturating_sub(self.samples.len());

        for _ in 0..count {
            let result = run_with_strategy(
                self.request.armor,
                &self.strategy,
                self.request.budget,
                self.request.skills,
                &mut self.rng,
            );
            if matches_criteria(self.request.armor, &result, self.criteria) {
                matches += 1;
                if new_samples.len() < room {
                    new_samples.push(result);
                }
            }
        }

        // Commit only once the whole slice has run
        self.attempts += count;
        self.matches += matches;
        self.samples.extend(new_samples.iter().cloned());
        BatchProgress {
            attempts: self.attempts,
            matches: self.matches,
            sample_count: self.samples.len(),
            new_samples,
        }
    }
}

impl<'a, R: RollSource> Iterator for BatchSimulator<'a, R> {
    type Item = BatchProgress;

    fn next(&mut self) -> Option<BatchProgress> {
        if self.cancel.is_cancelled() {
            debug!("batch cancelled at {} attempts", self.attempts);
            return None;
        }
        let left = self.settings.attempts.saturating_sub(self.attempts);
        if left == 0 {
            return None;
        }
        Some(self.run_slice(left.min(self.settings.slice)))
    }
}

/// Start a resumable batch with the given attempt cap and slice size
pub fn run_batch<'a>(
    request: AugmentRequest<'a>,
    criteria: &'a Criteria,
    attempt_cap: u64,
    slice_size: u64,
) -> Result<BatchSimulator<'a>, AugmentError> {
    let settings = BatchSettings {
        attempts: attempt_cap,
        slice: slice_size,
        ..BatchSettings::default()
    };
    BatchSimulator::new(request, criteria, settings)
}

/// Run a whole batch across the rayon pool.
///
/// Attempt `i` is seeded with `seed + i`, and samples are the first matches by
/// attempt index, so a seeded batch gives the same summary on any thread count.
/// Cancellation is checked between chunks of attempts.
pub fn run_batch_parallel(
    request: AugmentRequest<'_>,
    criteria: &Criteria,
    settings: &BatchSettings,
    cancel: &CancelToken,
) -> Result<BatchSummary, AugmentError> {
    settings.validate()?;
    let strategy = request.prepare(criteria, settings.weight_by)?;
    let base_seed = settings.seed.unwrap_or_else(rand::random::<u64>);
    let chunk = settings
        .slice
        .saturating_mul(rayon::current_num_threads() as u64);
    info!(
        "parallel batch: {} on {} (budget {}, {} attempts, chunks of {})",
        request.mode, request.armor.name, request.budget, settings.attempts, chunk
    );

    let mut summary = BatchSummary {
        attempts: 0,
        matches: 0,
        samples: Vec::with_capacity(settings.samples),
        cancelled: false,
    };

    while summary.attempts < settings.attempts {
        if cancel.is_cancelled() {
            debug!("parallel batch cancelled at {} attempts", summary.attempts);
            summary.cancelled = true;
            break;
        }
        let start = summary.attempts;
        let end = settings.attempts.min(start.saturating_add(chunk));

        let outcomes: Vec<Option<SimulationResult>> = (start..end)
            .into_par_iter()
            .map(|i| {
                let mut rng = FastRng::new(base_seed.wrapping_add(i));
                let result = run_with_strategy(
                    request.armor,
                    &strategy,
                    request.budget,
                    request.skills,
                    &mut rng,
                );
                matches_criteria(request.armor, &result, criteria).then_some(result)
            })
            .collect();

        summary.attempts = end;
        for result in outcomes.into_iter().flatten() {
            summary.matches += 1;
            if summary.samples.len() < settings.samples {
                summary.samples.push(result);
            }
        }
    }

    info!(
        "parallel batch finished: {} / {} matched",
        summary.matches, summary.attempts
    );
    Ok(summary)
}
