//! Random sources and cumulative-weight selection used by every roll

/// Source of uniform integers for the augment simulator.
///
/// Everything random in a simulation funnels through this one call, so a
/// seeded [`FastRng`] or a [`ScriptedRolls`] replay reproduces a run exactly.
pub trait RollSource {
    /// Uniform integer in `0..bound`. Callers never pass a zero bound.
    fn below(&mut self, bound: u64) -> u64;
}

impl<R: RollSource + ?Sized> RollSource for &mut R {
    #[inline(always)]
    fn below(&mut self, bound: u64) -> u64 {
        (**self).below(bound)
    }
}

/// Fast RNG wrapper for better performance
#[derive(Clone)]
pub struct FastRng {
    inner: fastrand::Rng,
}

impl FastRng {
    #[inline(always)]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: fastrand::Rng::with_seed(seed),
        }
    }

    /// Seed from the thread-local entropy source
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }
}

impl RollSource for FastRng {
    #[inline(always)]
    fn below(&mut self, bound: u64) -> u64 {
        self.inner.u64(0..bound)
    }
}

/// Replays a fixed sequence of draws, each reduced modulo the requested bound.
///
/// Wraps around when the script runs out. Used to pin down an exact roll
/// sequence when reproducing a reported result.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    script: Vec<u64>,
    cursor: usize,
}

impl ScriptedRolls {
    pub fn new(script: Vec<u64>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Number of draws consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RollSource for ScriptedRolls {
    fn below(&mut self, bound: u64) -> u64 {
        if self.script.is_empty() {
            return 0;
        }
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        value % bound
    }
}

/// Weighted selection over a fixed list.
///
/// The cumulative table is built once when the sampler is constructed. Each
/// item owns the half-open range `[ends[i-1], ends[i])` of the total weight; a
/// zero-weight item owns an empty range and can never be drawn.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    items: Vec<T>,
    ends: Vec<u64>,
}

impl<T> WeightedSampler<T> {
    /// Build from items and a weight extractor (point cost, explicit weight, ...)
    pub fn new<F>(items: Vec<T>, weight: F) -> Self
    where
        F: Fn(&T) -> u32,
    {
        let mut running = 0u64;
        let ends = items
            .iter()
            .map(|item| {
                running += u64::from(weight(item));
                running
            })
            .collect();
        Self { items, ends }
    }

    /// Every item equally likely
    pub fn uniform(items: Vec<T>) -> Self {
        Self::new(items, |_| 1)
    }

    pub fn total_weight(&self) -> u64 {
        self.ends.last().copied().unwrap_or(0)
    }

    /// False when nothing can be drawn (no items, or all weights zero)
    pub fn is_drawable(&self) -> bool {
        self.total_weight() > 0
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Draw one item and its index. `None` when nothing is drawable.
    pub fn sample<R: RollSource + ?Sized>(&self, rng: &mut R) -> Option<(&T, usize)> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let ptr = rng.below(total);
        // First range whose exclusive end lies past the pointer
        let index = self.ends.partition_point(|&end| end <= ptr);
        self.items.get(index).map(|item| (item, index))
    }
}
