//! Augment modes and the roll sequence each one produces

use crate::augment::{Augment, AugmentType};
use crate::catalog::{AugmentCatalog, WeightBy};
use crate::error::AugmentError;
use crate::sampler::{RollSource, WeightedSampler};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The augment mode chosen in game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AugmentMode {
    #[default]
    Default,
    Defense,
    Skill,
    Slot,
}

impl AugmentMode {
    pub const ALL: [AugmentMode; 4] = [
        AugmentMode::Default,
        AugmentMode::Defense,
        AugmentMode::Skill,
        AugmentMode::Slot,
    ];
}

impl fmt::Display for AugmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AugmentMode::Default => "default",
            AugmentMode::Defense => "defense",
            AugmentMode::Skill => "skill+",
            AugmentMode::Slot => "slot+",
        })
    }
}

impl FromStr for AugmentMode {
    type Err = AugmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(AugmentMode::Default),
            "defense" | "defense+" => Ok(AugmentMode::Defense),
            "skill" | "skill+" => Ok(AugmentMode::Skill),
            "slot" | "slot+" => Ok(AugmentMode::Slot),
            _ => Err(AugmentError::UnknownMode(s.to_string())),
        }
    }
}

// Custom deserializer for case-insensitive matching
impl<'de> Deserialize<'de> for AugmentMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::unknown_variant(&s, &["default", "defense", "skill+", "slot+"])
        })
    }
}

impl Serialize for AugmentMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A candidate augment and the roll budget it consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roll<'a> {
    pub augment: &'a Augment,
    pub rolls: u32,
}

/// Where a simulation is in its roll sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollPhase {
    /// Consuming the mode's forced rolls; holds the next seed index
    Seeding(usize),
    Rolling,
    /// One attempt to spend leftover points
    Filling,
    Done,
}

impl Default for RollPhase {
    fn default() -> Self {
        RollPhase::Seeding(0)
    }
}

#[derive(Debug, Clone)]
enum SeedDraw<'a> {
    Weighted(WeightedSampler<&'a Augment>),
    Fixed(&'a Augment),
}

impl<'a> SeedDraw<'a> {
    fn draw<R: RollSource + ?Sized>(&self, rng: &mut R) -> Option<&'a Augment> {
        match self {
            SeedDraw::Weighted(sampler) => sampler.sample(rng).map(|(&aug, _)| aug),
            SeedDraw::Fixed(aug) => Some(*aug),
        }
    }
}

/// Mode-specific roll generation over one pool.
///
/// All sub-pools are built up front, so a strategy can be shared by every
/// attempt of a batch (and across threads).
#[derive(Debug, Clone)]
pub struct ModeStrategy<'a> {
    mode: AugmentMode,
    catalog: AugmentCatalog<'a>,
    seeds: Vec<SeedDraw<'a>>,
    rolling: WeightedSampler<&'a Augment>,
    /// Defense mode: what an off-category draw is rerolled into
    reroll: Option<WeightedSampler<&'a Augment>>,
}

fn require<'a>(
    mode: AugmentMode,
    pool: &'static str,
    sampler: WeightedSampler<&'a Augment>,
) -> Result<WeightedSampler<&'a Augment>, AugmentError> {
    if sampler.is_drawable() {
        Ok(sampler)
    } else {
        Err(AugmentError::EmptySubPool { mode, pool })
    }
}

fn stat_increase(kind: AugmentType) -> bool {
    matches!(kind, AugmentType::DefenseUp | AugmentType::ResistanceUp(_))
}

impl<'a> ModeStrategy<'a> {
    pub fn new(
        pool: &'a [Augment],
        mode: AugmentMode,
        weight_by: WeightBy,
    ) -> Result<Self, AugmentError> {
        let catalog = AugmentCatalog::partition(pool, weight_by);
        let rolling = require(mode, "default", catalog.default_sampler())?;
        let mut reroll = None;

        let seeds = match mode {
            AugmentMode::Default => vec![
                SeedDraw::Weighted(require(
                    mode,
                    "Defense+/-",
                    catalog.defaults_where(|k| {
                        matches!(k, AugmentType::DefenseUp | AugmentType::DefenseDown)
                    }),
                )?),
                SeedDraw::Weighted(require(
                    mode,
                    "Skill+/-",
                    catalog.defaults_where(AugmentType::is_skill),
                )?),
            ],
            AugmentMode::Defense => {
                reroll = Some(require(
                    mode,
                    "Defense+/res+",
                    catalog.defaults_where(stat_increase),
                )?);
                vec![SeedDraw::Weighted(require(
                    mode,
                    "Defense+",
                    catalog.defaults_where(|k| k == AugmentType::DefenseUp),
                )?)]
            }
            AugmentMode::Skill => {
                let mut seeds = Vec::with_capacity(3);
                // Optional: pools without a Skill- just skip this seed
                if let Some(lower) = catalog.first_of(AugmentType::SkillDown) {
                    seeds.push(SeedDraw::Fixed(lower));
                }
                seeds.push(SeedDraw::Weighted(require(
                    mode,
                    "skill+First",
                    WeightedSampler::uniform(catalog.skill_up_first().to_vec()),
                )?));
                seeds.push(SeedDraw::Weighted(require(
                    mode,
                    "Skill+",
                    catalog.defaults_where(|k| k == AugmentType::SkillUp),
                )?));
                seeds
            }
            AugmentMode::Slot => {
                let first = catalog
                    .slot_up_first()
                    .first()
                    .copied()
                    .ok_or(AugmentError::EmptySubPool {
                        mode,
                        pool: "slot+First",
                    })?;
                vec![
                    SeedDraw::Fixed(first),
                    SeedDraw::Weighted(require(
                        mode,
                        "Slot+",
                        catalog.defaults_where(|k| k == AugmentType::SlotUp),
                    )?),
                ]
            }
        };

        Ok(Self {
            mode,
            catalog,
            seeds,
            rolling,
            reroll,
        })
    }

    pub fn mode(&self) -> AugmentMode {
        self.mode
    }

    pub fn seed_count(&self) -> usize {
        self.seeds.len()
    }

    pub fn catalog(&self) -> &AugmentCatalog<'a> {
        &self.catalog
    }

    /// Next candidate for the roll loop.
    ///
    /// Moves from `Seeding` to `Rolling` once the seeds run out. Returns `None`
    /// in `Filling` and `Done`.
    pub fn next_roll<R: RollSource + ?Sized>(
        &self,
        phase: &mut RollPhase,
        rng: &mut R,
    ) -> Option<Roll<'a>> {
        loop {
            match *phase {
                RollPhase::Seeding(index) => match self.seeds.get(index) {
                    Some(seed) => {
                        *phase = RollPhase::Seeding(index + 1);
                        return seed.draw(rng).map(|augment| Roll { augment, rolls: 1 });
                    }
                    None => *phase = RollPhase::Rolling,
                },
                RollPhase::Rolling => return self.random_roll(rng),
                RollPhase::Filling | RollPhase::Done => return None,
            }
        }
    }

    fn random_roll<R: RollSource + ?Sized>(&self, rng: &mut R) -> Option<Roll<'a>> {
        let (&augment, _) = self.rolling.sample(rng)?;
        let Some(reroll) = &self.reroll else {
            return Some(Roll { augment, rolls: 1 });
        };

        // Defense mode never lowers a stat or touches skills; the reroll costs a roll
        let off_category = augment.kind.is_skill()
            || matches!(
                augment.kind,
                AugmentType::DefenseDown | AugmentType::ResistanceDown(_)
            );
        if off_category {
            let (&augment, _) = reroll.sample(rng)?;
            return Some(Roll { augment, rolls: 2 });
        }
        Some(Roll { augment, rolls: 1 })
    }

    /// The single leftover-point draw. Only answers in `Filling`, then moves to `Done`.
    pub fn fill(&self, phase: &mut RollPhase, remaining_points: u32) -> Option<&'a Augment> {
        if *phase != RollPhase::Filling {
            return None;
        }
        *phase = RollPhase::Done;
        self.catalog.filler_for(remaining_points)
    }
}
