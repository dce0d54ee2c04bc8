//! Partitioning an augment pool into its class-specific sub-pools

use crate::augment::{Augment, AugmentClass, AugmentType};
use crate::sampler::WeightedSampler;
use serde::{Deserialize, Serialize};

/// Which numeric field weights a draw.
///
/// Pool data has been published with the point cost doubling as the draw
/// weight and, later, with an explicit weight column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightBy {
    #[default]
    Cost,
    Weight,
}

impl WeightBy {
    pub fn weight(self, augment: &Augment) -> u32 {
        match self {
            WeightBy::Cost => augment.cost,
            WeightBy::Weight => augment.weight,
        }
    }
}

/// One pool split by class, built once per strategy
#[derive(Debug, Clone)]
pub struct AugmentCatalog<'a> {
    pool: &'a [Augment],
    defaults: Vec<&'a Augment>,
    /// Sorted by descending cost; ties keep pool order
    fillers: Vec<&'a Augment>,
    skill_up_first: Vec<&'a Augment>,
    slot_up_first: Vec<&'a Augment>,
    weight_by: WeightBy,
}

impl<'a> AugmentCatalog<'a> {
    pub fn partition(pool: &'a [Augment], weight_by: WeightBy) -> Self {
        let of_class = move |class: AugmentClass| -> Vec<&'a Augment> {
            pool.iter().filter(|aug| aug.class == class).collect()
        };

        let mut fillers = of_class(AugmentClass::LastFiller);
        fillers.sort_by(|a, b| b.cost.cmp(&a.cost));

        Self {
            pool,
            defaults: of_class(AugmentClass::Default),
            fillers,
            skill_up_first: of_class(AugmentClass::SkillUpFirst),
            slot_up_first: of_class(AugmentClass::SlotUpFirst),
            weight_by,
        }
    }

    pub fn defaults(&self) -> &[&'a Augment] {
        &self.defaults
    }

    pub fn fillers(&self) -> &[&'a Augment] {
        &self.fillers
    }

    pub fn skill_up_first(&self) -> &[&'a Augment] {
        &self.skill_up_first
    }

    pub fn slot_up_first(&self) -> &[&'a Augment] {
        &self.slot_up_first
    }

    /// First augment of a type anywhere in the pool
    pub fn first_of(&self, kind: AugmentType) -> Option<&'a Augment> {
        self.pool.iter().find(|aug| aug.kind == kind)
    }

    /// Weighted sampler over the whole `default` class
    pub fn default_sampler(&self) -> WeightedSampler<&'a Augment> {
        self.defaults_where(|_| true)
    }

    /// Weighted sampler over the `default` class restricted by type
    pub fn defaults_where<P>(&self, keep: P) -> WeightedSampler<&'a Augment>
    where
        P: Fn(AugmentType) -> bool,
    {
        let weight_by = self.weight_by;
        let items = self
            .defaults
            .iter()
            .copied()
            .filter(|aug| keep(aug.kind))
            .collect();
        WeightedSampler::new(items, move |aug: &&Augment| weight_by.weight(aug))
    }

    /// Most expensive filler that still fits the remaining points (greedy)
    pub fn filler_for(&self, remaining_points: u32) -> Option<&'a Augment> {
        self.fillers
            .iter()
            .copied()
            .find(|aug| aug.cost <= remaining_points)
    }
}
