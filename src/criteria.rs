//! Acceptance criteria: the static feasibility check and the per-result match

use crate::armor::{ArmorPiece, Element, SkillCatalog, Stat, MAX_SKILLS, MAX_SLOT_LEVEL, SLOT_COUNT};
use crate::error::AugmentError;
use crate::mode::AugmentMode;
use crate::simulation::{SimulationResult, MAX_AUGMENTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Slot levels a single Slot+ can add in the best case
const SLOT_LEVELS_PER_AUGMENT: u32 = 3;

/// What the user wants from one defense-like stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResistanceDirective {
    #[default]
    Any,
    Increase,
    Maintain,
    Decrease,
}

impl ResistanceDirective {
    pub fn accepts(self, base: i32, result: i32) -> bool {
        match self {
            ResistanceDirective::Any => true,
            ResistanceDirective::Increase => result >= base,
            ResistanceDirective::Maintain => result == base,
            ResistanceDirective::Decrease => result <= base,
        }
    }
}

/// One directive per stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatDirectives {
    pub defense: ResistanceDirective,
    pub fire_res: ResistanceDirective,
    pub water_res: ResistanceDirective,
    pub thunder_res: ResistanceDirective,
    pub ice_res: ResistanceDirective,
    pub dragon_res: ResistanceDirective,
}

impl StatDirectives {
    pub fn get(&self, stat: Stat) -> ResistanceDirective {
        match stat {
            Stat::Defense => self.defense,
            Stat::Resistance(Element::Fire) => self.fire_res,
            Stat::Resistance(Element::Water) => self.water_res,
            Stat::Resistance(Element::Thunder) => self.thunder_res,
            Stat::Resistance(Element::Ice) => self.ice_res,
            Stat::Resistance(Element::Dragon) => self.dragon_res,
        }
    }

    pub fn set(&mut self, stat: Stat, directive: ResistanceDirective) {
        let slot = match stat {
            Stat::Defense => &mut self.defense,
            Stat::Resistance(Element::Fire) => &mut self.fire_res,
            Stat::Resistance(Element::Water) => &mut self.water_res,
            Stat::Resistance(Element::Thunder) => &mut self.thunder_res,
            Stat::Resistance(Element::Ice) => &mut self.ice_res,
            Stat::Resistance(Element::Dragon) => &mut self.dragon_res,
        };
        *slot = directive;
    }

    /// First stat asked to go down, in display order
    pub fn first_decrease(&self) -> Option<Stat> {
        Stat::ALL
            .into_iter()
            .find(|&stat| self.get(stat) == ResistanceDirective::Decrease)
    }
}

/// Inclusive range of acceptable levels for one skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRange {
    pub name: String,
    pub min: u8,
    pub max: u8,
}

impl SkillRange {
    pub fn contains(&self, level: u8) -> bool {
        (self.min..=self.max).contains(&level)
    }

    /// Levels the piece must move to land inside the range
    pub fn distance_from(&self, level: u8) -> u32 {
        if level < self.min {
            u32::from(self.min - level)
        } else if level > self.max {
            u32::from(level - self.max)
        } else {
            0
        }
    }
}

/// What a user will accept from an augmented piece
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(default)]
    pub resistances: StatDirectives,
    /// Minimum increase of the total slot level
    #[serde(default)]
    pub slot_increase: u8,
    #[serde(default)]
    pub skills: Vec<SkillRange>,
}

impl Criteria {
    /// Accept-anything criteria for a freshly selected piece: each skill it
    /// already has may end anywhere in `0..=max_level`.
    pub fn permissive_for(armor: &ArmorPiece, catalog: &SkillCatalog) -> Self {
        let skills = armor
            .skills
            .iter()
            .map(|(name, &level)| SkillRange {
                name: name.clone(),
                min: 0,
                max: catalog.get(name).map_or(level, |skill| skill.max_level),
            })
            .collect();
        Self {
            skills,
            ..Self::default()
        }
    }

    /// Reject ranges that name unknown skills or cannot be satisfied at all
    pub fn validate(&self, catalog: &SkillCatalog) -> Result<(), AugmentError> {
        for range in &self.skills {
            let skill = catalog
                .get(&range.name)
                .ok_or_else(|| AugmentError::UnknownSkill(range.name.clone()))?;
            if range.min > range.max || range.max > skill.max_level {
                return Err(AugmentError::InvalidSkillRange {
                    name: range.name.clone(),
                    min: range.min,
                    max: range.max,
                    max_level: skill.max_level,
                });
            }
        }
        Ok(())
    }

    /// Post-hoc match of an augmented piece against its base
    pub fn accepts(&self, base: &ArmorPiece, augmented: &ArmorPiece) -> bool {
        let target_slots = base.slots.total() + u32::from(self.slot_increase);
        if augmented.slots.total() < target_slots {
            return false;
        }

        let stats_ok = Stat::ALL.into_iter().all(|stat| {
            self.resistances
                .get(stat)
                .accepts(base.stat(stat), augmented.stat(stat))
        });
        if !stats_ok {
            return false;
        }

        self.skills
            .iter()
            .all(|range| range.contains(augmented.skill_level(&range.name)))
    }
}

/// Why a set of criteria can never be met
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Infeasible {
    #[error("Too many required changes (slots & skill increases): {required} > {max}")]
    TooManyRequiredChanges { required: u32, max: usize },

    #[error("Too many required skills for this armor ({required} / {max})")]
    TooManySkills { required: usize, max: usize },

    #[error("Slot target +{requested} is beyond the +{available} this armor can still gain")]
    SlotTargetUnreachable { requested: u8, available: u32 },

    #[error("{0} will not decrease with Defense+ augments")]
    DefenseModeDecrease(Stat),

    #[error("Armor skills will never change with Defense+ augments")]
    DefenseModeSkillChange,
}

/// Skill levels that must move before every range can be satisfied
pub fn required_skill_changes(armor: &ArmorPiece, criteria: &Criteria) -> u32 {
    criteria
        .skills
        .iter()
        .map(|range| range.distance_from(armor.skill_level(&range.name)))
        .sum()
}

/// Fewest Slot+ augments that could reach the requested slot increase
pub fn required_slot_augments(criteria: &Criteria) -> u32 {
    u32::from(criteria.slot_increase).div_ceil(SLOT_LEVELS_PER_AUGMENT)
}

/// Static pre-check run once before a batch. No randomness.
pub fn check_feasibility(
    armor: &ArmorPiece,
    criteria: &Criteria,
    mode: AugmentMode,
) -> Result<(), Infeasible> {
    let skill_changes = required_skill_changes(armor, criteria);

    if mode == AugmentMode::Defense {
        if let Some(stat) = criteria.resistances.first_decrease() {
            return Err(Infeasible::DefenseModeDecrease(stat));
        }
        if skill_changes > 0 {
            return Err(Infeasible::DefenseModeSkillChange);
        }
    }

    let required = skill_changes + required_slot_augments(criteria);
    if required > MAX_AUGMENTS as u32 {
        return Err(Infeasible::TooManyRequiredChanges {
            required,
            max: MAX_AUGMENTS,
        });
    }

    // A skill occupies a spot if the piece has it or the range forces it on
    let skill_names: BTreeSet<&str> = criteria
        .skills
        .iter()
        .filter(|range| armor.skills.contains_key(&range.name) || range.min > 0)
        .map(|range| range.name.as_str())
        .collect();
    if skill_names.len() > MAX_SKILLS {
        return Err(Infeasible::TooManySkills {
            required: skill_names.len(),
            max: MAX_SKILLS,
        });
    }

    let available = (SLOT_COUNT as u32 * u32::from(MAX_SLOT_LEVEL)).saturating_sub(armor.slots.total());
    if u32::from(criteria.slot_increase) > available {
        return Err(Infeasible::SlotTargetUnreachable {
            requested: criteria.slot_increase,
            available,
        });
    }

    Ok(())
}

/// Whether one simulation result is acceptable. Pure.
pub fn matches_criteria(base: &ArmorPiece, result: &SimulationResult, criteria: &Criteria) -> bool {
    criteria.accepts(base, &result.armor)
}
