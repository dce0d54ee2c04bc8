//! Augment definitions and their reversible effect on an armor piece

use crate::armor::{ArmorPiece, Element, SkillCatalog, Stat, MAX_SKILLS, MAX_SLOT_LEVEL, SLOT_COUNT};
use crate::error::AugmentError;
use crate::sampler::RollSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an augment does. Parsed once from names like `Defense+` or `Ice res-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AugmentType {
    DefenseUp,
    DefenseDown,
    ResistanceUp(Element),
    ResistanceDown(Element),
    SkillUp,
    SkillDown,
    SlotUp,
}

impl AugmentType {
    /// Stat moved by defense-type augments
    pub fn stat(self) -> Option<Stat> {
        match self {
            AugmentType::DefenseUp | AugmentType::DefenseDown => Some(Stat::Defense),
            AugmentType::ResistanceUp(e) | AugmentType::ResistanceDown(e) => {
                Some(Stat::Resistance(e))
            }
            AugmentType::SkillUp | AugmentType::SkillDown | AugmentType::SlotUp => None,
        }
    }

    /// Defense or elemental resistance, either direction
    pub fn is_defense_type(self) -> bool {
        self.stat().is_some()
    }

    pub fn is_skill(self) -> bool {
        matches!(self, AugmentType::SkillUp | AugmentType::SkillDown)
    }

    /// Lowers a stat or a skill
    pub fn is_decrease(self) -> bool {
        matches!(
            self,
            AugmentType::DefenseDown | AugmentType::ResistanceDown(_) | AugmentType::SkillDown
        )
    }
}

impl fmt::Display for AugmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AugmentType::DefenseUp => write!(f, "Defense+"),
            AugmentType::DefenseDown => write!(f, "Defense-"),
            AugmentType::ResistanceUp(e) => write!(f, "{} res+", e.name()),
            AugmentType::ResistanceDown(e) => write!(f, "{} res-", e.name()),
            AugmentType::SkillUp => write!(f, "Skill+"),
            AugmentType::SkillDown => write!(f, "Skill-"),
            AugmentType::SlotUp => write!(f, "Slot+"),
        }
    }
}

impl FromStr for AugmentType {
    type Err = AugmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || AugmentError::UnknownAugmentType(s.to_string());
        let trimmed = s.trim();
        match trimmed {
            "Defense+" => return Ok(AugmentType::DefenseUp),
            "Defense-" => return Ok(AugmentType::DefenseDown),
            "Skill+" => return Ok(AugmentType::SkillUp),
            "Skill-" => return Ok(AugmentType::SkillDown),
            "Slot+" => return Ok(AugmentType::SlotUp),
            _ => {}
        }

        let (element, sign) = trimmed
            .strip_suffix(" res+")
            .map(|e| (e, true))
            .or_else(|| trimmed.strip_suffix(" res-").map(|e| (e, false)))
            .ok_or_else(unknown)?;
        let element = Element::from_name(element).ok_or_else(unknown)?;
        Ok(if sign {
            AugmentType::ResistanceUp(element)
        } else {
            AugmentType::ResistanceDown(element)
        })
    }
}

impl TryFrom<String> for AugmentType {
    type Error = AugmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AugmentType> for String {
    fn from(value: AugmentType) -> Self {
        value.to_string()
    }
}

/// Which sub-pool an augment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AugmentClass {
    /// Ordinary roll candidate
    #[default]
    #[serde(rename = "default")]
    Default,
    /// Only used to spend leftover points once rolling ends
    #[serde(rename = "lastFiller")]
    LastFiller,
    /// Forced first pick in Skill mode
    #[serde(rename = "skill+First")]
    SkillUpFirst,
    /// Forced first pick in Slot mode
    #[serde(rename = "slot+First")]
    SlotUpFirst,
}

fn default_weight() -> u32 {
    1
}

/// One candidate augment from an armor set's pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Augment {
    #[serde(rename = "type")]
    pub kind: AugmentType,
    pub value: i32,
    pub cost: u32,
    #[serde(default)]
    pub class: AugmentClass,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Augment {
    /// Magnitude with the sign implied by the type.
    ///
    /// Pool data stores decreases as negative values; a positive value on a
    /// decrease type is still treated as a decrease.
    pub fn signed_value(&self) -> i32 {
        if self.kind.is_decrease() {
            -self.value.abs()
        } else {
            self.value.abs()
        }
    }
}

/// Exactly what an applied augment changed, so it can be reversed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Stat { stat: Stat, delta: i32 },
    Slots { deltas: [u8; SLOT_COUNT] },
    /// `created` is set when the skill had no entry before
    SkillUp { skill: String, created: bool },
    SkillDown { skill: String },
}

impl Effect {
    /// Reverse this effect on the piece it was applied to
    pub fn undo(&self, armor: &mut ArmorPiece) {
        match self {
            Effect::Stat { stat, delta } => *armor.stat_mut(*stat) -= delta,
            Effect::Slots { deltas } => {
                for (slot, delta) in armor.slots.0.iter_mut().zip(deltas) {
                    *slot -= delta;
                }
            }
            Effect::SkillUp { skill, created } => {
                if *created {
                    armor.skills.remove(skill);
                } else if let Some(level) = armor.skills.get_mut(skill) {
                    *level -= 1;
                }
            }
            Effect::SkillDown { skill } => {
                if let Some(level) = armor.skills.get_mut(skill) {
                    *level += 1;
                }
            }
        }
    }

    /// Name of the skill touched, if any
    pub fn skill(&self) -> Option<&str> {
        match self {
            Effect::SkillUp { skill, .. } | Effect::SkillDown { skill } => Some(skill),
            Effect::Stat { .. } | Effect::Slots { .. } => None,
        }
    }
}

/// An augment that made it onto the piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedAugment {
    pub augment: Augment,
    pub effect: Effect,
}

/// Why an augment could not be applied. Absorbed by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMiss {
    /// No catalog skill at this cost is below its max level
    NoSkillCandidate,
    /// Adding the picked skill would exceed the distinct-skill cap
    SkillCapReached,
    /// Every skill on the piece is already at level 0
    NothingToLower,
    /// All three slots are at max level
    SlotsSaturated,
}

/// Apply an augment to the working piece, returning what changed.
pub fn apply_augment<R: RollSource + ?Sized>(
    armor: &mut ArmorPiece,
    augment: &Augment,
    catalog: &SkillCatalog,
    rng: &mut R,
) -> Result<Effect, ApplyMiss> {
    match augment.kind {
        AugmentType::DefenseUp | AugmentType::DefenseDown => {
            Ok(shift_stat(armor, Stat::Defense, augment.signed_value()))
        }
        AugmentType::ResistanceUp(element) | AugmentType::ResistanceDown(element) => Ok(
            shift_stat(armor, Stat::Resistance(element), augment.signed_value()),
        ),
        AugmentType::SlotUp => {
            let units = augment.value.max(0) as u32;
            let deltas = distribute_slot_levels(armor.slots.levels(), units);
            if deltas.iter().all(|&d| d == 0) {
                return Err(ApplyMiss::SlotsSaturated);
            }
            for (slot, delta) in armor.slots.0.iter_mut().zip(deltas) {
                *slot += delta;
            }
            Ok(Effect::Slots { deltas })
        }
        AugmentType::SkillUp => {
            let candidates: Vec<_> = catalog
                .with_cost(augment.cost)
                .filter(|skill| armor.skill_level(&skill.name) < skill.max_level)
                .collect();
            if candidates.is_empty() {
                return Err(ApplyMiss::NoSkillCandidate);
            }
            let picked = candidates[rng.below(candidates.len() as u64) as usize];
            if !armor.skills.contains_key(&picked.name) && armor.skill_count() >= MAX_SKILLS {
                return Err(ApplyMiss::SkillCapReached);
            }
            let created = !armor.skills.contains_key(&picked.name);
            *armor.skills.entry(picked.name.clone()).or_insert(0) += 1;
            Ok(Effect::SkillUp {
                skill: picked.name.clone(),
                created,
            })
        }
        AugmentType::SkillDown => {
            let present: Vec<_> = armor
                .skills
                .iter()
                .filter(|(_, level)| **level > 0)
                .map(|(name, _)| name.clone())
                .collect();
            if present.is_empty() {
                return Err(ApplyMiss::NothingToLower);
            }
            let skill = present[rng.below(present.len() as u64) as usize].clone();
            if let Some(level) = armor.skills.get_mut(&skill) {
                *level -= 1;
            }
            Ok(Effect::SkillDown { skill })
        }
    }
}

fn shift_stat(armor: &mut ArmorPiece, stat: Stat, delta: i32) -> Effect {
    *armor.stat_mut(stat) += delta;
    Effect::Stat { stat, delta }
}

/// Spread `units` slot levels over the slots.
///
/// Empty slots open first (one level each, lowest index first). Whatever is
/// left tops up slots in index order, each capped at level 4. Returns the
/// per-slot increase; units that fit nowhere are dropped.
pub fn distribute_slot_levels(levels: [u8; SLOT_COUNT], units: u32) -> [u8; SLOT_COUNT] {
    let mut deltas = [0u8; SLOT_COUNT];
    let mut left = units;

    for (delta, &level) in deltas.iter_mut().zip(&levels) {
        if left == 0 {
            break;
        }
        if level == 0 {
            *delta = 1;
            left -= 1;
        }
    }

    for (delta, &level) in deltas.iter_mut().zip(&levels) {
        if left == 0 {
            break;
        }
        let room = u32::from(MAX_SLOT_LEVEL.saturating_sub(level + *delta));
        let add = room.min(left);
        *delta += add as u8;
        left -= add;
    }

    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armor::{DecoSlots, Skill};
    use crate::sampler::{FastRng, ScriptedRolls};
    use std::collections::BTreeMap;

    fn armor() -> ArmorPiece {
        ArmorPiece {
            name: "Test Mail".into(),
            rarity: None,
            defense: 50,
            fire_res: 2,
            water_res: 0,
            thunder_res: -1,
            ice_res: 0,
            dragon_res: 3,
            slots: DecoSlots([2, 1, 0]),
            skills: BTreeMap::from([("Guard".to_string(), 2), ("Focus".to_string(), 1)]),
        }
    }

    fn catalog() -> SkillCatalog {
        SkillCatalog::new(vec![
            Skill { name: "Guard".into(), max_level: 3, cost: Some(3) },
            Skill { name: "Focus".into(), max_level: 3, cost: Some(3) },
            Skill { name: "Earplugs".into(), max_level: 5, cost: Some(3) },
            Skill { name: "Handicraft".into(), max_level: 5, cost: Some(6) },
            Skill { name: "Stamina Thief".into(), max_level: 3, cost: None },
        ])
    }

    fn aug(kind: &str, value: i32, cost: u32) -> Augment {
        Augment {
            kind: kind.parse().unwrap(),
            value,
            cost,
            class: AugmentClass::Default,
            weight: 1,
        }
    }

    #[test]
    fn test_type_names_round_trip() {
        for name in [
            "Defense+", "Defense-", "Fire res+", "Dragon res-", "Skill+", "Skill-", "Slot+",
        ] {
            let kind: AugmentType = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
        assert!("Poison res+".parse::<AugmentType>().is_err());
        assert!("Defense".parse::<AugmentType>().is_err());
    }

    #[test]
    fn test_augment_pool_json() {
        // negative cost is not a valid point cost
        assert!(serde_json::from_str::<Vec<Augment>>(
            r#"[{"type": "Water res-", "value": -3, "cost": -1, "class": "default"}]"#,
        )
        .is_err());

        let pool: Vec<Augment> = serde_json::from_str(
            r#"[{"type": "Water res-", "value": -3, "cost": 0, "class": "default"},
                {"type": "Defense+", "value": 10, "cost": 6, "class": "lastFiller", "weight": 4}]"#,
        )
        .unwrap();
        assert_eq!(pool[0].kind, AugmentType::ResistanceDown(Element::Water));
        assert_eq!(pool[0].weight, 1);
        assert_eq!(pool[1].class, AugmentClass::LastFiller);
        assert_eq!(pool[1].weight, 4);
    }

    #[test]
    fn test_signed_value_tolerates_unsigned_decreases() {
        assert_eq!(aug("Defense-", -5, 0).signed_value(), -5);
        assert_eq!(aug("Defense-", 5, 0).signed_value(), -5);
        assert_eq!(aug("Fire res+", 2, 1).signed_value(), 2);
    }

    #[test]
    fn test_slot_distribution_opens_empty_slots_first() {
        assert_eq!(distribute_slot_levels([0, 0, 0], 5), [3, 1, 1]);
        assert_eq!(distribute_slot_levels([2, 3, 0], 3), [2, 0, 1]);
        assert_eq!(distribute_slot_levels([0, 0, 0], 2), [1, 1, 0]);
        assert_eq!(distribute_slot_levels([4, 0, 4], 3), [0, 3, 0]);
    }

    #[test]
    fn test_slot_distribution_drops_overflow() {
        assert_eq!(distribute_slot_levels([4, 4, 3], 3), [0, 0, 1]);
        assert_eq!(distribute_slot_levels([4, 4, 4], 2), [0, 0, 0]);
        assert_eq!(distribute_slot_levels([1, 1, 1], 12), [3, 3, 3]);
    }

    #[test]
    fn test_slot_up_reaches_expected_levels() {
        let mut piece = armor();
        piece.slots = DecoSlots([2, 3, 0]);
        let mut rng = FastRng::new(1);
        apply_augment(&mut piece, &aug("Slot+", 3, 3), &catalog(), &mut rng).unwrap();
        assert_eq!(piece.slots, DecoSlots([4, 3, 1]));
    }

    #[test]
    fn test_slot_up_fails_when_saturated() {
        let mut piece = armor();
        piece.slots = DecoSlots([4, 4, 4]);
        let mut rng = FastRng::new(1);
        let miss = apply_augment(&mut piece, &aug("Slot+", 1, 3), &catalog(), &mut rng);
        assert_eq!(miss, Err(ApplyMiss::SlotsSaturated));
    }

    #[test]
    fn test_skill_up_picks_from_cost_bucket() {
        let mut piece = armor();
        // cost-3 bucket in catalog order: Guard, Focus, Earplugs; pick index 2
        let mut rng = ScriptedRolls::new(vec![2]);
        let effect = apply_augment(&mut piece, &aug("Skill+", 1, 3), &catalog(), &mut rng).unwrap();
        assert_eq!(
            effect,
            Effect::SkillUp { skill: "Earplugs".into(), created: true }
        );
        assert_eq!(piece.skill_level("Earplugs"), 1);
    }

    #[test]
    fn test_skill_up_skips_maxed_skills() {
        let mut piece = armor();
        piece.skills.insert("Guard".into(), 3);
        piece.skills.insert("Focus".into(), 3);
        let mut rng = ScriptedRolls::new(vec![0]);
        let effect = apply_augment(&mut piece, &aug("Skill+", 1, 3), &catalog(), &mut rng).unwrap();
        assert_eq!(effect.skill(), Some("Earplugs"));
    }

    #[test]
    fn test_skill_up_with_no_bucket_misses() {
        let mut piece = armor();
        let mut rng = FastRng::new(3);
        let miss = apply_augment(&mut piece, &aug("Skill+", 1, 9), &catalog(), &mut rng);
        assert_eq!(miss, Err(ApplyMiss::NoSkillCandidate));
    }

    #[test]
    fn test_skill_up_respects_skill_cap() {
        let mut piece = armor();
        for name in ["A", "B", "C"] {
            piece.skills.insert(name.into(), 1);
        }
        assert_eq!(piece.skill_count(), MAX_SKILLS);
        let before = piece.clone();

        let mut rng = ScriptedRolls::new(vec![0]);
        let miss = apply_augment(&mut piece, &aug("Skill+", 1, 6), &catalog(), &mut rng);
        assert_eq!(miss, Err(ApplyMiss::SkillCapReached));
        assert_eq!(piece, before);

        // Raising a skill already on the piece is still allowed
        let mut rng = ScriptedRolls::new(vec![0]);
        let effect = apply_augment(&mut piece, &aug("Skill+", 1, 3), &catalog(), &mut rng).unwrap();
        assert_eq!(effect.skill(), Some("Guard"));
    }

    #[test]
    fn test_skill_down_needs_a_positive_skill() {
        let mut piece = armor();
        piece.skills = BTreeMap::from([("Guard".to_string(), 0)]);
        let mut rng = FastRng::new(5);
        let miss = apply_augment(&mut piece, &aug("Skill-", -1, 0), &catalog(), &mut rng);
        assert_eq!(miss, Err(ApplyMiss::NothingToLower));
    }

    #[test]
    fn test_skill_down_keeps_zeroed_entry() {
        let mut piece = armor();
        // present skills sorted: Focus(1), Guard(2); pick Focus
        let mut rng = ScriptedRolls::new(vec![0]);
        apply_augment(&mut piece, &aug("Skill-", -1, 0), &catalog(), &mut rng).unwrap();
        assert_eq!(piece.skills.get("Focus"), Some(&0));
        assert_eq!(piece.skill_count(), 2);
    }

    #[test]
    fn test_zeroed_skill_keeps_its_spot() {
        let mut piece = armor();
        piece.skills = ["A", "B", "C", "D", "E"]
            .into_iter()
            .map(|name| (name.to_string(), 1))
            .collect();
        let catalog = SkillCatalog::new(
            ["A", "B", "C", "D", "E", "F"]
                .into_iter()
                .map(|name| Skill { name: name.into(), max_level: 3, cost: Some(3) })
                .collect(),
        );

        let mut rng = ScriptedRolls::new(vec![0]);
        let effect = apply_augment(&mut piece, &aug("Skill-", -1, 0), &catalog, &mut rng).unwrap();
        assert_eq!(effect, Effect::SkillDown { skill: "A".into() });
        assert_eq!(piece.skill_level("A"), 0);

        // bucket order A..F, index 5 is the new name F
        let mut rng = ScriptedRolls::new(vec![5]);
        let miss = apply_augment(&mut piece, &aug("Skill+", 1, 3), &catalog, &mut rng);
        assert_eq!(miss, Err(ApplyMiss::SkillCapReached));
        assert_eq!(piece.skills.len(), MAX_SKILLS);

        // the zeroed entry can still be raised again
        let mut rng = ScriptedRolls::new(vec![0]);
        let effect = apply_augment(&mut piece, &aug("Skill+", 1, 3), &catalog, &mut rng).unwrap();
        assert_eq!(effect, Effect::SkillUp { skill: "A".into(), created: false });
        assert_eq!(piece.skills.len(), MAX_SKILLS);
    }

    #[test]
    fn test_undo_restores_every_type() {
        let augments = [
            aug("Defense+", 5, 1),
            aug("Defense-", -5, 0),
            aug("Thunder res+", 2, 1),
            aug("Ice res-", -3, 0),
            aug("Slot+", 2, 3),
            aug("Skill+", 1, 3),
            aug("Skill+", 1, 6),
            aug("Skill-", -1, 0),
        ];
        let catalog = catalog();
        for seed in 0..20 {
            for augment in &augments {
                let original = armor();
                let mut piece = original.clone();
                let mut rng = FastRng::new(seed);
                let effect = apply_augment(&mut piece, augment, &catalog, &mut rng).unwrap();
                assert_ne!(piece, original, "{} changed nothing", augment.kind);
                effect.undo(&mut piece);
                assert_eq!(piece, original, "{} did not undo cleanly", augment.kind);
            }
        }
    }
}
