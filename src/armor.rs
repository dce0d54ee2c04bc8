//! Armor pieces, decoration slots and the skill catalog

use crate::error::AugmentError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Most distinct skills a piece may carry
pub const MAX_SKILLS: usize = 5;
/// Highest level a single decoration slot reaches
pub const MAX_SLOT_LEVEL: u8 = 4;
pub const SLOT_COUNT: usize = 3;

/// Elemental resistance kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Fire,
    Water,
    Thunder,
    Ice,
    Dragon,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Fire,
        Element::Water,
        Element::Thunder,
        Element::Ice,
        Element::Dragon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Element::Fire => "Fire",
            Element::Water => "Water",
            Element::Thunder => "Thunder",
            Element::Ice => "Ice",
            Element::Dragon => "Dragon",
        }
    }

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }
}

/// The six defense-like stats an augment can move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Defense,
    Resistance(Element),
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::Defense,
        Stat::Resistance(Element::Fire),
        Stat::Resistance(Element::Water),
        Stat::Resistance(Element::Thunder),
        Stat::Resistance(Element::Ice),
        Stat::Resistance(Element::Dragon),
    ];
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Defense => write!(f, "Defense"),
            Stat::Resistance(element) => write!(f, "{} res", element.name()),
        }
    }
}

/// Levels of the three decoration slots, each 0..=4 (0 = no slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct DecoSlots(pub [u8; SLOT_COUNT]);

impl DecoSlots {
    /// Parse the compact data-file form: `"21"` is `[2, 1, 0]`
    pub fn parse(text: &str) -> Result<Self, AugmentError> {
        let invalid = || AugmentError::InvalidSlots(text.to_string());
        if text.chars().count() > SLOT_COUNT {
            return Err(invalid());
        }
        let mut levels = [0u8; SLOT_COUNT];
        for (slot, ch) in levels.iter_mut().zip(text.chars()) {
            let level = ch.to_digit(10).ok_or_else(invalid)? as u8;
            if level > MAX_SLOT_LEVEL {
                return Err(invalid());
            }
            *slot = level;
        }
        Ok(Self(levels))
    }

    /// Inverse of [`DecoSlots::parse`]; empty slots are dropped
    pub fn stringify(&self) -> String {
        self.0
            .iter()
            .filter(|&&level| level > 0)
            .map(|level| level.to_string())
            .collect()
    }

    pub fn levels(&self) -> [u8; SLOT_COUNT] {
        self.0
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|&level| u32::from(level)).sum()
    }

    fn from_levels(levels: &[u8]) -> Result<Self, String> {
        if levels.len() > SLOT_COUNT {
            return Err(format!("at most {} slots, got {}", SLOT_COUNT, levels.len()));
        }
        let mut out = [0u8; SLOT_COUNT];
        for (slot, &level) in out.iter_mut().zip(levels) {
            if level > MAX_SLOT_LEVEL {
                return Err(format!("slot level {} above {}", level, MAX_SLOT_LEVEL));
            }
            *slot = level;
        }
        Ok(Self(out))
    }
}

impl<'de> Deserialize<'de> for DecoSlots {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Data files store "21"; YAML may hand back an unquoted 21 as a number
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Levels(Vec<u8>),
            Text(String),
            Number(u32),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Levels(levels) => DecoSlots::from_levels(&levels).map_err(D::Error::custom),
            Repr::Text(text) => DecoSlots::parse(&text).map_err(D::Error::custom),
            Repr::Number(n) => DecoSlots::parse(&n.to_string()).map_err(D::Error::custom),
        }
    }
}

/// A piece of equipment as the augment engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorPiece {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<u32>,
    pub defense: i32,
    #[serde(default)]
    pub fire_res: i32,
    #[serde(default)]
    pub water_res: i32,
    #[serde(default)]
    pub thunder_res: i32,
    #[serde(default)]
    pub ice_res: i32,
    #[serde(default)]
    pub dragon_res: i32,
    #[serde(default, rename = "decos", alias = "slots")]
    pub slots: DecoSlots,
    /// Skill name to level. Entries may sit at level 0 after a Skill-.
    #[serde(default, with = "skill_list")]
    pub skills: BTreeMap<String, u8>,
}

impl ArmorPiece {
    pub fn stat(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Defense => self.defense,
            Stat::Resistance(Element::Fire) => self.fire_res,
            Stat::Resistance(Element::Water) => self.water_res,
            Stat::Resistance(Element::Thunder) => self.thunder_res,
            Stat::Resistance(Element::Ice) => self.ice_res,
            Stat::Resistance(Element::Dragon) => self.dragon_res,
        }
    }

    pub fn stat_mut(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Defense => &mut self.defense,
            Stat::Resistance(Element::Fire) => &mut self.fire_res,
            Stat::Resistance(Element::Water) => &mut self.water_res,
            Stat::Resistance(Element::Thunder) => &mut self.thunder_res,
            Stat::Resistance(Element::Ice) => &mut self.ice_res,
            Stat::Resistance(Element::Dragon) => &mut self.dragon_res,
        }
    }

    /// Level of a skill, 0 when absent
    pub fn skill_level(&self, name: &str) -> u8 {
        self.skills.get(name).copied().unwrap_or(0)
    }

    /// Distinct skill names on the piece. A skill lowered to level 0 keeps
    /// its entry and still takes a spot.
    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Check the at-rest invariants against a catalog
    pub fn validate(&self, catalog: &SkillCatalog) -> Result<(), AugmentError> {
        let invalid = |reason: String| AugmentError::InvalidArmor {
            name: self.name.clone(),
            reason,
        };

        if self.skill_count() > MAX_SKILLS {
            return Err(invalid(format!(
                "{} skills, at most {} allowed",
                self.skill_count(),
                MAX_SKILLS
            )));
        }
        if let Some(level) = self.slots.0.iter().find(|&&l| l > MAX_SLOT_LEVEL) {
            return Err(invalid(format!("slot level {} above {}", level, MAX_SLOT_LEVEL)));
        }
        for (name, &level) in &self.skills {
            let skill = catalog
                .get(name)
                .ok_or_else(|| AugmentError::UnknownSkill(name.clone()))?;
            if level > skill.max_level {
                return Err(invalid(format!(
                    "{} at level {} exceeds max level {}",
                    name, level, skill.max_level
                )));
            }
        }
        Ok(())
    }
}

/// Skills are a list of `{name, level}` in data files
mod skill_list {
    use super::*;

    #[derive(Serialize)]
    struct EntryRef<'a> {
        name: &'a str,
        level: u8,
    }

    #[derive(Deserialize)]
    struct Entry {
        name: String,
        level: u8,
    }

    pub fn serialize<S>(skills: &BTreeMap<String, u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(
            skills
                .iter()
                .map(|(name, &level)| EntryRef { name, level }),
        )
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut skills = BTreeMap::new();
        for entry in Vec::<Entry>::deserialize(deserializer)? {
            if skills.insert(entry.name.clone(), entry.level).is_some() {
                return Err(D::Error::custom(format!("duplicate skill `{}`", entry.name)));
            }
        }
        Ok(skills)
    }
}

/// A skill definition from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub max_level: u8,
    /// Point cost bucket for Skill+ candidates; `None` means never augmentable
    #[serde(default, deserialize_with = "augment_cost")]
    pub cost: Option<u32>,
}

impl Skill {
    pub fn is_augmentable(&self) -> bool {
        self.cost.is_some()
    }
}

// Source data marks non-augmentable skills with a null or non-positive cost
fn augment_cost<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|&cost| cost > 0)
        .and_then(|cost| u32::try_from(cost).ok()))
}

/// All known skills, bucketed by Skill+ point cost
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Skill>", into = "Vec<Skill>")]
pub struct SkillCatalog {
    skills: Vec<Skill>,
    by_cost: BTreeMap<u32, Vec<usize>>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>) -> Self {
        let mut by_cost: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (index, skill) in skills.iter().enumerate() {
            if let Some(cost) = skill.cost {
                by_cost.entry(cost).or_default().push(index);
            }
        }
        Self { skills, by_cost }
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.name == name)
    }

    /// Augmentable skills whose per-level cost equals `cost`, in catalog order
    pub fn with_cost(&self, cost: u32) -> impl Iterator<Item = &Skill> + '_ {
        self.by_cost
            .get(&cost)
            .into_iter()
            .flatten()
            .map(move |&index| &self.skills[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> + '_ {
        self.skills.iter()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl From<Vec<Skill>> for SkillCatalog {
    fn from(skills: Vec<Skill>) -> Self {
        Self::new(skills)
    }
}

impl From<SkillCatalog> for Vec<Skill> {
    fn from(catalog: SkillCatalog) -> Self {
        catalog.skills
    }
}
