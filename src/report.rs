//! Human-readable summaries of what a simulation changed

use crate::armor::{ArmorPiece, Stat};
use crate::augment::{AppliedAugment, AugmentType};
use serde::Serialize;
use std::fmt;

/// Level movement of one skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillChange {
    pub name: String,
    pub from: u8,
    pub to: u8,
}

impl SkillChange {
    pub fn delta(&self) -> i32 {
        i32::from(self.to) - i32::from(self.from)
    }
}

/// Before/after value of one stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatChange {
    pub stat: Stat,
    pub base: i32,
    pub value: i32,
}

impl StatChange {
    pub fn delta(&self) -> i32 {
        self.value - self.base
    }
}

/// Diff of an augmented piece against the piece it started from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    /// Only skills whose level moved, smallest delta first
    pub skills: Vec<SkillChange>,
    /// Change of the total slot level
    pub slot_delta: i32,
    pub stats: Vec<StatChange>,
}

impl ChangeSummary {
    pub fn between(base: &ArmorPiece, augmented: &ArmorPiece) -> Self {
        let mut skills: Vec<SkillChange> = base
            .skills
            .iter()
            .map(|(name, &from)| SkillChange {
                name: name.clone(),
                from,
                to: augmented.skill_level(name),
            })
            .chain(
                augmented
                    .skills
                    .iter()
                    .filter(|(name, level)| **level > 0 && !base.skills.contains_key(*name))
                    .map(|(name, &to)| SkillChange {
                        name: name.clone(),
                        from: 0,
                        to,
                    }),
            )
            .filter(|change| change.from != change.to)
            .collect();
        skills.sort_by_key(SkillChange::delta);

        let stats = Stat::ALL
            .into_iter()
            .map(|stat| StatChange {
                stat,
                base: base.stat(stat),
                value: augmented.stat(stat),
            })
            .collect();

        Self {
            skills,
            slot_delta: augmented.slots.total() as i32 - base.slots.total() as i32,
            stats,
        }
    }

    /// One-line headline, e.g. `Guard -1, Recoil +1, Deco Slots +2`
    pub fn title(&self) -> String {
        let mut parts: Vec<String> = self
            .skills
            .iter()
            .map(|change| format!("{} {:+}", change.name, change.delta()))
            .collect();
        if self.slot_delta > 0 {
            parts.push(format!("Deco Slots +{}", self.slot_delta));
        }
        if parts.is_empty() {
            return "Resistance Increase".to_string();
        }
        parts.join(", ")
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title())?;
        for change in &self.stats {
            if change.delta() == 0 {
                writeln!(f, "  {:<12} {}", change.stat.to_string(), change.value)?;
            } else {
                writeln!(
                    f,
                    "  {:<12} {} ({:+})",
                    change.stat.to_string(),
                    change.value,
                    change.delta()
                )?;
            }
        }
        Ok(())
    }
}

/// Short description of one applied augment, e.g. `+1 Guard skill point`
pub fn describe_augment(applied: &AppliedAugment) -> String {
    let value = applied.augment.signed_value();
    match applied.augment.kind {
        AugmentType::DefenseUp | AugmentType::DefenseDown => format!("{:+} defense", value),
        AugmentType::ResistanceUp(element) | AugmentType::ResistanceDown(element) => {
            format!("{:+} {} resistance", value, element.name().to_lowercase())
        }
        AugmentType::SkillUp | AugmentType::SkillDown => format!(
            "{:+} {} skill point",
            value,
            applied.effect.skill().unwrap_or("?")
        ),
        AugmentType::SlotUp => format!("{:+} decoration slot", value),
    }
}
