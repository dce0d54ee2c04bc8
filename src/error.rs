//! Error types for rejected augment requests

use crate::criteria::Infeasible;
use crate::mode::AugmentMode;
use thiserror::Error;

/// A request the engine refuses to run.
///
/// In-run misses (a Skill- with nothing to lower, an over-budget draw) never
/// surface here; the runner absorbs those and keeps rolling.
#[derive(Debug, Error)]
pub enum AugmentError {
    /// The mode needs a draw from a sub-pool that is empty or has zero weight
    #[error("{mode} mode cannot draw from an empty {pool} pool")]
    EmptySubPool {
        mode: AugmentMode,
        pool: &'static str,
    },

    /// Criteria or armor reference a skill the catalog does not know
    #[error("unknown skill `{0}`")]
    UnknownSkill(String),

    /// Acceptable range is inverted or exceeds the skill's max level
    #[error("invalid range {min}..={max} for skill `{name}` (max level {max_level})")]
    InvalidSkillRange {
        name: String,
        min: u8,
        max: u8,
        max_level: u8,
    },

    /// Armor piece violates its own invariants before any augment is applied
    #[error("armor piece `{name}` is invalid: {reason}")]
    InvalidArmor { name: String, reason: String },

    #[error("invalid batch settings: {0}")]
    InvalidSettings(String),

    /// Static pre-check proved the criteria can never match
    #[error("criteria cannot be met: {0}")]
    Infeasible(#[from] Infeasible),

    #[error("unknown augment type `{0}`")]
    UnknownAugmentType(String),

    #[error("unknown augment mode `{0}`")]
    UnknownMode(String),

    #[error("invalid decoration slots `{0}`")]
    InvalidSlots(String),
}
