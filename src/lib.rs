//! Augment simulator for armor pieces.
//!
//! Rolls the in-game augment sequence for one piece and point budget, then
//! repeats it in batches to estimate how likely a wanted outcome is.

pub mod armor;
pub mod augment;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod criteria;
pub mod error;
pub mod mode;
pub mod report;
pub mod sampler;
pub mod simulation;
pub mod stats;

pub use armor::{ArmorPiece, DecoSlots, Element, Skill, SkillCatalog, Stat};
pub use augment::{AppliedAugment, Augment, AugmentClass, AugmentType, Effect};
pub use batch::{run_batch, run_batch_parallel, AugmentRequest, BatchSettings, BatchSimulator, CancelToken};
pub use catalog::{AugmentCatalog, WeightBy};
pub use criteria::{check_feasibility, matches_criteria, Criteria, Infeasible, ResistanceDirective, SkillRange};
pub use error::AugmentError;
pub use mode::{AugmentMode, ModeStrategy};
pub use sampler::{FastRng, RollSource, ScriptedRolls, WeightedSampler};
pub use simulation::{
    run_with_strategy, simulate_once, simulate_once_with, SimulationResult, StopReason,
};
pub use stats::{rolls_needed, BatchSummary, RollEstimate};
