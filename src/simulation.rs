//! Core augment simulation: one full roll sequence on one armor piece

use crate::armor::{ArmorPiece, SkillCatalog};
use crate::augment::{apply_augment, AppliedAugment, Augment};
use crate::catalog::WeightBy;
use crate::error::AugmentError;
use crate::mode::{AugmentMode, ModeStrategy, RollPhase};
use crate::sampler::RollSource;
use log::{debug, trace};
use serde::Serialize;

/// Most augments that can sit on one piece
pub const MAX_AUGMENTS: usize = 7;
/// Roll budget per simulation
pub const MAX_ROLLS: u32 = 50;

/// Why the roll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No rolls left, or the next roll cost more than what was left
    RollsExhausted,
    BudgetSpent,
    AugmentLimit,
}

/// Outcome of one simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    /// Independent copy of the input piece with every augment applied
    pub armor: ArmorPiece,
    /// In application order; cancelled defense-type entries are gone
    pub applied: Vec<AppliedAugment>,
    pub remaining_points: u32,
    pub remaining_rolls: u32,
    pub stop: StopReason,
    /// Whether the post-loop filler landed
    pub filled: bool,
    /// Times the defense tracker netted to zero and cleared the defense augments
    pub cancellations: u32,
    /// Defense mode draws that were off-category and rolled again
    pub rerolls: u32,
}

impl SimulationResult {
    pub fn spent_points(&self, budget: u32) -> u32 {
        budget.saturating_sub(self.remaining_points)
    }

    pub fn rolls_used(&self) -> u32 {
        MAX_ROLLS - self.remaining_rolls
    }
}

/// Run one simulation, building the mode's sub-pools for this call only.
///
/// Draws are weighted by cost. Batches should build a [`ModeStrategy`] once
/// and call [`run_with_strategy`] instead.
pub fn simulate_once<R: RollSource + ?Sized>(
    armor: &ArmorPiece,
    pool: &[Augment],
    budget: u32,
    skills: &SkillCatalog,
    mode: AugmentMode,
    rng: &mut R,
) -> Result<SimulationResult, AugmentError> {
    simulate_once_with(armor, pool, budget, skills, mode, WeightBy::default(), rng)
}

/// [`simulate_once`] with an explicit weight source for the draws
pub fn simulate_once_with<R: RollSource + ?Sized>(
    armor: &ArmorPiece,
    pool: &[Augment],
    budget: u32,
    skills: &SkillCatalog,
    mode: AugmentMode,
    weight_by: WeightBy,
    rng: &mut R,
) -> Result<SimulationResult, AugmentError> {
    armor.validate(skills)?;
    let strategy = ModeStrategy::new(pool, mode, weight_by)?;
    Ok(run_with_strategy(armor, &strategy, budget, skills, rng))
}

/// Working state of a single run. Owns the piece being augmented.
struct Augmenter<'c> {
    armor: ArmorPiece,
    applied: Vec<AppliedAugment>,
    remaining_points: u32,
    rolls_left: u32,
    /// Sum of the signed values of live defense-type augments
    net_defense: i32,
    skills: &'c SkillCatalog,
}

impl<'c> Augmenter<'c> {
    /// Remove every live defense-type augment, restore the piece and refund its points
    fn cancel_defense_augments(&mut self) {
        let mut index = self.applied.len();
        while index > 0 {
            index -= 1;
            if self.applied[index].augment.kind.is_defense_type() {
                let entry = self.applied.remove(index);
                entry.effect.undo(&mut self.armor);
                self.remaining_points += entry.augment.cost;
            }
        }
        self.net_defense = 0;
    }

    fn try_apply<R: RollSource + ?Sized>(&mut self, augment: &Augment, rng: &mut R) -> bool {
        match apply_augment(&mut self.armor, augment, self.skills, rng) {
            Ok(effect) => {
                self.remaining_points -= augment.cost;
                if augment.kind.is_defense_type() {
                    self.net_defense += augment.signed_value();
                }
                trace!("applied {} ({:?})", augment.kind, effect);
                self.applied.push(AppliedAugment {
                    augment: augment.clone(),
                    effect,
                });
                true
            }
            Err(miss) => {
                trace!("discarded {}: {:?}", augment.kind, miss);
                false
            }
        }
    }
}

/// Run one simulation against a prepared strategy
pub fn run_with_strategy<R: RollSource + ?Sized>(
    armor: &ArmorPiece,
    strategy: &ModeStrategy<'_>,
    budget: u32,
    skills: &SkillCatalog,
    rng: &mut R,
) -> SimulationResult {
    let mut run = Augmenter {
        armor: armor.clone(),
        applied: Vec::with_capacity(MAX_AUGMENTS),
        remaining_points: budget,
        rolls_left: MAX_ROLLS,
        net_defense: 0,
        skills,
    };
    let mut phase = RollPhase::default();
    let mut cancellations = 0;
    let mut rerolls = 0;

    let stop = loop {
        if run.rolls_left == 0 {
            break StopReason::RollsExhausted;
        }
        if run.remaining_points == 0 {
            break StopReason::BudgetSpent;
        }
        if run.applied.len() >= MAX_AUGMENTS {
            break StopReason::AugmentLimit;
        }

        let Some(roll) = strategy.next_roll(&mut phase, rng) else {
            break StopReason::RollsExhausted;
        };

        // A roll that would overdraw the roll budget is dropped without being charged
        if roll.rolls > run.rolls_left {
            trace!("{} needs {} rolls, {} left", roll.augment.kind, roll.rolls, run.rolls_left);
            break StopReason::RollsExhausted;
        }
        run.rolls_left -= roll.rolls;
        if roll.rolls > 1 {
            rerolls += 1;
        }

        let augment = roll.augment;
        if augment.cost > run.remaining_points {
            trace!("{} over budget ({} > {})", augment.kind, augment.cost, run.remaining_points);
            continue;
        }

        if augment.kind.is_defense_type() && run.net_defense + augment.signed_value() == 0 {
            debug!("{} nets defense to zero, cancelling", augment.kind);
            run.cancel_defense_augments();
            cancellations += 1;
            continue;
        }

        run.try_apply(augment, rng);
    };

    debug!(
        "stopped ({:?}): {} augments, {} points and {} rolls left",
        stop,
        run.applied.len(),
        run.remaining_points,
        run.rolls_left
    );

    phase = RollPhase::Filling;
    let mut filled = false;
    if run.remaining_points > 0 && run.applied.len() < MAX_AUGMENTS {
        if let Some(filler) = strategy.fill(&mut phase, run.remaining_points) {
            filled = run.try_apply(filler, rng);
        }
    }

    SimulationResult {
        armor: run.armor,
        applied: run.applied,
        remaining_points: run.remaining_points,
        remaining_rolls: run.rolls_left,
        stop,
        filled,
        cancellations,
        rerolls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armor::{DecoSlots, Element, Skill, Stat};
    use crate::augment::{AugmentClass, AugmentType, Effect};
    use crate::sampler::{FastRng, ScriptedRolls};
    use std::collections::BTreeMap;

    fn armor() -> ArmorPiece {
        ArmorPiece {
            name: "Bone Helm".into(),
            rarity: Some(2),
            defense: 30,
            fire_res: 1,
            water_res: 1,
            thunder_res: 0,
            ice_res: 0,
            dragon_res: -2,
            slots: DecoSlots([1, 0, 0]),
            skills: BTreeMap::from([("Guard".to_string(), 1)]),
        }
    }

    fn skills() -> SkillCatalog {
        SkillCatalog::new(vec![
            Skill { name: "Guard".into(), max_level: 5, cost: Some(3) },
            Skill { name: "Recoil".into(), max_level: 3, cost: Some(3) },
        ])
    }

    fn aug(kind: AugmentType, value: i32, cost: u32, class: AugmentClass) -> Augment {
        Augment { kind, value, cost, class, weight: 1 }
    }

    #[test]
    fn test_cancellation_refunds_and_restores() {
        // Defense-only default class so every roll lands in the defense tracker
        let pool = vec![
            aug(AugmentType::DefenseUp, 4, 2, AugmentClass::Default),
            aug(AugmentType::DefenseDown, -4, 1, AugmentClass::Default),
            aug(AugmentType::SkillUp, 1, 3, AugmentClass::Default),
        ];
        let strategy = ModeStrategy::new(&pool, AugmentMode::Default, WeightBy::Cost).unwrap();
        let base = armor();

        // Seeds: Defense+ (ends [2,3] -> 0), Skill+ raising Guard, then a random
        // Defense- (ends [2,3,6] -> 2) that nets defense to zero. Two more
        // Skill+ draws (-> 5) follow; the second only fits because the
        // cancelled Defense+ gave its 2 points back.
        let mut rng = ScriptedRolls::new(vec![0, 0, 0, 2, 5, 0, 5, 0]);
        let result = run_with_strategy(&base, &strategy, 9, &skills(), &mut rng);

        assert!(result
            .applied
            .iter()
            .all(|a| !a.augment.kind.is_defense_type()));
        assert_eq!(result.armor.defense, base.defense);
        assert_eq!(result.applied.len(), 3);
        assert_eq!(result.armor.skill_level("Guard"), 4);
        assert_eq!(result.remaining_points, 0);
        assert_eq!(result.stop, StopReason::BudgetSpent);
        assert_eq!(result.cancellations, 1);
    }

    #[test]
    fn test_weight_source_changes_the_draws() {
        let mut pool = vec![
            aug(AugmentType::DefenseUp, 5, 2, AugmentClass::Default),
            aug(AugmentType::DefenseUp, 3, 1, AugmentClass::Default),
        ];
        pool[1].weight = 3;
        let base = armor();
        let first_value = |weight_by: WeightBy| {
            // by cost the ends are [2, 3], by weight [1, 4]; a draw of 1 splits them
            let mut rng = ScriptedRolls::new(vec![1]);
            let result = simulate_once_with(
                &base,
                &pool,
                2,
                &skills(),
                AugmentMode::Defense,
                weight_by,
                &mut rng,
            )
            .unwrap();
            result.applied[0].augment.value
        };
        assert_eq!(first_value(WeightBy::Cost), 5);
        assert_eq!(first_value(WeightBy::Weight), 3);

        let mut rng = ScriptedRolls::new(vec![1]);
        let default = simulate_once(&base, &pool, 2, &skills(), AugmentMode::Defense, &mut rng)
            .unwrap();
        assert_eq!(default.applied[0].augment.value, 5);
    }

    #[test]
    fn test_over_budget_draw_still_costs_a_roll() {
        let pool = vec![
            aug(AugmentType::DefenseUp, 4, 5, AugmentClass::Default),
            aug(AugmentType::SkillUp, 1, 9, AugmentClass::Default),
        ];
        let strategy = ModeStrategy::new(&pool, AugmentMode::Default, WeightBy::Cost).unwrap();
        let mut rng = FastRng::new(3);
        let result = run_with_strategy(&armor(), &strategy, 4, &skills(), &mut rng);
        assert!(result.applied.is_empty());
        assert_eq!(result.remaining_rolls, 0);
        assert_eq!(result.stop, StopReason::RollsExhausted);
        assert_eq!(result.remaining_points, 4);
    }

    #[test]
    fn test_filler_spends_leftover_points() {
        let pool = vec![
            aug(AugmentType::DefenseUp, 4, 5, AugmentClass::Default),
            aug(AugmentType::SkillUp, 1, 9, AugmentClass::Default),
            aug(AugmentType::ResistanceUp(Element::Ice), 1, 1, AugmentClass::LastFiller),
            aug(AugmentType::ResistanceUp(Element::Fire), 3, 3, AugmentClass::LastFiller),
            aug(AugmentType::DefenseUp, 12, 6, AugmentClass::LastFiller),
        ];
        let strategy = ModeStrategy::new(&pool, AugmentMode::Default, WeightBy::Cost).unwrap();
        let mut rng = FastRng::new(3);
        let result = run_with_strategy(&armor(), &strategy, 4, &skills(), &mut rng);
        assert!(result.filled);
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.armor.stat(Stat::Resistance(Element::Fire)), 4);
        assert_eq!(result.remaining_points, 1);
    }

    #[test]
    fn test_input_piece_is_untouched() {
        let pool = vec![
            aug(AugmentType::DefenseUp, 4, 2, AugmentClass::Default),
            aug(AugmentType::SkillUp, 1, 3, AugmentClass::Default),
            aug(AugmentType::SlotUp, 1, 3, AugmentClass::Default),
        ];
        let base = armor();
        let snapshot = base.clone();
        let mut rng = FastRng::new(17);
        let result =
            simulate_once(&base, &pool, 12, &skills(), AugmentMode::Default, &mut rng).unwrap();
        assert_eq!(base, snapshot);
        assert!(!result.applied.is_empty());
    }

    #[test]
    fn test_augment_cap_stops_loop() {
        let pool = vec![
            aug(AugmentType::DefenseUp, 1, 1, AugmentClass::Default),
            aug(AugmentType::SkillUp, 1, 1, AugmentClass::Default),
        ];
        let catalog = SkillCatalog::new(
            (0..8)
                .map(|i| Skill { name: format!("S{i}"), max_level: 7, cost: Some(1) })
                .collect(),
        );
        let mut base = armor();
        base.skills.clear();
        let strategy = ModeStrategy::new(&pool, AugmentMode::Default, WeightBy::Cost).unwrap();
        let mut rng = FastRng::new(2024);
        let result = run_with_strategy(&base, &strategy, 100, &catalog, &mut rng);
        assert_eq!(result.applied.len(), MAX_AUGMENTS);
        assert_eq!(result.stop, StopReason::AugmentLimit);
        assert!(!result.filled);
        assert!(result.armor.skill_count() <= 5);
    }

    #[test]
    fn test_skill_up_effect_names_skill() {
        let pool = vec![
            aug(AugmentType::DefenseUp, 4, 2, AugmentClass::Default),
            aug(AugmentType::SkillUp, 1, 3, AugmentClass::Default),
        ];
        let strategy = ModeStrategy::new(&pool, AugmentMode::Default, WeightBy::Cost).unwrap();
        // Defense+, then Skill+ picking Recoil (index 1 of the cost-3 bucket)
        let mut rng = ScriptedRolls::new(vec![0, 0, 1]);
        let result = run_with_strategy(&armor(), &strategy, 5, &skills(), &mut rng);
        assert_eq!(result.applied.len(), 2);
        assert_eq!(
            result.applied[1].effect,
            Effect::SkillUp { skill: "Recoil".into(), created: true }
        );
        assert_eq!(result.stop, StopReason::BudgetSpent);
    }
}
