//! Batches over the sample scenario.

use augment_sim::{
    config::ScenarioConfig, run_batch, run_batch_parallel, AugmentError, AugmentMode,
    BatchSettings, BatchSimulator, CancelToken, Criteria, Infeasible,
};

fn sample() -> ScenarioConfig {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample.yaml");
    ScenarioConfig::from_file(path).unwrap()
}

fn seeded(attempts: u64, slice: u64, seed: u64) -> BatchSettings {
    BatchSettings {
        attempts,
        slice,
        seed: Some(seed),
        ..BatchSettings::default()
    }
}

#[test]
fn test_iterator_reports_running_totals() {
    let config = sample();
    let criteria = config.criteria();
    let batch = run_batch(config.request(), &criteria, 1_000, 100).unwrap();

    let mut last = (0, 0);
    let mut slices = 0;
    let mut sampled = 0;
    for progress in batch {
        assert_eq!(progress.attempts, last.0 + 100);
        assert!(progress.matches >= last.1);
        assert!(progress.matches <= progress.attempts);
        sampled += progress.new_samples.len();
        assert_eq!(progress.sample_count, sampled);
        last = (progress.attempts, progress.matches);
        slices += 1;
    }
    assert_eq!(slices, 10);
    assert_eq!(last.0, 1_000);
    assert!(sampled <= 10);
}

#[test]
fn test_success_rate_is_plausible() {
    let config = sample();
    let criteria = config.criteria();
    let mut batch = BatchSimulator::new(config.request(), &criteria, seeded(5_000, 250, 77)).unwrap();
    let summary = batch.run_to_end();

    assert_eq!(summary.attempts, 5_000);
    let rate = summary.success_rate();
    assert!(rate > 0.0 && rate < 1.0, "rate {rate}");
    assert_eq!(summary.samples.len(), 10);
    for sample in &summary.samples {
        assert!(criteria.accepts(&config.armor, &sample.armor));
    }

    let estimates = summary.roll_estimates();
    assert_eq!(estimates.len(), 3);
    assert!(estimates.iter().all(|e| e.rolls.is_some()));
    assert!(estimates[0].rolls <= estimates[1].rolls);
    assert!(estimates[1].rolls <= estimates[2].rolls);
}

#[test]
fn test_parallel_matches_across_thread_counts() {
    let config = sample();
    let criteria = config.criteria();
    let settings = seeded(4_000, 100, 5);

    let run = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        pool.install(|| {
            run_batch_parallel(config.request(), &criteria, &settings, &CancelToken::new()).unwrap()
        })
    };
    let one = run(1);
    let four = run(4);
    assert_eq!(one.attempts, 4_000);
    assert_eq!(one.matches, four.matches);
    assert_eq!(one.samples, four.samples);
}

#[test]
fn test_never_matching_criteria_has_no_estimate() {
    let mut config = sample();
    config.budget = 0;
    let criteria = config.criteria();
    let mut batch = BatchSimulator::new(config.request(), &criteria, seeded(300, 100, 1)).unwrap();
    let summary = batch.run_to_end();
    assert_eq!(summary.matches, 0);
    assert!(summary.samples.is_empty());
    assert!(summary.roll_estimates().iter().all(|e| e.rolls.is_none()));
}

#[test]
fn test_rejections() {
    let mut config = sample();
    config.mode = AugmentMode::Defense;
    let criteria = config.criteria();
    assert!(matches!(
        run_batch(config.request(), &criteria, 100, 10).err(),
        Some(AugmentError::Infeasible(Infeasible::DefenseModeSkillChange))
    ));

    let mut criteria = Criteria::default();
    criteria.skills.push(augment_sim::SkillRange {
        name: "Wide-Range".into(),
        min: 0,
        max: 1,
    });
    config.mode = AugmentMode::Default;
    assert!(matches!(
        run_batch(config.request(), &criteria, 100, 10).err(),
        Some(AugmentError::UnknownSkill(_))
    ));

    config.pool.retain(|a| a.class != augment_sim::AugmentClass::SlotUpFirst);
    config.mode = AugmentMode::Slot;
    assert!(matches!(
        run_batch(config.request(), &Criteria::default(), 100, 10).err(),
        Some(AugmentError::EmptySubPool { .. })
    ));
}
