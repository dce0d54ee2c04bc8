//! Debug script: run one seeded simulation and print every roll that landed

use augment_sim::config::ScenarioConfig;
use augment_sim::report::{describe_augment, ChangeSummary};
use augment_sim::sampler::FastRng;
use augment_sim::simulation::simulate_once_with;
use std::env;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: debug-once <scenario.yaml> [seed]");
        std::process::exit(1);
    }

    let config = match ScenarioConfig::from_file(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    let seed = args
        .get(2)
        .and_then(|s| s.parse::<u64>().ok())
        .or(config.batch.seed)
        .unwrap_or(0);

    let mut rng = FastRng::new(seed);
    let result = match simulate_once_with(
        &config.armor,
        &config.pool,
        config.budget,
        &config.skills,
        config.mode,
        config.batch.weight_by,
        &mut rng,
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n=== {} | {} mode | seed {} ===", config.armor.name, config.mode, seed);
    for (i, applied) in result.applied.iter().enumerate() {
        println!("  {}. {:<12} {}", i + 1, applied.augment.kind.to_string(), describe_augment(applied));
    }
    if result.filled {
        println!("  (last entry spent leftover points)");
    }
    if result.cancellations > 0 || result.rerolls > 0 {
        println!(
            "{} cancellation(s), {} defense reroll(s)",
            result.cancellations, result.rerolls
        );
    }
    println!(
        "stop: {:?}, {} / {} points spent, {} rolls used",
        result.stop,
        result.spent_points(config.budget),
        config.budget,
        result.rolls_used()
    );
    print!("{}", ChangeSummary::between(&config.armor, &result.armor));
    println!(
        "  Decos        {} -> {}",
        config.armor.slots.stringify(),
        result.armor.slots.stringify()
    );

    let criteria = config.criteria();
    println!(
        "matches criteria: {}",
        augment_sim::criteria::matches_criteria(&config.armor, &result, &criteria)
    );
}
