//! CLI entry point for the augment simulator

use augment_sim::{
    batch::{run_batch_parallel, BatchSimulator, CancelToken},
    config::ScenarioConfig,
    error::AugmentError,
    report::{describe_augment, ChangeSummary},
    stats::BatchSummary,
};
use clap::{Parser, ValueEnum};
use log::debug;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "augment-sim")]
#[command(version = "0.3")]
#[command(about = "Monte Carlo augment simulator for armor pieces", long_about = None)]
struct Args {
    /// Path to the scenario file (YAML or JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Attempt cap (overrides the scenario's batch settings)
    #[arg(short, long)]
    attempts: Option<u64>,

    /// Attempts per slice
    #[arg(long)]
    slice: Option<u64>,

    /// Seed for a reproducible batch
    #[arg(long)]
    seed: Option<u64>,

    /// Use parallel processing
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Worker threads for --parallel (defaults to the number of CPUs)
    #[arg(long)]
    threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    // Load config
    let mut config = match ScenarioConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(attempts) = args.attempts {
        config.batch.attempts = attempts;
    }
    if let Some(slice) = args.slice {
        config.batch.slice = slice;
    }
    if args.seed.is_some() {
        config.batch.seed = args.seed;
    }

    let threads = args.threads.unwrap_or_else(num_cpus::get);
    if args.parallel {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            eprintln!("Error starting thread pool: {}", e);
            std::process::exit(1);
        }
        debug!("rayon pool with {} threads", threads);
    }

    let criteria = config.criteria();
    let start = Instant::now();
    let outcome = if args.parallel {
        run_batch_parallel(config.request(), &criteria, &config.batch, &CancelToken::new())
    } else {
        BatchSimulator::new(config.request(), &criteria, config.batch.clone())
            .map(|mut batch| batch.run_to_end())
    };
    let elapsed = start.elapsed();

    let summary = match outcome {
        Ok(summary) => summary,
        Err(AugmentError::Infeasible(reason)) => {
            match args.output {
                OutputFormat::Text => println!("0% - {}", reason),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "feasible": false, "reason": reason.to_string() })
                ),
            }
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.output {
        OutputFormat::Text => print_text(&config, &summary),
        OutputFormat::Json => {
            let estimates: Vec<_> = summary
                .roll_estimates()
                .into_iter()
                .filter(|e| e.is_informative(summary.success_rate()))
                .collect();
            let samples: Vec<_> = summary
                .samples
                .iter()
                .map(|s| {
                    let changes = ChangeSummary::between(&config.armor, &s.armor);
                    serde_json::json!({
                        "title": changes.title(),
                        "changes": changes,
                        "result": s,
                    })
                })
                .collect();
            let output = serde_json::json!({
                "feasible": true,
                "armor": config.armor.name,
                "mode": config.mode,
                "budget": config.budget,
                "parallel": args.parallel,
                "elapsed_seconds": elapsed.as_secs_f64(),
                "attempts": summary.attempts,
                "matches": summary.matches,
                "success_rate": summary.success_rate(),
                "estimates": estimates,
                "samples": samples,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error writing JSON: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    if args.timing {
        println!();
        println!("--- Performance ---");
        println!("Total time: {:.3}s", elapsed.as_secs_f64());
        if summary.attempts > 0 {
            println!(
                "Per simulation: {:.4}ms",
                elapsed.as_secs_f64() * 1000.0 / summary.attempts as f64
            );
            println!(
                "Simulations/sec: {:.0}",
                summary.attempts as f64 / elapsed.as_secs_f64()
            );
        }
    }
}

fn print_text(config: &ScenarioConfig, summary: &BatchSummary) {
    let rate = summary.success_rate();
    println!("=== Augment Simulation Results ===");
    println!(
        "{} ({} mode, {} points)",
        config.armor.name, config.mode, config.budget
    );
    println!();
    println!("Attempts: {}", summary.attempts);
    println!("Matches:  {}", summary.matches);
    println!("Success rate: {:.4}%", rate * 100.0);
    if summary.cancelled {
        println!("(cancelled before the attempt cap)");
    }
    for estimate in summary.roll_estimates() {
        if !estimate.is_informative(rate) {
            continue;
        }
        match estimate.rolls {
            Some(rolls) => println!(
                "Roll {} times for {:.0}% success.",
                rolls,
                estimate.target * 100.0
            ),
            None => println!(
                "No viable estimate for {:.0}% success.",
                estimate.target * 100.0
            ),
        }
    }

    for (i, sample) in summary.samples.iter().enumerate() {
        println!();
        print!(
            "--- Sample {} --- {}",
            i + 1,
            ChangeSummary::between(&config.armor, &sample.armor)
        );
        println!(
            "  Decos        {} -> {}",
            config.armor.slots.stringify(),
            sample.armor.slots.stringify()
        );
        for applied in &sample.applied {
            println!("  * {}", describe_augment(applied));
        }
        println!(
            "  {} points left, {} rolls used",
            sample.remaining_points,
            sample.rolls_used()
        );
    }
}
