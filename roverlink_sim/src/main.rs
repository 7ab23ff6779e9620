//! RoverLink Simulator CLI
//!
//! Runs built-in scenarios, or a mission read from a file, over the
//! simulated rover link.

use clap::Parser;
use roverlink_core::parse_mission;
use roverlink_env::AbortSignal;
use roverlink_sim::{
    simulate, LinkConfig, MissionExport, RetryPolicy, ScenarioId, ScenarioMetrics, ScenarioResult,
    ScenarioRunner, SimConfig,
};
use std::io::Read;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// RoverLink deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "roverlink-sim")]
#[command(about = "Drive simulated rovers over a faulty link", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (classic, scent_guard, flaky_link, blackout, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Mission file to run instead of the scenarios ("-" reads stdin)
    #[arg(short, long)]
    input: Option<String>,

    /// Number of consecutive seeds to run scenarios with
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Command failure probability for --input missions
    #[arg(long, default_value = "0.0")]
    command_failure_rate: f64,

    /// Connect failure probability for --input missions
    #[arg(long, default_value = "0.0")]
    connect_failure_rate: f64,

    /// Mid-batch link drop probability for --input missions
    #[arg(long, default_value = "0.0")]
    link_drop_rate: f64,

    /// Minimum simulated link delay (ms), for scenarios and missions
    #[arg(long, default_value = "5")]
    min_latency: u64,

    /// Maximum simulated link delay (ms), for scenarios and missions
    #[arg(long, default_value = "25")]
    max_latency: u64,

    /// Retries after the first attempt
    #[arg(long, default_value = "3")]
    max_retries: u32,

    /// Sleep on the wall clock instead of the virtual one
    #[arg(long)]
    real_time: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the run to a JSON file (single run only)
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    fn sim_config(&self, seed: u64) -> SimConfig {
        SimConfig::new(seed)
            .with_link(
                LinkConfig::default()
                    .with_latency(self.min_latency, self.max_latency)
                    .with_command_failure_rate(self.command_failure_rate)
                    .with_connect_failure_rate(self.connect_failure_rate)
                    .with_link_drop_rate(self.link_drop_rate),
            )
            .with_retry(RetryPolicy::default().with_max_retries(self.max_retries))
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
    }
}

fn write_export(export: &MissionExport, path: &str) -> bool {
    match export.write_to_file(path) {
        Ok(()) => {
            info!("Exported to {}", path);
            true
        }
        Err(e) => {
            error!("Export to {} failed: {}", path, e);
            false
        }
    }
}

/// Runs a mission file once and prints its result lines.
async fn run_input(args: &Args, path: &str, seed: u64) -> ExitCode {
    let text = match read_input(path) {
        Ok(text) => text,
        Err(e) => {
            error!("Cannot read {}: {}", path, e);
            return ExitCode::from(2);
        }
    };
    let mission = match parse_mission(&text) {
        Ok(mission) => mission,
        Err(e) => {
            error!("Invalid mission input: {}", e);
            return ExitCode::from(2);
        }
    };

    let config = args.sim_config(seed);
    let (report, elapsed_ms) =
        match simulate(&config, &mission, args.real_time, &AbortSignal::never()).await {
            Ok(done) => done,
            Err(e) => {
                error!("Mission aborted: {}", e);
                return ExitCode::FAILURE;
            }
        };

    let metrics = ScenarioMetrics::from_report(&report, elapsed_ms);
    let export = MissionExport::new(path, seed, &report, metrics);
    if args.json {
        match export.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Cannot serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }

    if let Some(export_path) = &args.export {
        if !write_export(&export, export_path) {
            return ExitCode::FAILURE;
        }
    }

    if report.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.json {
        info!("RoverLink Simulator v{}", env!("CARGO_PKG_VERSION"));
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if let Some(path) = args.input.clone() {
        return run_input(&args, &path, base_seed).await;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: classic, scent_guard, flaky_link, blackout, all");
                return ExitCode::from(2);
            }
        }
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        return ExitCode::from(2);
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds.max(1) {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed)
            .with_config(args.sim_config(seed))
            .with_real_time(args.real_time);

        for scenario in &scenarios {
            let result = runner.run(*scenario).await;

            if !args.json {
                if result.passed {
                    println!("PASS {} (seed={})", scenario.name(), seed);
                } else {
                    println!(
                        "FAIL {} (seed={}): {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
                for line in &result.lines {
                    println!("  {line}");
                }
            }
            all_results.push(result);
        }
    }

    if let Some(export_path) = &args.export {
        if let Some(result) = all_results.first() {
            if !write_export(&MissionExport::from(result), export_path) {
                return ExitCode::FAILURE;
            }
        }
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "lines": r.lines,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Cannot serialize summary: {}", e),
        }
    } else if failed_count == 0 {
        info!("All {} scenario runs passed", total);
    } else {
        error!("{}/{} scenario runs failed", failed_count, total);
    }

    if failed_count == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
