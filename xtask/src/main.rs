use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

const FIXTURE: &str = "crates/crisis_sim_core/fixtures/flood_scenario.json";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the crisis simulation workspace",
    long_about = "A unified CLI for playing scenarios, running benchmarks,\n\
                  and CI checks in the crisis simulation workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the bundled flood fixture in real time
    Play {
        /// Simulated milliseconds per wall millisecond
        #[arg(long, default_value = "600")]
        speed: String,
    },
    /// Replay the bundled flood fixture as fast as possible
    Replay,
    /// Print the bundled fixture's derived timeline
    Inspect,
    /// Run the flood_replay example on a generated scenario
    Example,
    /// Run Criterion benchmarks
    Bench,
    /// Compare benchmarks: stash changes, create baseline, restore, compare
    BenchCompare,
    /// Run CI checks (fmt, clippy, tests, examples, benchmarks)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Build and run the examples and the CLI against the fixture
    Examples,
    /// Run benchmarks
    Bench,
    /// Run check + examples + bench
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn spawn(program: &str, args: &[&str]) -> ExitStatus {
    eprintln!("+ {program} {}", args.join(" "));
    Command::new(program).args(args).status().unwrap_or_else(|error| {
        eprintln!("failed to execute {program}: {error}");
        exit(1)
    })
}

fn run(program: &str, args: &[&str]) {
    let status = spawn(program, args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_cargo(args: &[&str]) {
    run("cargo", args);
}

fn run_git(args: &[&str]) {
    run("git", args);
}

fn run_cli(args: &[&str]) {
    let mut cargo_args = vec!["run", "-p", "crisis_sim_cli", "--release", "--"];
    cargo_args.extend_from_slice(args);
    run_cargo(&cargo_args);
}

fn bench(extra: &[&str]) {
    let mut args = vec!["bench", "--package", "crisis_sim_core", "--bench", "performance"];
    if !extra.is_empty() {
        args.push("--");
        args.extend_from_slice(extra);
    }
    run_cargo(&args);
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test crisis_sim_core");
    run_cargo(&["test", "-p", "crisis_sim_core"]);

    step("Test crisis_sim_cli");
    run_cargo(&["test", "-p", "crisis_sim_cli"]);
}

fn ci_examples() {
    step("Run flood_replay (generated scenario)");
    run_cargo(&[
        "run",
        "-p",
        "crisis_sim_core",
        "--example",
        "flood_replay",
        "--release",
    ]);

    step("Inspect bundled fixture");
    run_cli(&["inspect", "--dataset", FIXTURE]);

    step("Replay bundled fixture");
    run_cli(&["replay", "--dataset", FIXTURE, "--speed", "3600"]);
}

fn ci_bench() {
    step("Run benchmarks");
    bench(&[]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play { speed } => {
            run_cli(&["play", "--dataset", FIXTURE, "--speed", &speed]);
        }
        Commands::Replay => {
            run_cli(&["replay", "--dataset", FIXTURE, "--speed", "3600"]);
        }
        Commands::Inspect => {
            run_cli(&["inspect", "--dataset", FIXTURE]);
        }
        Commands::Example => {
            run_cargo(&["run", "-p", "crisis_sim_core", "--example", "flood_replay"]);
        }
        Commands::Bench => bench(&[]),
        Commands::BenchCompare => {
            let baseline_dir = Path::new("target/criterion");
            if baseline_dir.exists() {
                step("Removing existing benchmark data");
                if let Err(error) = std::fs::remove_dir_all(baseline_dir) {
                    eprintln!("failed to remove target/criterion: {error}");
                    exit(1);
                }
            }

            step("Stashing current changes");
            run_git(&[
                "stash",
                "push",
                "-m",
                "Temporary stash for benchmark comparison",
            ]);

            step("Running benchmark to create baseline");
            bench(&["--save-baseline", "main"]);

            step("Reapplying changes");
            run_git(&["stash", "pop"]);

            step("Running benchmark comparing against baseline");
            bench(&["--baseline", "main"]);

            eprintln!("\nDone! Check the output above to see performance comparison.");
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Examples => ci_examples(),
                CiJob::Bench => ci_bench(),
                CiJob::All => {
                    ci_check();
                    ci_examples();
                    ci_bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
