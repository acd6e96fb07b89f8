//! crisis-sim: headless player for crisis scenario datasets.
//!
//! Loads a JSON fixture (or a seeded synthetic flood), then plays it back in
//! real time, replays it as fast as possible, or prints the derived timeline.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use crisis_sim_core::clock::format_iso;
use crisis_sim_core::config::SimulationConfig;
use crisis_sim_core::dataset::Dataset;
use crisis_sim_core::events::{RawScriptedEvent, SimEvent};
use crisis_sim_core::runner::{run_realtime, run_until_finished, RunSummary};
use crisis_sim_core::scenario::{build_dataset, ScenarioParams};
use crisis_sim_core::service::SimulationService;
use crisis_sim_core::situation::SituationBoard;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crisis-sim")]
#[command(about = "Play back timestamped crisis scenarios")]
struct Cli {
    /// Debug logging for the simulation core (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play back in real time at the configured speed
    Play {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        playback: PlaybackArgs,
        /// Stop after this many wall-clock seconds
        #[arg(long)]
        max_wall_secs: Option<u64>,
    },
    /// Replay as fast as possible with a fixed virtual tick
    Replay {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        playback: PlaybackArgs,
        /// Wall-clock seconds fed to each virtual tick
        #[arg(long, default_value = "1")]
        step_secs: u64,
    },
    /// Print the derived timeline and load report without playing
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
        /// Emit the timeline as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to a scenario dataset (JSON)
    #[arg(long, env = "CRISIS_SIM_DATASET", conflicts_with = "demo")]
    dataset: Option<PathBuf>,

    /// Use a generated flood scenario instead of a dataset file
    #[arg(long)]
    demo: bool,

    /// Seed for --demo
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Args, Debug)]
struct PlaybackArgs {
    /// Playback configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated milliseconds per wall millisecond
    #[arg(long)]
    speed: Option<f64>,

    /// Wall-clock interval between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Print dispatched events as JSON lines
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,crisis_sim_core=debug")
        } else {
            EnvFilter::new("warn,crisis_sim_cli=info,crisis_sim_core=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Play {
            source,
            playback,
            max_wall_secs,
        } => {
            let (service, board) = prepare(&source, &playback)?;
            let summary = run_realtime(&service, max_wall_secs.map(Duration::from_secs), |_, _| {});
            report(&service, &board.borrow(), &summary);
        }
        Command::Replay {
            source,
            playback,
            step_secs,
        } => {
            if step_secs == 0 {
                bail!("--step-secs must be at least 1");
            }
            let (service, board) = prepare(&source, &playback)?;
            let summary = run_until_finished(&service, Duration::from_secs(step_secs), usize::MAX);
            report(&service, &board.borrow(), &summary);
        }
        Command::Inspect { source, json } => inspect(&load_dataset(&source)?, json)?,
    }
    Ok(())
}

fn load_dataset(source: &SourceArgs) -> Result<Dataset> {
    match (&source.dataset, source.demo) {
        (Some(path), _) => Dataset::from_path(path)
            .with_context(|| format!("failed to load dataset {}", path.display())),
        (None, true) => Ok(build_dataset(&ScenarioParams::default().with_seed(source.seed))),
        (None, false) => bail!("pass --dataset <PATH> or --demo"),
    }
}

fn load_config(playback: &PlaybackArgs) -> Result<SimulationConfig> {
    let mut config = match &playback.config {
        Some(path) => SimulationConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(speed) = playback.speed {
        if !(speed.is_finite() && speed > 0.0) {
            bail!("--speed must be a positive number, got {speed}");
        }
        config = config.with_speed(speed);
    }
    if let Some(tick_ms) = playback.tick_ms {
        config = config.with_tick_interval_ms(tick_ms);
    }
    Ok(config.normalized())
}

type Board = std::rc::Rc<std::cell::RefCell<SituationBoard>>;

/// Builds the service, loads the dataset and wires the event printer and
/// situation board. Subscriptions live as long as the service.
fn prepare(source: &SourceArgs, playback: &PlaybackArgs) -> Result<(SimulationService, Board)> {
    let dataset = load_dataset(source)?;
    let service = SimulationService::new(load_config(playback)?);
    let loaded = service.load_data(&dataset);
    let (start, end) = service.bounds();
    info!(
        name = %dataset.name,
        events = loaded.merge.added,
        rejected = loaded.rejected.len(),
        start = %format_iso(start),
        end = %format_iso(end),
        "scenario ready"
    );

    let json = playback.json;
    let printer = service.downgrade();
    let _printer = service.on_any(move |event| {
        let SimEvent::Scripted(scripted) = event else {
            return;
        };
        if json {
            match serde_json::to_string(scripted) {
                Ok(line) => println!("{line}"),
                Err(error) => tracing::warn!(%error, "failed to encode event"),
            }
        } else if let Some(service) = printer.upgrade() {
            println!(
                "[{}] {:30} {}",
                service.format_time(scripted.timestamp),
                scripted.event_type().as_str(),
                scripted.kind.summary()
            );
        }
    });
    let (board, _board_subscription) = SituationBoard::attach(service.bus());
    Ok((service, board))
}

fn report(service: &SimulationService, board: &SituationBoard, summary: &RunSummary) {
    let state = service.state();
    info!(
        ticks = summary.ticks,
        events = summary.events_dispatched,
        finished = summary.finished,
        time = %service.format_time(summary.final_time),
        progress = service.time_progress(),
        phase = state.phase.as_str(),
        "playback ended"
    );
    eprintln!(
        "phase: {} | escalated authorities: {} | evacuated: {} | \
         resources deployed: {} | alerts: {}",
        board.phase.as_str(),
        board.escalated_authorities(),
        board.evacuated_population(),
        board.resources.len(),
        board.sensor_alerts.len()
    );
}

fn inspect(dataset: &Dataset, json: bool) -> Result<()> {
    let report = dataset.scripted_events();
    let mut events = report.events;
    events.sort_by_key(|event| event.timestamp);

    if json {
        let timeline: Vec<RawScriptedEvent> =
            events.iter().map(RawScriptedEvent::from_event).collect();
        println!("{}", serde_json::to_string_pretty(&timeline)?);
    } else {
        let name = if dataset.name.is_empty() {
            "(unnamed scenario)"
        } else {
            dataset.name.as_str()
        };
        println!("{name}");
        match dataset.declared_bounds() {
            Some((start, end)) => println!("window: {} .. {}", format_iso(start), format_iso(end)),
            None => println!("window: derived from events"),
        }
        println!(
            "{} authorities, {} resources, {} monitoring stations",
            dataset.authorities.len(),
            dataset.resources.len(),
            dataset.monitoring_stations.len()
        );
        println!("\n{} scripted events:", events.len());
        for event in &events {
            println!(
                "  {}  {:30} {}",
                format_iso(event.timestamp),
                event.event_type().as_str(),
                event.kind.summary()
            );
        }
    }

    if !report.rejected.is_empty() {
        eprintln!("\n{} rejected entries:", report.rejected.len());
        for rejected in &report.rejected {
            eprintln!("  {}: {}", rejected.source, rejected.error);
        }
    }
    Ok(())
}
