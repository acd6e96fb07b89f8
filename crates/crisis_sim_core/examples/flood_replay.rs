//! Replay a seeded synthetic flood and print the event feed and final board.
//!
//! Run with: cargo run -p crisis_sim_core --example flood_replay

use std::time::Duration;

use crisis_sim_core::config::SimulationConfig;
use crisis_sim_core::runner::run_until_finished;
use crisis_sim_core::scenario::{build_dataset, ScenarioParams};
use crisis_sim_core::service::SimulationService;
use crisis_sim_core::situation::SituationBoard;

fn main() {
    const SEED: u64 = 2024;
    const SCENARIO_HOURS: u32 = 12;

    let dataset = build_dataset(
        &ScenarioParams::default()
            .with_seed(SEED)
            .with_duration_hours(SCENARIO_HOURS)
            .with_evacuation_zones(4, 2),
    );

    // Ten simulated minutes per one-second tick.
    let service = SimulationService::new(SimulationConfig::default().with_speed(600.0));
    let loaded = service.load_data(&dataset);
    let (board, _subscription) = SituationBoard::attach(service.bus());

    let summary = run_until_finished(&service, Duration::from_secs(1), 10_000);

    println!("--- Flood replay ({}h scenario, seed {}) ---", SCENARIO_HOURS, SEED);
    println!("Scripted events: {} ({} rejected)", loaded.merge.added, loaded.rejected.len());
    println!("Ticks: {}", summary.ticks);
    println!("Finished: {} at {}", summary.finished, service.format_time(summary.final_time));

    println!("\nEvent feed:");
    for entry in service.event_log() {
        println!(
            "  {}  {:32} {}",
            service.format_time(entry.timestamp),
            entry.event_type.as_str(),
            entry.summary
        );
    }

    let board = board.borrow();
    println!("\nFinal phase: {}", board.phase.as_str());
    println!("Escalated authorities: {}", board.escalated_authorities());
    println!("Residents evacuated: {}", board.evacuated_population());
    println!("Resources deployed: {}", board.resources.len());

    service.metrics().print_summary();
}
