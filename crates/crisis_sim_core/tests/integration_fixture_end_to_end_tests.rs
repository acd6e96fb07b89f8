mod support;

use std::time::Duration;

use crisis_sim_core::clock::{parse_timestamp, ONE_HOUR_MS};
use crisis_sim_core::config::SimulationConfig;
use crisis_sim_core::events::{EventType, SimEvent};
use crisis_sim_core::runner::{run_until_finished, run_until_finished_with_hook};
use crisis_sim_core::scenario::{build_dataset, ScenarioParams};
use crisis_sim_core::service::SimulationService;
use crisis_sim_core::situation::{PoiLayer, SituationBoard};
use crisis_sim_core::state::Phase;
use crisis_sim_core::test_helpers::Recorder;
use support::fixtures::{flood_fixture, flood_fixture_path, FIXTURE_EVENT_COUNT};

/// One simulated hour per wall-clock second.
fn hourly_service() -> SimulationService {
    SimulationService::new(SimulationConfig::default().with_speed(3_600.0))
}

#[test]
fn fixture_loads_with_declared_bounds_and_one_reject() {
    let service = hourly_service();
    let summary = service.load_data(&flood_fixture());

    assert_eq!(summary.merge.added, FIXTURE_EVENT_COUNT);
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.rejected[0].source, "events[5]");
    let start = parse_timestamp("2024-06-01T06:00:00Z").expect("valid");
    assert_eq!(service.bounds(), (start, start + 12 * ONE_HOUR_MS));
    assert_eq!(service.current_time(), start);
    assert_eq!(service.format_time(start), "2024-06-01 06:00:00");
}

#[test]
fn loading_the_same_dataset_twice_is_idempotent() {
    let service = hourly_service();
    let dataset = flood_fixture();
    service.load_data(&dataset);
    let again = service.load_data(&dataset);
    assert_eq!(again.merge.added, 0);
    assert_eq!(again.merge.duplicates, FIXTURE_EVENT_COUNT);
    assert_eq!(service.timeline_len(), FIXTURE_EVENT_COUNT);

    let summary = run_until_finished(&service, Duration::from_secs(1), 100);
    assert_eq!(summary.events_dispatched, FIXTURE_EVENT_COUNT);
}

#[test]
fn reload_while_running_does_not_replay() {
    let service = hourly_service();
    let dataset = flood_fixture();
    service.load_data(&dataset);
    service.start();
    for _ in 0..5 {
        service.tick(Duration::from_secs(1));
    }
    let before = service.metrics().events_dispatched;
    assert!(before > 0);

    service.load_data(&dataset);
    assert!(service.state().is_running);
    service.tick(Duration::from_millis(1));
    assert_eq!(service.metrics().events_dispatched, before);
}

#[test]
fn full_replay_walks_through_every_phase() {
    let service = hourly_service();
    service.load_data(&flood_fixture());
    let (board, board_subscription) = SituationBoard::attach(service.bus());
    let (recorder, _recorder_subscription) = Recorder::attach(service.bus());

    let mut phases = Vec::new();
    let summary = run_until_finished_with_hook(
        &service,
        Duration::from_secs(1),
        100,
        |service, _| {
            let phase = service.state().phase;
            if phases.last() != Some(&phase) {
                phases.push(phase);
            }
        },
    );

    assert!(summary.finished);
    assert_eq!(summary.ticks, 12);
    assert_eq!(summary.events_dispatched, FIXTURE_EVENT_COUNT);
    assert_eq!(
        phases,
        vec![
            Phase::Escalation,
            Phase::Evacuation,
            Phase::Response,
            Phase::Recovery
        ]
    );
    assert_eq!(recorder.count(EventType::SimulationFinished), 1);
    assert!(matches!(
        recorder.events().last(),
        Some(SimEvent::SimulationFinished(_))
    ));
    assert_eq!(service.time_progress(), 100.0);

    let board = board.borrow();
    assert_eq!(board.phase, Phase::Recovery);
    assert_eq!(board.escalated_authorities(), 2);
    assert_eq!(board.evacuated_population(), 2_450);
    assert_eq!(board.resources.len(), 3);
    assert_eq!(board.sensor_alerts.len(), 2);
    assert_eq!(board.disasters.len(), 2);
    assert_eq!(board.evacuations["EZ-01"].livestock, Some((4, 320)));
    assert_eq!(board.visible_layers(), PoiLayer::ALL.to_vec());
    drop(board);
    board_subscription.unsubscribe();
}

#[test]
fn event_log_summaries_follow_dispatch_order() {
    let service = hourly_service();
    service.load_data(&flood_fixture());
    run_until_finished(&service, Duration::from_secs(1), 100);

    let log = service.event_log();
    assert_eq!(log.len(), FIXTURE_EVENT_COUNT);
    assert!(log.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    assert_eq!(log[0].event_type, EventType::DisasterEvent);
    assert_eq!(
        log[1].summary,
        "Gauge Dresden Augustusbruecke: water_level_cm at 612 (threshold 450, critical)"
    );
    assert_eq!(log[3].summary, "Fire Brigade Dresden: standby -> alert");
}

#[test]
fn stop_then_replay_delivers_the_script_again() {
    let service = hourly_service();
    service.load_data(&flood_fixture());
    let (board, _subscription) = SituationBoard::attach(service.bus());
    run_until_finished(&service, Duration::from_secs(1), 100);
    assert!(service.stop());
    assert!(board.borrow().evacuations.is_empty());
    assert_eq!(service.state().phase, Phase::Detection);

    let summary = run_until_finished(&service, Duration::from_secs(1), 100);
    assert!(summary.finished);
    assert_eq!(summary.events_dispatched, FIXTURE_EVENT_COUNT);
    assert_eq!(service.event_log().len(), 2 * FIXTURE_EVENT_COUNT);
}

#[test]
fn generated_scenario_replays_to_completion() {
    let dataset = build_dataset(&ScenarioParams::default().with_seed(11));
    let service = hourly_service();
    let loaded = service.load_data(&dataset);
    assert!(loaded.rejected.is_empty());

    let summary = run_until_finished(&service, Duration::from_secs(1), 100);
    assert!(summary.finished);
    assert_eq!(summary.events_dispatched, loaded.merge.added);
    assert_eq!(service.state().phase, Phase::Recovery);
}

#[test]
fn config_file_overrides_dataset_bounds() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("playback.json");
    let json = r#"{
        "start_time": "2024-06-01T09:00:00Z",
        "end_time": "2024-06-01T12:00:00Z",
        "speed": 3600.0
    }"#;
    std::fs::write(&path, json).expect("write config");
    let config = SimulationConfig::from_path(&path).expect("valid config");
    let service = SimulationService::new(config);
    service.load_data(&flood_fixture());

    let start = parse_timestamp("2024-06-01T09:00:00Z").expect("valid");
    assert_eq!(service.bounds(), (start, start + 3 * ONE_HOUR_MS));
    assert!(flood_fixture_path().exists());

    let summary = run_until_finished(&service, Duration::from_secs(1), 100);
    // Everything before 10:00 is due on the first tick; deployments after
    // noon lie outside the window.
    assert!(summary.finished);
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.events_dispatched, 10);
    assert_eq!(service.pending_events(), 2);
}
