#![allow(dead_code)]

use std::time::Duration;

use crisis_sim_core::clock::SimTime;
use crisis_sim_core::config::SimulationConfig;
use crisis_sim_core::service::SimulationService;
use crisis_sim_core::test_helpers::disaster_at;

/// Service over `[start, end]` at the given speed, not started.
pub fn service_with_bounds(start: SimTime, end: SimTime, speed: f64) -> SimulationService {
    SimulationService::new(
        SimulationConfig::default()
            .with_bounds(start, end)
            .with_speed(speed),
    )
}

/// Service over `[0, 10s]` at 1x with disaster reports at each timestamp.
pub fn scripted_service(timestamps: &[SimTime]) -> SimulationService {
    let service = service_with_bounds(0, 10_000, 1.0);
    service.load_events(timestamps.iter().copied().map(disaster_at).collect());
    service
}

pub fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

pub fn millis(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
