//! Playback drivers: feed wall-clock time into a [SimulationService].
//!
//! The service only moves when ticked. [run_realtime] ticks at the configured
//! interval with the measured wall time between ticks, the way a dashboard
//! frame loop would. [run_until_finished] feeds a fixed step without sleeping,
//! for tests, benches and headless replays.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::clock::SimTime;
use crate::service::{SimulationService, TickOutcome};

/// What a run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Ticks that advanced the clock.
    pub ticks: usize,
    pub events_dispatched: usize,
    pub final_time: SimTime,
    pub finished: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: &TickOutcome) {
        if outcome.advanced {
            self.ticks += 1;
        }
        self.events_dispatched += outcome.dispatched;
        self.final_time = outcome.now;
    }
}

/// Ticks `max_ticks` times with `step` of wall time each, without sleeping.
/// Returns the number of ticks that advanced the clock.
pub fn run_ticks(service: &SimulationService, step: Duration, max_ticks: usize) -> usize {
    (0..max_ticks)
        .map(|_| service.tick(step))
        .filter(|outcome| outcome.advanced)
        .count()
}

/// Starts the service if needed and ticks with `step` until the simulation
/// finishes, something pauses or stops it, or `max_ticks` is reached.
pub fn run_until_finished(
    service: &SimulationService,
    step: Duration,
    max_ticks: usize,
) -> RunSummary {
    run_until_finished_with_hook(service, step, max_ticks, |_, _| {})
}

/// Like [run_until_finished], invoking `hook` after every tick.
pub fn run_until_finished_with_hook<F>(
    service: &SimulationService,
    step: Duration,
    max_ticks: usize,
    mut hook: F,
) -> RunSummary
where
    F: FnMut(&SimulationService, &TickOutcome),
{
    let mut summary = RunSummary {
        final_time: service.current_time(),
        ..RunSummary::default()
    };
    if !service.state().is_running {
        service.start();
    }
    for _ in 0..max_ticks {
        let outcome = service.tick(step);
        summary.record(&outcome);
        hook(service, &outcome);
        if !outcome.advanced || service.is_finished() || !service.state().is_running {
            break;
        }
    }
    summary.finished = service.is_finished();
    debug!(
        ticks = summary.ticks,
        events = summary.events_dispatched,
        finished = summary.finished,
        "run ended"
    );
    summary
}

/// Plays back in real time: sleeps for the configured tick interval between
/// ticks and hands the service the wall time that actually elapsed. Returns
/// when the simulation finishes or stops running, or after `max_wall`.
pub fn run_realtime<F>(
    service: &SimulationService,
    max_wall: Option<Duration>,
    mut hook: F,
) -> RunSummary
where
    F: FnMut(&SimulationService, &TickOutcome),
{
    let interval = service.tick_interval();
    let started = Instant::now();
    let mut last = started;
    let mut summary = RunSummary {
        final_time: service.current_time(),
        ..RunSummary::default()
    };
    if !service.state().is_running {
        service.start();
    }
    info!(interval_ms = interval.as_millis() as u64, "real-time playback started");

    loop {
        std::thread::sleep(interval);
        let now = Instant::now();
        let outcome = service.tick(now.duration_since(last));
        last = now;
        summary.record(&outcome);
        hook(service, &outcome);

        if service.is_finished() || !service.state().is_running {
            break;
        }
        if max_wall.is_some_and(|limit| now.duration_since(started) >= limit) {
            debug!("wall-clock budget exhausted");
            break;
        }
    }
    summary.finished = service.is_finished();
    info!(
        ticks = summary.ticks,
        events = summary.events_dispatched,
        finished = summary.finished,
        "real-time playback ended"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::test_helpers::disaster_at;

    fn service(end: SimTime) -> SimulationService {
        SimulationService::new(
            SimulationConfig::default()
                .with_bounds(0, end)
                .with_speed(1.0)
                .with_tick_interval_ms(1),
        )
    }

    #[test]
    fn runs_to_completion() {
        let service = service(10_000);
        service.load_events(vec![disaster_at(2_000), disaster_at(7_500)]);
        let summary = run_until_finished(&service, Duration::from_secs(1), 100);
        assert!(summary.finished);
        assert_eq!(summary.ticks, 10);
        assert_eq!(summary.events_dispatched, 2);
        assert_eq!(summary.final_time, 10_000);
    }

    #[test]
    fn max_ticks_caps_the_run() {
        let service = service(10_000);
        let summary = run_until_finished(&service, Duration::from_secs(1), 3);
        assert!(!summary.finished);
        assert_eq!(summary.final_time, 3_000);
    }

    #[test]
    fn pause_from_hook_ends_the_run() {
        let service = service(10_000);
        let pause_at_four = |svc: &SimulationService, outcome: &TickOutcome| {
            if outcome.now >= 4_000 {
                svc.pause();
            }
        };
        let summary =
            run_until_finished_with_hook(&service, Duration::from_secs(1), 100, pause_at_four);
        assert!(!summary.finished);
        assert_eq!(summary.final_time, 4_000);
    }

    #[test]
    fn ticks_are_idle_when_not_started() {
        let service = service(10_000);
        assert_eq!(run_ticks(&service, Duration::from_secs(1), 5), 0);
        service.start();
        assert_eq!(run_ticks(&service, Duration::from_secs(1), 5), 5);
    }

    #[test]
    fn realtime_run_respects_wall_budget() {
        // One simulated day at 1x cannot finish in 20ms of wall time.
        let service = service(86_400_000);
        let summary = run_realtime(&service, Some(Duration::from_millis(20)), |_, _| {});
        assert!(!summary.finished);
        assert!(summary.ticks >= 1);
        assert!(service.state().is_running);
    }
}
