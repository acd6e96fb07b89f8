//! Simulation service: composes [SimulationClock], [TimelineDriver] and [EventBus].
//!
//! Every tick advances the clock, drains the newly crossed scripted events and
//! publishes each under its own type, followed by one `time_advanced` carrying
//! the updated [SimulationState].
//!
//! The service is a cheap-to-clone handle to single-threaded shared state. No
//! borrow of that state is held while subscribers run, so callbacks may call
//! back into the service. Control calls made from a callback change the state
//! at once, but their notifications are queued behind everything the dispatch
//! in progress still has to deliver, so subscribers always observe scripted
//! events in timestamp order followed by their `time_advanced`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::bus::{EventBus, Subscription};
use crate::clock::{format_time, SimTime, SimulationClock};
use crate::config::SimulationConfig;
use crate::dataset::{Dataset, RejectedEvent};
use crate::error::ControlError;
use crate::events::{EventType, ScriptedEvent, SimEvent};
use crate::profiling::DispatchMetrics;
use crate::state::{Phase, SimulationState};
use crate::telemetry::{EventLog, LoggedEvent};
use crate::timeline::{MergeOutcome, TimelineDriver};

/// Result of [SimulationService::load_data].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    pub merge: MergeOutcome,
    pub rejected: Vec<RejectedEvent>,
}

/// Result of one [SimulationService::tick].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Simulation time after the tick.
    pub now: SimTime,
    /// `false` when the clock was not running.
    pub advanced: bool,
    /// Scripted events delivered in this tick.
    pub dispatched: usize,
}

struct Engine {
    config: SimulationConfig,
    clock: SimulationClock,
    timeline: TimelineDriver,
    phase: Phase,
    finished: bool,
    /// Bumped by every stop, so a pending end-of-run check from an earlier
    /// run can tell it is stale.
    run: u64,
    /// Window declared by the most recently loaded dataset.
    declared_bounds: Option<(SimTime, SimTime)>,
    log: EventLog,
    metrics: DispatchMetrics,
}

impl Engine {
    fn state(&self) -> SimulationState {
        SimulationState {
            current_time: self.clock.now(),
            is_running: self.clock.is_running(),
            status: self.clock.status(),
            speed: self.clock.speed(),
            phase: self.phase,
        }
    }

    /// Explicit config bounds win; otherwise the dataset's declared window,
    /// otherwise the script's span plus padding.
    fn refresh_bounds(&mut self) {
        let padding = self.config.bounds_padding_ms;
        let derived = self.declared_bounds.or_else(|| {
            self.timeline.span().map(|(first, last)| {
                (first.saturating_sub(padding), last.saturating_add(padding))
            })
        });
        let start = self
            .config
            .start_time
            .or(derived.map(|(start, _)| start))
            .unwrap_or(self.clock.start_time());
        let end = self
            .config
            .end_time
            .or(derived.map(|(_, end)| end))
            .unwrap_or(self.clock.end_time())
            .max(start);
        if (start, end) != (self.clock.start_time(), self.clock.end_time()) {
            debug!(start, end, "playback bounds updated");
            self.clock.set_bounds(start, end);
        }
    }

    /// Marks the run finished once the clock sits at the end with nothing
    /// left to fire inside the window. Returns the notifications to deliver.
    fn settle_finish(&mut self, run: u64) -> Vec<SimEvent> {
        let end = self.clock.end_time();
        // Events scripted after the end of the window can never fire.
        let done = run == self.run
            && !self.finished
            && self.clock.is_at_end()
            && self.timeline.next_timestamp().map_or(true, |next| next > end);
        if !done {
            return Vec::new();
        }
        self.finished = true;
        self.phase = Phase::Recovery;
        info!(time = %format_time(self.clock.now()), "simulation finished");
        let mut notifications = Vec::with_capacity(2);
        if self.clock.pause() {
            notifications.push(SimEvent::SimulationPaused(self.state()));
        }
        notifications.push(SimEvent::SimulationFinished(self.state()));
        notifications
    }

    fn rewind(&mut self) {
        let start = self.clock.start_time();
        self.clock.set_time(start);
        self.timeline.rewind();
        self.phase = Phase::Detection;
        self.finished = false;
    }
}

enum Outgoing {
    Notify(SimEvent),
    /// End-of-run check for the given run, settled at delivery time.
    FinishCheck(u64),
}

struct Shared {
    engine: RefCell<Engine>,
    bus: EventBus,
    outbox: RefCell<VecDeque<Outgoing>>,
    delivering: Cell<bool>,
}

impl Shared {
    /// Queues `items` and delivers the queue unless a delivery further up the
    /// stack is already draining it.
    fn publish(&self, items: impl IntoIterator<Item = Outgoing>) {
        self.outbox.borrow_mut().extend(items);
        if self.delivering.replace(true) {
            return;
        }
        loop {
            let next = self.outbox.borrow_mut().pop_front();
            match next {
                Some(Outgoing::Notify(event)) => self.bus.emit(&event),
                Some(Outgoing::FinishCheck(run)) => {
                    let notifications = self.engine.borrow_mut().settle_finish(run);
                    for event in &notifications {
                        self.bus.emit(event);
                    }
                }
                None => break,
            }
        }
        self.delivering.set(false);
    }

    fn notify(&self, event: SimEvent) {
        self.publish([Outgoing::Notify(event)]);
    }
}

#[derive(Clone)]
pub struct SimulationService {
    shared: Rc<Shared>,
}

/// Non-owning handle, for callbacks that need to control the service they
/// are subscribed to without keeping it alive.
#[derive(Clone)]
pub struct WeakSimulationService {
    shared: Weak<Shared>,
}

impl WeakSimulationService {
    pub fn upgrade(&self) -> Option<SimulationService> {
        self.shared.upgrade().map(|shared| SimulationService { shared })
    }
}

impl std::fmt::Debug for SimulationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationService")
            .field("state", &self.state())
            .field("events", &self.timeline_len())
            .finish()
    }
}

impl Default for SimulationService {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl SimulationService {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_bus(config, EventBus::new())
    }

    /// Uses an externally owned bus, e.g. one shared with other dashboard
    /// components.
    pub fn with_bus(config: SimulationConfig, bus: EventBus) -> Self {
        let config = config.normalized();
        let start = config.start_time.unwrap_or(0);
        let end = config.end_time.unwrap_or(start);
        let engine = Engine {
            clock: SimulationClock::new(start, end, config.speed),
            timeline: TimelineDriver::new(),
            phase: Phase::Detection,
            finished: false,
            run: 0,
            declared_bounds: None,
            log: EventLog::with_capacity(config.event_log_capacity),
            metrics: DispatchMetrics::default(),
            config,
        };
        Self {
            shared: Rc::new(Shared {
                engine: RefCell::new(engine),
                bus,
                outbox: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakSimulationService {
        WeakSimulationService {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    pub fn on<F>(&self, event_type: EventType, callback: F) -> Subscription
    where
        F: Fn(&SimEvent) + 'static,
    {
        self.shared.bus.subscribe(event_type, callback)
    }

    pub fn on_any<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SimEvent) + 'static,
    {
        self.shared.bus.subscribe_all(callback)
    }

    /// Merges the dataset's scripted events into the timeline. Safe to call
    /// repeatedly and while running: events already loaded are not added again
    /// and events already behind the playback position never fire.
    pub fn load_data(&self, dataset: &Dataset) -> LoadSummary {
        let report = dataset.scripted_events();
        let merge = {
            let mut engine = self.shared.engine.borrow_mut();
            if let Some(bounds) = dataset.declared_bounds() {
                engine.declared_bounds = Some(bounds);
            }
            self.merge_locked(&mut engine, report.events)
        };
        info!(
            dataset = %dataset.name,
            added = merge.added,
            duplicates = merge.duplicates,
            passed = merge.passed,
            rejected = report.rejected.len(),
            "dataset loaded"
        );
        LoadSummary {
            merge,
            rejected: report.rejected,
        }
    }

    /// Merges already-parsed events, with the same rules as [Self::load_data].
    pub fn load_events(&self, events: Vec<ScriptedEvent>) -> MergeOutcome {
        let mut engine = self.shared.engine.borrow_mut();
        self.merge_locked(&mut engine, events)
    }

    fn merge_locked(
        &self,
        engine: &mut Engine,
        events: Vec<ScriptedEvent>,
    ) -> MergeOutcome {
        let merge = engine.timeline.merge(events);
        if merge.added > merge.passed {
            engine.finished = false;
        }
        engine.refresh_bounds();
        merge
    }

    pub fn start(&self) -> bool {
        let state = {
            let mut engine = self.shared.engine.borrow_mut();
            if !engine.clock.start() {
                return false;
            }
            engine.state()
        };
        info!(
            time = %format_time(state.current_time),
            speed = state.speed,
            "simulation started"
        );
        self.shared.notify(SimEvent::SimulationStarted(state));
        true
    }

    pub fn pause(&self) -> bool {
        let state = {
            let mut engine = self.shared.engine.borrow_mut();
            if !engine.clock.pause() {
                return false;
            }
            engine.state()
        };
        info!(time = %format_time(state.current_time), "simulation paused");
        self.shared.notify(SimEvent::SimulationPaused(state));
        true
    }

    /// Ends the run: rewinds to the start time and re-arms every scripted
    /// event so the next `start` replays the script. The event log is kept.
    pub fn stop(&self) -> bool {
        let (stopped, state) = {
            let mut engine = self.shared.engine.borrow_mut();
            let stopped = engine.clock.stop();
            if stopped {
                engine.run += 1;
            }
            engine.rewind();
            (stopped, engine.state())
        };
        if stopped {
            info!("simulation stopped");
            self.shared.notify(SimEvent::SimulationStopped(state));
        }
        stopped
    }

    /// Invalid multipliers are rejected and the previous speed is kept.
    pub fn set_speed(&self, speed: f64) -> Result<(), ControlError> {
        let result = self.shared.engine.borrow_mut().clock.set_speed(speed);
        match &result {
            Ok(()) => debug!(speed, "speed changed"),
            Err(error) => warn!(%error, "ignoring speed change"),
        }
        result
    }

    /// Absolute seek, clamped to the playback bounds. Events skipped by a
    /// forward seek are dispatched immediately, in order, followed by
    /// `time_advanced`; a backward seek fires nothing again.
    pub fn set_time(&self, time: SimTime) -> SimTime {
        let now = {
            let mut engine = self.shared.engine.borrow_mut();
            let now = engine.clock.set_time(time);
            if now != time {
                debug!(requested = time, clamped = now, "seek clamped to bounds");
            }
            if now < engine.clock.end_time() {
                engine.finished = false;
            }
            if engine.timeline.seek(now) > 0 {
                engine.metrics.catch_up_passes += 1;
            }
            now
        };
        self.dispatch_at(now);
        now
    }

    /// Advances the clock by `wall_elapsed` and dispatches what it crossed.
    /// Does nothing unless running.
    pub fn tick(&self, wall_elapsed: Duration) -> TickOutcome {
        let started = Instant::now();
        let ticked = self.shared.engine.borrow_mut().clock.tick(wall_elapsed);
        let Some(now) = ticked else {
            return TickOutcome {
                now: self.current_time(),
                advanced: false,
                dispatched: 0,
            };
        };
        let dispatched = self.dispatch_at(now);
        self.shared
            .engine
            .borrow_mut()
            .metrics
            .ticks
            .record(started.elapsed());
        TickOutcome {
            now,
            advanced: true,
            dispatched,
        }
    }

    fn dispatch_at(&self, now: SimTime) -> usize {
        let (due, state, run) = {
            let mut engine = self.shared.engine.borrow_mut();
            let due = engine.timeline.advance(now);
            for event in &due {
                engine.phase = engine.phase.advance(&event.kind);
                engine.log.record(event);
                engine.metrics.record_event(event.event_type());
            }
            (due, engine.state(), engine.run)
        };

        let dispatched = due.len();
        if dispatched > 0 {
            debug!(time = %format_time(now), dispatched, "dispatching scripted events");
        }
        let notifications = due
            .into_iter()
            .map(|event| Outgoing::Notify(SimEvent::Scripted(event)))
            .chain([
                Outgoing::Notify(SimEvent::TimeAdvanced(state)),
                Outgoing::FinishCheck(run),
            ]);
        self.shared.publish(notifications);
        dispatched
    }

    pub fn state(&self) -> SimulationState {
        self.shared.engine.borrow().state()
    }

    pub fn current_time(&self) -> SimTime {
        self.shared.engine.borrow().clock.now()
    }

    /// Playback window `(start, end)`.
    pub fn bounds(&self) -> (SimTime, SimTime) {
        let engine = self.shared.engine.borrow();
        (engine.clock.start_time(), engine.clock.end_time())
    }

    pub fn format_time(&self, time: SimTime) -> String {
        format_time(time)
    }

    /// Percentage of the playback window elapsed, in `[0, 100]`; `0` when the
    /// window is empty.
    pub fn time_progress(&self) -> f64 {
        self.shared.engine.borrow().clock.progress()
    }

    /// Clock reached the end with nothing left to dispatch inside the window.
    pub fn is_finished(&self) -> bool {
        self.shared.engine.borrow().finished
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.shared.engine.borrow().config.tick_interval_ms)
    }

    pub fn config(&self) -> SimulationConfig {
        self.shared.engine.borrow().config.clone()
    }

    pub fn timeline_len(&self) -> usize {
        self.shared.engine.borrow().timeline.len()
    }

    pub fn pending_events(&self) -> usize {
        self.shared.engine.borrow().timeline.pending_count()
    }

    pub fn next_event_time(&self) -> Option<SimTime> {
        self.shared.engine.borrow().timeline.next_timestamp()
    }

    /// Loaded events in dispatch order.
    pub fn scripted_events(&self) -> Vec<ScriptedEvent> {
        self.shared.engine.borrow().timeline.events().cloned().collect()
    }

    pub fn event_log(&self) -> Vec<LoggedEvent> {
        self.shared.engine.borrow().log.entries().cloned().collect()
    }

    pub fn clear_event_log(&self) {
        self.shared.engine.borrow_mut().log.clear();
    }

    pub fn metrics(&self) -> DispatchMetrics {
        self.shared.engine.borrow().metrics.clone()
    }
}
