//! Crisis scenario playback: a controllable simulation clock that replays
//! timestamped crisis events (sensor alerts, authority escalations,
//! evacuations, resource deployments) onto a typed event bus.

pub mod bus;
pub mod clock;
pub mod config;
pub mod dataset;
pub mod error;
pub mod events;
pub mod profiling;
pub mod runner;
pub mod scenario;
pub mod service;
pub mod situation;
pub mod state;
pub mod telemetry;
pub mod timeline;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use bus::{EventBus, Subscription};
pub use clock::{PlaybackStatus, SimTime, SimulationClock};
pub use config::SimulationConfig;
pub use dataset::Dataset;
pub use events::{EventKind, EventType, ScriptedEvent, SimEvent};
pub use service::{SimulationService, WeakSimulationService};
pub use state::{Phase, SimulationState};
