//! Snapshot of the playback state handed to subscribers, and narrative phase derivation.

use serde::{Deserialize, Serialize};

use crate::clock::{PlaybackStatus, SimTime};
use crate::events::{AuthorityStatus, EventKind};

/// Coarse narrative stage of the scenario. Ordered; the phase only moves forward
/// within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Detection,
    Escalation,
    Evacuation,
    Response,
    Recovery,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Detection => "detection",
            Phase::Escalation => "escalation",
            Phase::Evacuation => "evacuation",
            Phase::Response => "response",
            Phase::Recovery => "recovery",
        }
    }

    /// Stage implied by a single fired event.
    pub fn implied_by(kind: &EventKind) -> Phase {
        match kind {
            EventKind::SensorAlert(_) => Phase::Detection,
            EventKind::AuthorityStatusChanged(change) if change.to >= AuthorityStatus::Alert => {
                Phase::Escalation
            }
            EventKind::AuthorityStatusChanged(_) => Phase::Detection,
            EventKind::DisasterEvent(_) => Phase::Escalation,
            EventKind::EvacuationStarted(_) | EventKind::LivestockEvacuationStarted(_) => {
                Phase::Evacuation
            }
            EventKind::ResourceDeployed(_) => Phase::Response,
        }
    }

    /// Phase after `kind` has fired.
    pub fn advance(self, kind: &EventKind) -> Phase {
        self.max(Phase::implied_by(kind))
    }
}

/// Read-only copy of the service state. Subscribers get their own copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub current_time: SimTime,
    pub is_running: bool,
    pub status: PlaybackStatus,
    pub speed: f64,
    pub phase: Phase,
}
