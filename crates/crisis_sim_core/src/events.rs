//! Event vocabulary: scripted disaster-response events and engine notifications.
//!
//! Scripted payloads are a tagged enum ([EventKind]) with one variant per
//! scripted [EventType]; everything the bus carries is a [SimEvent].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{format_iso, parse_timestamp, SimTime};
use crate::error::EventParseError;
use crate::state::SimulationState;

/// Event type names as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SimulationStarted,
    SimulationPaused,
    SimulationStopped,
    SimulationFinished,
    TimeAdvanced,
    SensorAlert,
    AuthorityStatusChanged,
    ResourceDeployed,
    EvacuationStarted,
    LivestockEvacuationStarted,
    DisasterEvent,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        EventType::SimulationStarted,
        EventType::SimulationPaused,
        EventType::SimulationStopped,
        EventType::SimulationFinished,
        EventType::TimeAdvanced,
        EventType::SensorAlert,
        EventType::AuthorityStatusChanged,
        EventType::ResourceDeployed,
        EventType::EvacuationStarted,
        EventType::LivestockEvacuationStarted,
        EventType::DisasterEvent,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            EventType::SimulationStarted => "simulation_started",
            EventType::SimulationPaused => "simulation_paused",
            EventType::SimulationStopped => "simulation_stopped",
            EventType::SimulationFinished => "simulation_finished",
            EventType::TimeAdvanced => "time_advanced",
            EventType::SensorAlert => "sensor_alert",
            EventType::AuthorityStatusChanged => "authority_status_changed",
            EventType::ResourceDeployed => "resource_deployed",
            EventType::EvacuationStarted => "evacuation_started",
            EventType::LivestockEvacuationStarted => "livestock_evacuation_started",
            EventType::DisasterEvent => "disaster_event",
        }
    }

    /// Whether this type can appear in a loaded script (as opposed to being
    /// emitted by the engine itself).
    pub const fn is_scripted(self) -> bool {
        matches!(
            self,
            EventType::SensorAlert
                | EventType::AuthorityStatusChanged
                | EventType::ResourceDeployed
                | EventType::EvacuationStarted
                | EventType::LivestockEvacuationStarted
                | EventType::DisasterEvent
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s.trim())
            .ok_or_else(|| EventParseError::UnknownType(s.to_string()))
    }
}

/// WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Operational status of an authority (fire brigade, district office, ...).
/// Ordered by escalation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityStatus {
    #[default]
    Normal,
    Standby,
    Alert,
    Emergency,
}

impl AuthorityStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthorityStatus::Normal => "normal",
            AuthorityStatus::Standby => "standby",
            AuthorityStatus::Alert => "alert",
            AuthorityStatus::Emergency => "emergency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[default]
    Available,
    EnRoute,
    Deployed,
    OutOfService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    #[default]
    Normal,
    Warning,
    Critical,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAlert {
    pub station_id: String,
    #[serde(default)]
    pub station_name: String,
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityStatusChanged {
    pub authority_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub from: Option<AuthorityStatus>,
    pub to: AuthorityStatus,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeployed {
    pub resource_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub destination: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacuationStarted {
    pub zone_id: String,
    #[serde(default)]
    pub zone_name: String,
    #[serde(default)]
    pub population: u32,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivestockEvacuationStarted {
    pub zone_id: String,
    #[serde(default)]
    pub zone_name: String,
    #[serde(default)]
    pub farms: u32,
    #[serde(default)]
    pub animals: u32,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterEvent {
    pub disaster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Payload of a scripted event, one variant per scripted [EventType].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    SensorAlert(SensorAlert),
    AuthorityStatusChanged(AuthorityStatusChanged),
    ResourceDeployed(ResourceDeployed),
    EvacuationStarted(EvacuationStarted),
    LivestockEvacuationStarted(LivestockEvacuationStarted),
    DisasterEvent(DisasterEvent),
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::SensorAlert(_) => EventType::SensorAlert,
            EventKind::AuthorityStatusChanged(_) => EventType::AuthorityStatusChanged,
            EventKind::ResourceDeployed(_) => EventType::ResourceDeployed,
            EventKind::EvacuationStarted(_) => EventType::EvacuationStarted,
            EventKind::LivestockEvacuationStarted(_) => EventType::LivestockEvacuationStarted,
            EventKind::DisasterEvent(_) => EventType::DisasterEvent,
        }
    }

    /// Builds a payload from a type tag and loosely-typed JSON.
    pub fn from_parts(event_type: &str, payload: Value) -> Result<Self, EventParseError> {
        let event_type: EventType = event_type.parse()?;
        if !event_type.is_scripted() {
            return Err(EventParseError::NotScripted(event_type));
        }
        let tagged = serde_json::json!({ "type": event_type.as_str(), "payload": payload });
        serde_json::from_value(tagged).map_err(|error| EventParseError::Payload {
            event_type,
            message: error.to_string(),
        })
    }

    /// One-line description for event logs.
    pub fn summary(&self) -> String {
        match self {
            EventKind::SensorAlert(alert) => {
                let station = display_name(&alert.station_name, &alert.station_id);
                match alert.threshold {
                    Some(threshold) => format!(
                        "{station}: {} at {} (threshold {threshold}, {})",
                        alert.metric,
                        alert.value,
                        alert.severity.as_str()
                    ),
                    None => format!(
                        "{station}: {} at {} ({})",
                        alert.metric,
                        alert.value,
                        alert.severity.as_str()
                    ),
                }
            }
            EventKind::AuthorityStatusChanged(change) => {
                let name = display_name(&change.name, &change.authority_id);
                match change.from {
                    Some(from) => format!("{name}: {} -> {}", from.as_str(), change.to.as_str()),
                    None => format!("{name}: now {}", change.to.as_str()),
                }
            }
            EventKind::ResourceDeployed(resource) => {
                let name = display_name(&resource.name, &resource.resource_id);
                if resource.resource_type.is_empty() {
                    format!("{name} deployed")
                } else {
                    format!("{name} ({}) deployed", resource.resource_type)
                }
            }
            EventKind::EvacuationStarted(evacuation) => format!(
                "Evacuation of {} started ({} residents)",
                display_name(&evacuation.zone_name, &evacuation.zone_id),
                evacuation.population
            ),
            EventKind::LivestockEvacuationStarted(evacuation) => format!(
                "Livestock evacuation in {} started ({} animals, {} farms)",
                display_name(&evacuation.zone_name, &evacuation.zone_id),
                evacuation.animals,
                evacuation.farms
            ),
            EventKind::DisasterEvent(disaster) => {
                if disaster.description.is_empty() {
                    format!("{} ({})", disaster.disaster_type, disaster.severity.as_str())
                } else {
                    format!("{}: {}", disaster.disaster_type, disaster.description)
                }
            }
        }
    }
}

fn display_name<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.is_empty() {
        id
    } else {
        name
    }
}

/// A predetermined occurrence to be played back at `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptedEvent {
    pub timestamp: SimTime,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ScriptedEvent {
    pub fn new(timestamp: SimTime, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// Scripted event as it appears in fixtures: ISO-8601 timestamp, type tag and
/// an untyped payload. Validated by [RawScriptedEvent::parse].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScriptedEvent {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl RawScriptedEvent {
    pub fn parse(&self) -> Result<ScriptedEvent, EventParseError> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let kind = EventKind::from_parts(&self.event_type, self.payload.clone())?;
        Ok(ScriptedEvent { timestamp, kind })
    }

    pub fn from_event(event: &ScriptedEvent) -> Self {
        let payload = match serde_json::to_value(&event.kind) {
            Ok(Value::Object(mut tagged)) => tagged.remove("payload").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Self {
            timestamp: format_iso(event.timestamp),
            event_type: event.event_type().as_str().to_string(),
            payload,
        }
    }
}

/// Everything the event bus carries.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    SimulationStarted(SimulationState),
    SimulationPaused(SimulationState),
    SimulationStopped(SimulationState),
    SimulationFinished(SimulationState),
    TimeAdvanced(SimulationState),
    Scripted(ScriptedEvent),
}

impl SimEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            SimEvent::SimulationStarted(_) => EventType::SimulationStarted,
            SimEvent::SimulationPaused(_) => EventType::SimulationPaused,
            SimEvent::SimulationStopped(_) => EventType::SimulationStopped,
            SimEvent::SimulationFinished(_) => EventType::SimulationFinished,
            SimEvent::TimeAdvanced(_) => EventType::TimeAdvanced,
            SimEvent::Scripted(event) => event.event_type(),
        }
    }

    pub fn state(&self) -> Option<&SimulationState> {
        match self {
            SimEvent::SimulationStarted(state)
            | SimEvent::SimulationPaused(state)
            | SimEvent::SimulationStopped(state)
            | SimEvent::SimulationFinished(state)
            | SimEvent::TimeAdvanced(state) => Some(state),
            SimEvent::Scripted(_) => None,
        }
    }

    pub fn scripted(&self) -> Option<&ScriptedEvent> {
        match self {
            SimEvent::Scripted(event) => Some(event),
            _ => None,
        }
    }
}
