//! Scenario datasets: authority, resource and monitoring-station records plus
//! explicit scripted events, as loaded from JSON fixtures.
//!
//! Records are only interpreted far enough to derive scripted events from
//! their timestamps. Entries with a malformed timestamp or payload are left
//! out of the script and reported in [LoadReport]; they never abort a load.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{parse_timestamp, SimTime};
use crate::error::{DatasetError, EventParseError};
use crate::events::{
    AuthorityStatus, AuthorityStatusChanged, EventKind, Location, RawScriptedEvent,
    ResourceDeployed, ResourceStatus, ScriptedEvent, SensorAlert, Severity, StationStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityRecord {
    pub id: String,
    pub name: String,
    pub status: AuthorityStatus,
    #[serde(default)]
    pub previous_status: Option<AuthorityStatus>,
    pub location: Location,
    /// When `status` was entered; produces an `authority_status_changed` event.
    #[serde(default)]
    pub status_changed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub resource_type: String,
    pub status: ResourceStatus,
    pub location: Location,
    #[serde(default)]
    pub destination: Option<Location>,
    /// Produces a `resource_deployed` event when the resource is en route or deployed.
    #[serde(default)]
    pub deployed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub threshold: Option<f64>,
    pub status: StationStatus,
    pub location: Location,
    /// Produces a `sensor_alert` event when the station is in warning or critical state.
    #[serde(default)]
    pub alert_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub authorities: Vec<AuthorityRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub monitoring_stations: Vec<StationRecord>,
    #[serde(default)]
    pub events: Vec<RawScriptedEvent>,
}

/// An entry excluded from the script.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEvent {
    /// Where the entry came from, e.g. `events[3]` or `authorities[FD-1]`.
    pub source: String,
    pub error: EventParseError,
}

/// Scripted events derived from a dataset, in dataset order (not sorted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub events: Vec<ScriptedEvent>,
    pub rejected: Vec<RejectedEvent>,
}

impl LoadReport {
    fn accept(
        &mut self,
        source: impl FnOnce() -> String,
        result: Result<ScriptedEvent, EventParseError>,
    ) {
        match result {
            Ok(event) => self.events.push(event),
            Err(error) => {
                let source = source();
                warn!(%source, %error, "excluding malformed scripted event");
                self.rejected.push(RejectedEvent { source, error });
            }
        }
    }
}

impl Dataset {
    pub fn from_json_str(contents: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Declared scenario window, when both ends are present and valid.
    pub fn declared_bounds(&self) -> Option<(SimTime, SimTime)> {
        let start = parse_timestamp(self.start_time.as_deref()?).ok()?;
        let end = parse_timestamp(self.end_time.as_deref()?).ok()?;
        Some((start.min(end), start.max(end)))
    }

    /// Derives the scripted events: station alerts, authority status changes
    /// and resource deployments from the records, then the explicit events.
    pub fn scripted_events(&self) -> LoadReport {
        let mut report = LoadReport::default();

        for station in &self.monitoring_stations {
            let severity = match station.status {
                StationStatus::Warning => Severity::Warning,
                StationStatus::Critical => Severity::Critical,
                StationStatus::Normal | StationStatus::Offline => continue,
            };
            let Some(alert_at) = station.alert_at.as_deref() else {
                continue;
            };
            let result = parse_timestamp(alert_at).map(|timestamp| {
                ScriptedEvent::new(
                    timestamp,
                    EventKind::SensorAlert(SensorAlert {
                        station_id: station.id.clone(),
                        station_name: station.name.clone(),
                        metric: station.metric.clone(),
                        value: station.value,
                        threshold: station.threshold,
                        severity,
                        location: Some(station.location),
                    }),
                )
            });
            report.accept(|| format!("monitoring_stations[{}]", station.id), result);
        }

        for authority in &self.authorities {
            let Some(changed_at) = authority.status_changed_at.as_deref() else {
                continue;
            };
            let result = parse_timestamp(changed_at).map(|timestamp| {
                ScriptedEvent::new(
                    timestamp,
                    EventKind::AuthorityStatusChanged(AuthorityStatusChanged {
                        authority_id: authority.id.clone(),
                        name: authority.name.clone(),
                        from: authority.previous_status,
                        to: authority.status,
                        location: Some(authority.location),
                    }),
                )
            });
            report.accept(|| format!("authorities[{}]", authority.id), result);
        }

        for resource in &self.resources {
            if !matches!(resource.status, ResourceStatus::EnRoute | ResourceStatus::Deployed) {
                continue;
            }
            let Some(deployed_at) = resource.deployed_at.as_deref() else {
                continue;
            };
            let result = parse_timestamp(deployed_at).map(|timestamp| {
                ScriptedEvent::new(
                    timestamp,
                    EventKind::ResourceDeployed(ResourceDeployed {
                        resource_id: resource.id.clone(),
                        name: resource.name.clone(),
                        resource_type: resource.resource_type.clone(),
                        location: Some(resource.location),
                        destination: resource.destination,
                    }),
                )
            });
            report.accept(|| format!("resources[{}]", resource.id), result);
        }

        for (index, raw) in self.events.iter().enumerate() {
            report.accept(|| format!("events[{index}]"), raw.parse());
        }

        report
    }
}
