//! Situation board: dashboard state folded from the event stream.
//!
//! Tracks authority status, deployed resources, active sensor alerts,
//! evacuation zones and disaster reports, plus which point-of-interest map
//! layers are visible. Layers switch on the first time an event concerning
//! them fires, unless the user overrode them; `simulation_stopped` clears the
//! board for the next run but keeps user overrides.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;

use crate::bus::{EventBus, Subscription};
use crate::clock::SimTime;
use crate::events::{AuthorityStatus, EventKind, Location, ScriptedEvent, Severity, SimEvent};
use crate::state::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiLayer {
    Sensors,
    Authorities,
    Resources,
    EvacuationZones,
    Shelters,
    Farms,
}

impl PoiLayer {
    pub const ALL: [PoiLayer; 6] = [
        PoiLayer::Sensors,
        PoiLayer::Authorities,
        PoiLayer::Resources,
        PoiLayer::EvacuationZones,
        PoiLayer::Shelters,
        PoiLayer::Farms,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorityView {
    pub name: String,
    pub status: AuthorityStatus,
    pub changed_at: SimTime,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceView {
    pub name: String,
    pub resource_type: String,
    pub position: Option<Location>,
    pub destination: Option<Location>,
    pub deployed_at: SimTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub station_name: String,
    pub metric: String,
    pub value: f64,
    pub severity: Severity,
    pub raised_at: SimTime,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvacuationView {
    pub zone_name: String,
    pub population: u32,
    /// Farms and animals, when livestock evacuation has started for the zone.
    pub livestock: Option<(u32, u32)>,
    pub started_at: SimTime,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisasterView {
    pub disaster_type: String,
    pub description: String,
    pub severity: Severity,
    pub reported_at: SimTime,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SituationBoard {
    pub current_time: Option<SimTime>,
    pub phase: Phase,
    pub authorities: BTreeMap<String, AuthorityView>,
    pub resources: BTreeMap<String, ResourceView>,
    /// Latest alert per station.
    pub sensor_alerts: BTreeMap<String, AlertView>,
    pub evacuations: BTreeMap<String, EvacuationView>,
    pub disasters: Vec<DisasterView>,
    /// Layers switched on by fired events.
    revealed_layers: BTreeSet<PoiLayer>,
    /// User choices; survive a reset.
    layer_overrides: BTreeMap<PoiLayer, bool>,
}

impl SituationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a shared board to every event on `bus`.
    pub fn attach(bus: &EventBus) -> (Rc<RefCell<SituationBoard>>, Subscription) {
        let board = Rc::new(RefCell::new(SituationBoard::new()));
        let sink = Rc::clone(&board);
        let subscription = bus.subscribe_all(move |event| sink.borrow_mut().apply(event));
        (board, subscription)
    }

    pub fn apply(&mut self, event: &SimEvent) {
        match event {
            SimEvent::Scripted(scripted) => self.apply_scripted(scripted),
            SimEvent::SimulationStopped(state) => {
                let overrides = std::mem::take(&mut self.layer_overrides);
                *self = SituationBoard::new();
                self.layer_overrides = overrides;
                self.current_time = Some(state.current_time);
            }
            SimEvent::SimulationStarted(state)
            | SimEvent::SimulationPaused(state)
            | SimEvent::SimulationFinished(state)
            | SimEvent::TimeAdvanced(state) => {
                self.current_time = Some(state.current_time);
                self.phase = state.phase;
            }
        }
    }

    fn apply_scripted(&mut self, event: &ScriptedEvent) {
        let at = event.timestamp;
        self.phase = self.phase.advance(&event.kind);
        match &event.kind {
            EventKind::SensorAlert(alert) => {
                self.sensor_alerts.insert(
                    alert.station_id.clone(),
                    AlertView {
                        station_name: alert.station_name.clone(),
                        metric: alert.metric.clone(),
                        value: alert.value,
                        severity: alert.severity,
                        raised_at: at,
                        location: alert.location,
                    },
                );
                self.reveal(PoiLayer::Sensors);
            }
            EventKind::AuthorityStatusChanged(change) => {
                self.authorities.insert(
                    change.authority_id.clone(),
                    AuthorityView {
                        name: change.name.clone(),
                        status: change.to,
                        changed_at: at,
                        location: change.location,
                    },
                );
                self.reveal(PoiLayer::Authorities);
            }
            EventKind::ResourceDeployed(resource) => {
                self.resources.insert(
                    resource.resource_id.clone(),
                    ResourceView {
                        name: resource.name.clone(),
                        resource_type: resource.resource_type.clone(),
                        position: resource.destination.or(resource.location),
                        destination: resource.destination,
                        deployed_at: at,
                    },
                );
                self.reveal(PoiLayer::Resources);
            }
            EventKind::EvacuationStarted(evacuation) => {
                let view = self
                    .evacuations
                    .entry(evacuation.zone_id.clone())
                    .or_insert_with(|| EvacuationView {
                        zone_name: evacuation.zone_name.clone(),
                        population: 0,
                        livestock: None,
                        started_at: at,
                        location: evacuation.location,
                    });
                view.population = evacuation.population;
                self.reveal(PoiLayer::EvacuationZones);
                self.reveal(PoiLayer::Shelters);
            }
            EventKind::LivestockEvacuationStarted(evacuation) => {
                let view = self
                    .evacuations
                    .entry(evacuation.zone_id.clone())
                    .or_insert_with(|| EvacuationView {
                        zone_name: evacuation.zone_name.clone(),
                        population: 0,
                        livestock: None,
                        started_at: at,
                        location: evacuation.location,
                    });
                view.livestock = Some((evacuation.farms, evacuation.animals));
                self.reveal(PoiLayer::EvacuationZones);
                self.reveal(PoiLayer::Farms);
            }
            EventKind::DisasterEvent(disaster) => {
                self.disasters.push(DisasterView {
                    disaster_type: disaster.disaster_type.clone(),
                    description: disaster.description.clone(),
                    severity: disaster.severity,
                    reported_at: at,
                    location: disaster.location,
                });
            }
        }
    }

    fn reveal(&mut self, layer: PoiLayer) {
        self.revealed_layers.insert(layer);
    }

    /// A user override wins over event-driven visibility.
    pub fn is_layer_visible(&self, layer: PoiLayer) -> bool {
        self.layer_overrides
            .get(&layer)
            .copied()
            .unwrap_or_else(|| self.revealed_layers.contains(&layer))
    }

    pub fn set_layer_visibility(&mut self, layer: PoiLayer, visible: bool) {
        self.layer_overrides.insert(layer, visible);
    }

    pub fn clear_layer_override(&mut self, layer: PoiLayer) {
        self.layer_overrides.remove(&layer);
    }

    pub fn visible_layers(&self) -> Vec<PoiLayer> {
        PoiLayer::ALL
            .into_iter()
            .filter(|layer| self.is_layer_visible(*layer))
            .collect()
    }

    /// Authorities at `alert` or above.
    pub fn escalated_authorities(&self) -> usize {
        self.authorities
            .values()
            .filter(|view| view.status >= AuthorityStatus::Alert)
            .count()
    }

    /// Residents in zones under evacuation.
    pub fn evacuated_population(&self) -> u64 {
        self.evacuations
            .values()
            .map(|view| u64::from(view.population))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PlaybackStatus;
    use crate::events::{
        AuthorityStatusChanged, EvacuationStarted, LivestockEvacuationStarted, SensorAlert,
    };
    use crate::state::SimulationState;

    fn scripted(timestamp: SimTime, kind: EventKind) -> SimEvent {
        SimEvent::Scripted(ScriptedEvent::new(timestamp, kind))
    }

    fn evacuation(zone: &str, population: u32) -> EventKind {
        EventKind::EvacuationStarted(EvacuationStarted {
            zone_id: zone.to_string(),
            zone_name: format!("Zone {zone}"),
            population,
            location: None,
        })
    }

    #[test]
    fn folds_events_into_views() {
        let mut board = SituationBoard::new();
        board.apply(&scripted(
            10,
            EventKind::SensorAlert(SensorAlert {
                station_id: "S-1".to_string(),
                station_name: "Gauge".to_string(),
                metric: "level".to_string(),
                value: 3.2,
                threshold: Some(3.0),
                severity: Severity::Critical,
                location: None,
            }),
        ));
        board.apply(&scripted(
            20,
            EventKind::AuthorityStatusChanged(AuthorityStatusChanged {
                authority_id: "FD".to_string(),
                name: "Fire".to_string(),
                from: None,
                to: AuthorityStatus::Emergency,
                location: None,
            }),
        ));
        board.apply(&scripted(30, evacuation("A", 500)));
        board.apply(&scripted(
            40,
            EventKind::LivestockEvacuationStarted(LivestockEvacuationStarted {
                zone_id: "A".to_string(),
                zone_name: String::new(),
                farms: 3,
                animals: 240,
                location: None,
            }),
        ));

        assert_eq!(board.phase, Phase::Evacuation);
        assert_eq!(board.escalated_authorities(), 1);
        assert_eq!(board.evacuated_population(), 500);
        assert_eq!(board.evacuations["A"].livestock, Some((3, 240)));
        assert_eq!(board.sensor_alerts["S-1"].severity, Severity::Critical);
        assert_eq!(
            board.visible_layers(),
            vec![
                PoiLayer::Sensors,
                PoiLayer::Authorities,
                PoiLayer::EvacuationZones,
                PoiLayer::Shelters,
                PoiLayer::Farms
            ]
        );
    }

    #[test]
    fn user_hidden_layer_stays_hidden() {
        let mut board = SituationBoard::new();
        board.set_layer_visibility(PoiLayer::Shelters, false);
        board.apply(&scripted(5, evacuation("B", 10)));
        assert!(board.is_layer_visible(PoiLayer::EvacuationZones));
        assert!(!board.is_layer_visible(PoiLayer::Shelters));
        board.clear_layer_override(PoiLayer::Shelters);
        assert!(board.is_layer_visible(PoiLayer::Shelters));
    }

    #[test]
    fn stop_resets_the_board() {
        let mut board = SituationBoard::new();
        board.set_layer_visibility(PoiLayer::Shelters, false);
        board.apply(&scripted(5, evacuation("B", 10)));
        board.apply(&SimEvent::SimulationStopped(SimulationState {
            current_time: 0,
            is_running: false,
            status: PlaybackStatus::Stopped,
            speed: 1.0,
            phase: Phase::Detection,
        }));
        assert!(board.evacuations.is_empty());
        assert_eq!(board.phase, Phase::Detection);
        assert_eq!(board.current_time, Some(0));
        assert!(!board.is_layer_visible(PoiLayer::EvacuationZones));
        assert!(!board.is_layer_visible(PoiLayer::Shelters));
    }
}
