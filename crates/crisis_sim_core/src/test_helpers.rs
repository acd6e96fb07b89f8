//! Test helpers: scripted event builders and a recording subscriber.
//!
//! Shared by unit tests, integration tests and benches.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bus::{EventBus, Subscription};
use crate::clock::SimTime;
use crate::events::{
    AuthorityStatus, AuthorityStatusChanged, DisasterEvent, EvacuationStarted, EventKind,
    EventType, ResourceDeployed, ScriptedEvent, SensorAlert, Severity, SimEvent,
};

pub fn disaster_at(timestamp: SimTime) -> ScriptedEvent {
    ScriptedEvent::new(
        timestamp,
        EventKind::DisasterEvent(DisasterEvent {
            disaster_type: "flood".to_string(),
            description: format!("report at {timestamp}"),
            severity: Severity::Warning,
            location: None,
        }),
    )
}

pub fn sensor_alert_at(timestamp: SimTime, station_id: &str) -> ScriptedEvent {
    ScriptedEvent::new(
        timestamp,
        EventKind::SensorAlert(SensorAlert {
            station_id: station_id.to_string(),
            station_name: String::new(),
            metric: "water_level_cm".to_string(),
            value: 480.0,
            threshold: Some(450.0),
            severity: Severity::Warning,
            location: None,
        }),
    )
}

pub fn authority_change_at(
    timestamp: SimTime,
    authority_id: &str,
    to: AuthorityStatus,
) -> ScriptedEvent {
    ScriptedEvent::new(
        timestamp,
        EventKind::AuthorityStatusChanged(AuthorityStatusChanged {
            authority_id: authority_id.to_string(),
            name: String::new(),
            from: None,
            to,
            location: None,
        }),
    )
}

pub fn evacuation_at(timestamp: SimTime, zone_id: &str, population: u32) -> ScriptedEvent {
    ScriptedEvent::new(
        timestamp,
        EventKind::EvacuationStarted(EvacuationStarted {
            zone_id: zone_id.to_string(),
            zone_name: String::new(),
            population,
            location: None,
        }),
    )
}

pub fn deployment_at(timestamp: SimTime, resource_id: &str) -> ScriptedEvent {
    ScriptedEvent::new(
        timestamp,
        EventKind::ResourceDeployed(ResourceDeployed {
            resource_id: resource_id.to_string(),
            name: String::new(),
            resource_type: "pump".to_string(),
            location: None,
            destination: None,
        }),
    )
}

/// Everything a bus delivered, in delivery order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<SimEvent>>>,
}

impl Recorder {
    /// Records every event on `bus` until the returned subscription is
    /// unsubscribed.
    pub fn attach(bus: &EventBus) -> (Recorder, Subscription) {
        let recorder = Recorder::default();
        let sink = Rc::clone(&recorder.events);
        let subscription = bus.subscribe_all(move |event| sink.borrow_mut().push(event.clone()));
        (recorder, subscription)
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events.borrow().clone()
    }

    pub fn types(&self) -> Vec<EventType> {
        self.events.borrow().iter().map(SimEvent::event_type).collect()
    }

    /// Timestamps of the scripted events delivered so far.
    pub fn scripted_timestamps(&self) -> Vec<SimTime> {
        self.events
            .borrow()
            .iter()
            .filter_map(SimEvent::scripted)
            .map(|event| event.timestamp)
            .collect()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
