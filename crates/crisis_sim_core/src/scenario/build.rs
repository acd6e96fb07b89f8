use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::debug;

use crate::clock::{format_iso, SimTime, ONE_MIN_MS};
use crate::dataset::{AuthorityRecord, Dataset, ResourceRecord, StationRecord};
use crate::events::{AuthorityStatus, Location, RawScriptedEvent, ResourceStatus, StationStatus};
use crate::scenario::params::ScenarioParams;

const AUTHORITY_NAMES: [&str; 6] = [
    "Fire Brigade",
    "District Office",
    "Police Directorate",
    "Technical Relief Agency",
    "Red Cross Branch",
    "Water Management Office",
];

const RESOURCE_TYPES: [&str; 5] = ["pump", "boat", "sandbag_truck", "ambulance", "generator"];

const ZONE_NAMES: [&str; 6] = [
    "Riverside",
    "Old Harbour",
    "Meadow Quarter",
    "Mill District",
    "Lower Village",
    "Floodplain Farms",
];

/// Water level alert threshold in centimetres.
const LEVEL_THRESHOLD_CM: f64 = 450.0;

/// Builds a self-consistent flood narrative inside the scenario window:
/// gauges alert first, authorities escalate, zones evacuate, resources deploy.
/// The same seed always yields the same dataset.
pub fn build_dataset(params: &ScenarioParams) -> Dataset {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let start = params.start_time;
    let end = params.end_time();
    let span = (end - start) as f64;
    // Instant at `fraction` of the window, jittered within `[low, high)`.
    let at = |rng: &mut StdRng, low: f64, high: f64| -> SimTime {
        let fraction = rng.gen_range(low..high);
        // Whole minutes keep fixtures readable.
        let offset = (span * fraction) as SimTime / ONE_MIN_MS * ONE_MIN_MS;
        (start + offset).min(end)
    };

    let mut dataset = Dataset {
        name: params.name.clone(),
        start_time: Some(format_iso(start)),
        end_time: Some(format_iso(end)),
        ..Dataset::default()
    };

    let onset = at(&mut rng, 0.02, 0.08);
    let center = random_location(&mut rng, params);
    dataset.events.push(RawScriptedEvent {
        timestamp: format_iso(onset),
        event_type: "disaster_event".to_string(),
        payload: json!({
            "disaster_type": "flood",
            "description": "Heavy rainfall upstream, river rising",
            "severity": "warning",
            "location": center,
        }),
    });

    for index in 0..params.num_stations {
        let level = rng.gen_range(300.0..620.0_f64).round();
        let status = if level >= LEVEL_THRESHOLD_CM * 1.15 {
            StationStatus::Critical
        } else if level >= LEVEL_THRESHOLD_CM {
            StationStatus::Warning
        } else {
            StationStatus::Normal
        };
        let alert_at =
            (status != StationStatus::Normal).then(|| format_iso(at(&mut rng, 0.05, 0.30)));
        dataset.monitoring_stations.push(StationRecord {
            id: format!("ST-{:03}", index + 1),
            name: format!("Gauge {}", index + 1),
            metric: "water_level_cm".to_string(),
            value: level,
            threshold: Some(LEVEL_THRESHOLD_CM),
            status,
            location: random_location(&mut rng, params),
            alert_at,
        });
    }

    for index in 0..params.num_authorities {
        let status = if rng.gen_bool(0.5) {
            AuthorityStatus::Emergency
        } else {
            AuthorityStatus::Alert
        };
        dataset.authorities.push(AuthorityRecord {
            id: format!("AU-{:02}", index + 1),
            name: AUTHORITY_NAMES[index % AUTHORITY_NAMES.len()].to_string(),
            status,
            previous_status: Some(AuthorityStatus::Standby),
            location: random_location(&mut rng, params),
            status_changed_at: Some(format_iso(at(&mut rng, 0.20, 0.40))),
        });
    }

    for index in 0..params.num_evacuation_zones {
        let zone_id = format!("EZ-{:02}", index + 1);
        let zone_name = ZONE_NAMES[index % ZONE_NAMES.len()].to_string();
        let location = random_location(&mut rng, params);
        let started = at(&mut rng, 0.40, 0.60);
        dataset.events.push(RawScriptedEvent {
            timestamp: format_iso(started),
            event_type: "evacuation_started".to_string(),
            payload: json!({
                "zone_id": zone_id,
                "zone_name": zone_name,
                "population": rng.gen_range(200..5_000_u32),
                "location": location,
            }),
        });
        if index < params.livestock_zones {
            let delay = rng.gen_range(15..90) * ONE_MIN_MS;
            dataset.events.push(RawScriptedEvent {
                timestamp: format_iso((started + delay).min(end)),
                event_type: "livestock_evacuation_started".to_string(),
                payload: json!({
                    "zone_id": zone_id,
                    "zone_name": zone_name,
                    "farms": rng.gen_range(2..12_u32),
                    "animals": rng.gen_range(80..1_500_u32),
                    "location": location,
                }),
            });
        }
    }

    for index in 0..params.num_resources {
        let location = random_location(&mut rng, params);
        let deployed = rng.gen_bool(0.7);
        dataset.resources.push(ResourceRecord {
            id: format!("RS-{:03}", index + 1),
            name: format!("Unit {}", index + 1),
            resource_type: RESOURCE_TYPES[index % RESOURCE_TYPES.len()].to_string(),
            status: if deployed {
                ResourceStatus::Deployed
            } else {
                ResourceStatus::Available
            },
            location,
            destination: deployed.then(|| random_location(&mut rng, params)),
            deployed_at: deployed.then(|| format_iso(at(&mut rng, 0.50, 0.90))),
        });
    }

    let crest = at(&mut rng, 0.42, 0.55);
    dataset.events.push(RawScriptedEvent {
        timestamp: format_iso(crest),
        event_type: "disaster_event".to_string(),
        payload: json!({
            "disaster_type": "flood",
            "description": "Flood crest reached, levees overtopped",
            "severity": "critical",
            "location": center,
        }),
    });

    debug!(
        seed = ?params.seed,
        stations = dataset.monitoring_stations.len(),
        authorities = dataset.authorities.len(),
        resources = dataset.resources.len(),
        events = dataset.events.len(),
        "synthetic scenario built"
    );
    dataset
}

fn random_location(rng: &mut StdRng, params: &ScenarioParams) -> Location {
    Location {
        lat: rng.gen_range(params.lat_min..=params.lat_max),
        lng: rng.gen_range(params.lng_min..=params.lng_max),
    }
}
