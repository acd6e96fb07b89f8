use crate::clock::{SimTime, ONE_HOUR_MS};

/// Default bounding box: Dresden and the upper Elbe valley (approx).
const DEFAULT_LAT_MIN: f64 = 50.95;
const DEFAULT_LAT_MAX: f64 = 51.15;
const DEFAULT_LNG_MIN: f64 = 13.60;
const DEFAULT_LNG_MAX: f64 = 13.90;

/// 2024-06-01T06:00:00Z.
const DEFAULT_START_TIME: SimTime = 1_717_221_600_000;

/// Inputs for the synthetic flood scenario generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParams {
    pub name: String,
    /// First instant of the scenario window (Unix epoch ms).
    pub start_time: SimTime,
    pub duration_hours: u32,
    pub num_stations: usize,
    pub num_authorities: usize,
    pub num_resources: usize,
    pub num_evacuation_zones: usize,
    /// How many of the evacuation zones also evacuate livestock.
    pub livestock_zones: usize,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
    /// `None` draws a fresh seed from entropy.
    pub seed: Option<u64>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            name: "Synthetic river flood".to_string(),
            start_time: DEFAULT_START_TIME,
            duration_hours: 12,
            num_stations: 8,
            num_authorities: 4,
            num_resources: 10,
            num_evacuation_zones: 3,
            livestock_zones: 1,
            lat_min: DEFAULT_LAT_MIN,
            lat_max: DEFAULT_LAT_MAX,
            lng_min: DEFAULT_LNG_MIN,
            lng_max: DEFAULT_LNG_MAX,
            seed: None,
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_start_time(mut self, start_time: SimTime) -> Self {
        self.start_time = start_time;
        self
    }

    /// Length of the scenario window; at least one hour.
    pub fn with_duration_hours(mut self, hours: u32) -> Self {
        self.duration_hours = hours.max(1);
        self
    }

    pub fn with_stations(mut self, count: usize) -> Self {
        self.num_stations = count;
        self
    }

    pub fn with_authorities(mut self, count: usize) -> Self {
        self.num_authorities = count;
        self
    }

    pub fn with_resources(mut self, count: usize) -> Self {
        self.num_resources = count;
        self
    }

    /// Livestock zones are capped at the number of evacuation zones.
    pub fn with_evacuation_zones(mut self, zones: usize, livestock_zones: usize) -> Self {
        self.num_evacuation_zones = zones;
        self.livestock_zones = livestock_zones.min(zones);
        self
    }

    pub fn with_bounding_box(
        mut self,
        lat_min: f64,
        lat_max: f64,
        lng_min: f64,
        lng_max: f64,
    ) -> Self {
        self.lat_min = lat_min.min(lat_max);
        self.lat_max = lat_min.max(lat_max);
        self.lng_min = lng_min.min(lng_max);
        self.lng_max = lng_min.max(lng_max);
        self
    }

    pub fn end_time(&self) -> SimTime {
        self.start_time + SimTime::from(self.duration_hours.max(1)) * ONE_HOUR_MS
    }
}
