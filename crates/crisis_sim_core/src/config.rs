//! Simulation configuration: playback bounds, speed, tick interval, log capacity.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::clock::{format_iso, parse_timestamp, SimTime, DEFAULT_SPEED, ONE_MIN_MS};
use crate::error::ConfigError;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;
/// Margin added around the script when bounds are derived from the events.
pub const DEFAULT_BOUNDS_PADDING_MS: SimTime = 5 * ONE_MIN_MS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Explicit playback start. When unset, taken from the dataset.
    #[serde(with = "iso_time")]
    pub start_time: Option<SimTime>,
    /// Explicit playback end. When unset, taken from the dataset.
    #[serde(with = "iso_time")]
    pub end_time: Option<SimTime>,
    /// Simulated milliseconds per wall millisecond.
    pub speed: f64,
    pub tick_interval_ms: u64,
    pub event_log_capacity: usize,
    pub bounds_padding_ms: SimTime,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            speed: DEFAULT_SPEED,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            bounds_padding_ms: DEFAULT_BOUNDS_PADDING_MS,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(contents)?;
        Ok(config.normalized())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn with_bounds(mut self, start: SimTime, end: SimTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    pub fn with_event_log_capacity(mut self, capacity: usize) -> Self {
        self.event_log_capacity = capacity;
        self
    }

    pub fn with_bounds_padding_ms(mut self, padding_ms: SimTime) -> Self {
        self.bounds_padding_ms = padding_ms;
        self
    }

    /// Replaces out-of-range values with defaults and orders the bounds.
    pub fn normalized(mut self) -> Self {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            self.speed = DEFAULT_SPEED;
        }
        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = DEFAULT_TICK_INTERVAL_MS;
        }
        if self.event_log_capacity == 0 {
            self.event_log_capacity = 1;
        }
        self.bounds_padding_ms = self.bounds_padding_ms.max(0);
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end < start {
                self.start_time = Some(end);
                self.end_time = Some(start);
            }
        }
        self
    }

    /// Both bounds, when both are configured.
    pub fn bounds(&self) -> Option<(SimTime, SimTime)> {
        Some((self.start_time?, self.end_time?))
    }
}

/// Optional timestamps as RFC 3339 strings.
mod iso_time {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<SimTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.serialize_some(&format_iso(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SimTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = SimulationConfig::from_json_str("{}").expect("valid config");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn parses_iso_bounds() {
        let json = r#"{
            "start_time": "1970-01-01T00:00:00Z",
            "end_time": "1970-01-01T01:00:00Z",
            "speed": 120
        }"#;
        let config = SimulationConfig::from_json_str(json).expect("valid config");
        assert_eq!(config.bounds(), Some((0, 3_600_000)));
        assert_eq!(config.speed, 120.0);
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let result = SimulationConfig::from_json_str(r#"{ "start_time": "noon" }"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn normalizes_out_of_range_values() {
        let config = SimulationConfig::default()
            .with_speed(-3.0)
            .with_tick_interval_ms(0)
            .with_event_log_capacity(0)
            .with_bounds_padding_ms(-10)
            .with_bounds(500, 100)
            .normalized();
        assert_eq!(config.speed, DEFAULT_SPEED);
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.event_log_capacity, 1);
        assert_eq!(config.bounds_padding_ms, 0);
        assert_eq!(config.bounds(), Some((100, 500)));
    }

    #[test]
    fn serializes_bounds_as_iso_strings() {
        let config = SimulationConfig::default().with_bounds(0, 1_000);
        let json = serde_json::to_value(&config).expect("serializable");
        assert_eq!(json["start_time"], "1970-01-01T00:00:00.000Z");
        assert_eq!(json["end_time"], "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sim.json");
        std::fs::write(&path, r#"{ "tick_interval_ms": 250 }"#).expect("write config");
        let config = SimulationConfig::from_path(&path).expect("valid config");
        assert_eq!(config.tick_interval_ms, 250);

        let missing = SimulationConfig::from_path(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
