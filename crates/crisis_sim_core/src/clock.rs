//! Playback clock: maps wall-clock ticks onto simulation time.
//!
//! Simulation time is absolute (Unix epoch milliseconds, UTC) so scripted
//! ISO-8601 timestamps compare directly against [SimulationClock::now].

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, EventParseError};

/// Simulation time: milliseconds since the Unix epoch (UTC).
pub type SimTime = i64;

pub const ONE_SEC_MS: SimTime = 1000;
pub const ONE_MIN_MS: SimTime = 60 * ONE_SEC_MS;
pub const ONE_HOUR_MS: SimTime = 60 * ONE_MIN_MS;

/// One simulated minute per wall second.
pub const DEFAULT_SPEED: f64 = 60.0;

/// Parses an RFC 3339 timestamp. Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<SimTime, EventParseError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis())
        .map_err(|error| EventParseError::Timestamp {
            value: value.to_string(),
            reason: error.to_string(),
        })
}

/// RFC 3339 with millisecond precision, e.g. `2024-06-01T08:30:00.000Z`.
pub fn format_iso(time: SimTime) -> String {
    match DateTime::from_timestamp_millis(time) {
        Some(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{time}ms"),
    }
}

/// Human-readable simulation time for logs and dashboards.
pub fn format_time(time: SimTime) -> String {
    match DateTime::from_timestamp_millis(time) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{time}ms"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone)]
pub struct SimulationClock {
    start: SimTime,
    end: SimTime,
    now: SimTime,
    speed: f64,
    status: PlaybackStatus,
    /// Sub-millisecond advancement not yet applied to `now`.
    carry_ms: f64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(0, 0, DEFAULT_SPEED)
    }
}

impl SimulationClock {
    /// Creates a stopped clock at `start`. A non-positive `speed` falls back to [DEFAULT_SPEED].
    pub fn new(start: SimTime, end: SimTime, speed: f64) -> Self {
        Self {
            start,
            end,
            now: start,
            speed: if is_valid_speed(speed) { speed } else { DEFAULT_SPEED },
            status: PlaybackStatus::Stopped,
            carry_ms: 0.0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn start_time(&self) -> SimTime {
        self.start
    }

    pub fn end_time(&self) -> SimTime {
        self.end
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == PlaybackStatus::Running
    }

    pub fn is_at_end(&self) -> bool {
        self.now >= self.end
    }

    /// `Stopped|Paused -> Running`. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.status == PlaybackStatus::Running {
            return false;
        }
        self.status = PlaybackStatus::Running;
        true
    }

    /// `Running -> Paused`, keeping the current time.
    pub fn pause(&mut self) -> bool {
        if self.status != PlaybackStatus::Running {
            return false;
        }
        self.status = PlaybackStatus::Paused;
        true
    }

    /// `Running|Paused -> Stopped`, rewinding to the start time.
    pub fn stop(&mut self) -> bool {
        if self.status == PlaybackStatus::Stopped {
            return false;
        }
        self.status = PlaybackStatus::Stopped;
        self.now = self.start;
        self.carry_ms = 0.0;
        true
    }

    /// Applies from the next tick on; already elapsed time is not rescaled.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), ControlError> {
        if !is_valid_speed(speed) {
            return Err(ControlError::InvalidSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    /// Absolute seek, clamped to `[start, end]`. Returns the time actually set.
    pub fn set_time(&mut self, time: SimTime) -> SimTime {
        self.now = self.clamp(time);
        self.carry_ms = 0.0;
        self.now
    }

    /// Replaces the playback bounds. A stopped clock moves to the new start;
    /// otherwise the current time is clamped into the new range.
    pub fn set_bounds(&mut self, start: SimTime, end: SimTime) {
        self.start = start;
        self.end = end;
        self.now = if self.status == PlaybackStatus::Stopped {
            start
        } else {
            self.clamp(self.now)
        };
    }

    pub fn clamp(&self, time: SimTime) -> SimTime {
        time.clamp(self.start, self.end.max(self.start))
    }

    /// Advances by `wall_elapsed * speed`. Returns the new time, or `None` when
    /// the clock is not running.
    pub fn tick(&mut self, wall_elapsed: Duration) -> Option<SimTime> {
        if !self.is_running() {
            return None;
        }
        let advance = wall_elapsed.as_secs_f64() * 1000.0 * self.speed + self.carry_ms;
        if !advance.is_finite() {
            // Overflowing multipliers run straight to the end.
            self.carry_ms = 0.0;
            self.now = self.clamp(SimTime::MAX);
            return Some(self.now);
        }
        let whole = advance.floor();
        self.carry_ms = advance - whole;
        self.now = self.clamp(self.now.saturating_add(whole as SimTime));
        Some(self.now)
    }

    /// Fraction of `[start, end]` elapsed, in percent. `0` for an empty range.
    pub fn progress(&self) -> f64 {
        if self.end <= self.start {
            return 0.0;
        }
        let elapsed = (self.now - self.start) as f64;
        let total = (self.end - self.start) as f64;
        (elapsed / total * 100.0).clamp(0.0, 100.0)
    }
}

fn is_valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}
