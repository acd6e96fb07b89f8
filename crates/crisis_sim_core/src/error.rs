//! Error types for the simulation engine and its fixture/config loaders.
//!
//! Nothing here is fatal to a running simulation: control errors leave the
//! previous state untouched and parse errors only exclude the offending entry.

use std::path::PathBuf;

use thiserror::Error;

use crate::events::EventType;

/// Rejected playback control input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ControlError {
    #[error("speed must be a positive finite multiplier, got {0}")]
    InvalidSpeed(f64),
}

/// A scripted event entry that could not be turned into a [crate::events::ScriptedEvent].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    #[error("unknown event type '{0}'")]
    UnknownType(String),

    #[error("event type '{0}' is emitted by the engine and cannot be scripted")]
    NotScripted(EventType),

    #[error("invalid payload for {event_type}: {message}")]
    Payload {
        event_type: EventType,
        message: String,
    },
}

/// Failure to read or decode a dataset fixture.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dataset: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to read or decode a simulation config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
