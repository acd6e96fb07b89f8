//! Event log: records every dispatched scripted event for the dashboard feed.
//!
//! The log is a monotonic history of what has happened. Seeking backwards
//! does not remove entries; only [EventLog::clear] does.

use std::collections::VecDeque;

use serde::Serialize;

use crate::clock::SimTime;
use crate::events::{EventType, ScriptedEvent};

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEvent {
    /// Position in dispatch order, starting at 0, never reused.
    pub sequence: u64,
    pub timestamp: SimTime,
    pub event_type: EventType,
    pub summary: String,
}

/// Rolling buffer; the oldest entries are dropped once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
    next_sequence: u64,
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 0,
        }
    }

    pub fn record(&mut self, event: &ScriptedEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LoggedEvent {
            sequence: self.next_sequence,
            timestamp: event.timestamp,
            event_type: event.event_type(),
            summary: event.kind.summary(),
        });
        self.next_sequence += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }

    /// Up to `count` most recent entries, newest last.
    pub fn latest(&self, count: usize) -> Vec<LoggedEvent> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total events ever recorded, including ones rolled out of the buffer.
    pub fn total_recorded(&self) -> u64 {
        self.next_sequence
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
