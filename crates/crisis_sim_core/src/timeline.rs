//! Timeline driver: ordered scripted events with exactly-once dispatch.
//!
//! Events are kept sorted by timestamp (stable, so ties keep load order).
//! Each slot remembers whether it was dispatched, which makes delivery
//! exactly-once by position rather than by timestamp comparison. The cursor
//! is the first slot still pending; forward playback touches only the slots
//! between the cursor and the binary-searched upper bound of a tick.

use tracing::debug;

use crate::clock::SimTime;
use crate::events::ScriptedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Pending,
    Dispatched,
    /// Merged in after playback had already crossed its timestamp; never dispatched.
    Passed,
}

#[derive(Debug, Clone)]
struct Slot {
    event: ScriptedEvent,
    state: SlotState,
}

/// Result of [TimelineDriver::merge].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    /// Incoming events identical to an already loaded one.
    pub duplicates: usize,
    /// Added events that were already in the past and will not fire.
    pub passed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TimelineDriver {
    slots: Vec<Slot>,
    cursor: usize,
    /// Time of the last advance; `None` before the first one of a run.
    horizon: Option<SimTime>,
}

impl TimelineDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole sequence and resets dispatch state.
    pub fn load(&mut self, mut events: Vec<ScriptedEvent>) {
        events.sort_by_key(|event| event.timestamp);
        self.slots = events
            .into_iter()
            .map(|event| Slot {
                event,
                state: SlotState::Pending,
            })
            .collect();
        self.cursor = 0;
        self.horizon = None;
    }

    /// Adds `events` that are not already loaded. Equality is by value and
    /// counted as a multiset, so merging the same batch twice is a no-op while
    /// genuinely repeated events in one batch are all kept. Events at or before
    /// the last advanced time are recorded as passed.
    pub fn merge(&mut self, events: Vec<ScriptedEvent>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut claimed = vec![false; self.slots.len()];
        let mut fresh = Vec::new();

        for event in events {
            let lo = self
                .slots
                .partition_point(|slot| slot.event.timestamp < event.timestamp);
            let hi = self
                .slots
                .partition_point(|slot| slot.event.timestamp <= event.timestamp);
            let existing =
                (lo..hi).find(|&index| !claimed[index] && self.slots[index].event == event);
            match existing {
                Some(index) => {
                    claimed[index] = true;
                    outcome.duplicates += 1;
                }
                None => fresh.push(event),
            }
        }

        for event in fresh {
            let passed = self.horizon.is_some_and(|horizon| event.timestamp <= horizon);
            if passed {
                outcome.passed += 1;
            }
            outcome.added += 1;
            self.slots.push(Slot {
                event,
                state: if passed {
                    SlotState::Passed
                } else {
                    SlotState::Pending
                },
            });
        }

        if outcome.added > 0 {
            self.slots.sort_by_key(|slot| slot.event.timestamp);
            self.recompute_cursor();
        }
        outcome
    }

    /// Returns every pending event with `timestamp <= now`, in order, and marks
    /// them dispatched.
    pub fn advance(&mut self, now: SimTime) -> Vec<ScriptedEvent> {
        self.horizon = Some(now);
        let upper = self.upper_bound(now);
        let mut due = Vec::new();
        for slot in self.slots.iter_mut().take(upper).skip(self.cursor) {
            if slot.state == SlotState::Pending {
                slot.state = SlotState::Dispatched;
                due.push(slot.event.clone());
            }
        }
        self.skip_settled();
        due
    }

    /// Repositions for an absolute seek and returns how many pending events lie
    /// at or before `time`; those are delivered by the next [Self::advance].
    /// Dispatched events stay dispatched on a backward seek.
    pub fn seek(&mut self, time: SimTime) -> usize {
        self.recompute_cursor();
        let upper = self.upper_bound(time);
        let pending = self
            .slots
            .iter()
            .take(upper)
            .skip(self.cursor)
            .filter(|slot| slot.state == SlotState::Pending)
            .count();
        debug!(time, pending, cursor = self.cursor, "timeline seek");
        pending
    }

    /// Marks everything pending again, for a fresh run.
    pub fn rewind(&mut self) {
        for slot in &mut self.slots {
            slot.state = SlotState::Pending;
        }
        self.cursor = 0;
        self.horizon = None;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn dispatched_count(&self) -> usize {
        self.count(SlotState::Dispatched)
    }

    pub fn pending_count(&self) -> usize {
        self.count(SlotState::Pending)
    }

    /// No pending events left.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.slots.len()
    }

    pub fn next_timestamp(&self) -> Option<SimTime> {
        self.slots
            .iter()
            .skip(self.cursor)
            .find(|slot| slot.state == SlotState::Pending)
            .map(|slot| slot.event.timestamp)
    }

    /// First and last timestamps, if any events are loaded.
    pub fn span(&self) -> Option<(SimTime, SimTime)> {
        let first = self.slots.first()?.event.timestamp;
        let last = self.slots.last()?.event.timestamp;
        Some((first, last))
    }

    /// All loaded events in dispatch order.
    pub fn events(&self) -> impl Iterator<Item = &ScriptedEvent> {
        self.slots.iter().map(|slot| &slot.event)
    }

    fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|slot| slot.state == state).count()
    }

    fn upper_bound(&self, time: SimTime) -> usize {
        self.slots
            .partition_point(|slot| slot.event.timestamp <= time)
    }

    fn recompute_cursor(&mut self) {
        self.cursor = self
            .slots
            .iter()
            .position(|slot| slot.state == SlotState::Pending)
            .unwrap_or(self.slots.len());
    }

    fn skip_settled(&mut self) {
        while self
            .slots
            .get(self.cursor)
            .is_some_and(|slot| slot.state != SlotState::Pending)
        {
            self.cursor += 1;
        }
    }
}
