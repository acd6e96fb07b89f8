//! Dispatch metrics: tick timing and event counts per type.

use std::collections::HashMap;
use std::time::Duration;

use crate::events::EventType;

/// Per-tick timing metrics.
#[derive(Debug, Clone, Default)]
pub struct TickTiming {
    /// Total time spent in ticks (cumulative).
    pub total_duration: Duration,
    /// Number of ticks that advanced the clock.
    pub tick_count: u64,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub last_duration: Duration,
}

impl TickTiming {
    pub fn record(&mut self, duration: Duration) {
        self.total_duration += duration;
        self.tick_count += 1;
        if duration < self.min_duration || self.tick_count == 1 {
            self.min_duration = duration;
        }
        if duration > self.max_duration {
            self.max_duration = duration;
        }
        self.last_duration = duration;
    }

    pub fn avg_duration(&self) -> Duration {
        if self.tick_count == 0 {
            Duration::ZERO
        } else {
            let avg_nanos = self.total_duration.as_nanos() / self.tick_count as u128;
            Duration::from_nanos(avg_nanos as u64)
        }
    }
}

/// Counts of delivered events.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetrics {
    pub ticks: TickTiming,
    /// Scripted events delivered.
    pub events_dispatched: u64,
    pub events_by_type: HashMap<EventType, u64>,
    /// Forward seeks that triggered a catch-up dispatch.
    pub catch_up_passes: u64,
}

impl DispatchMetrics {
    pub fn record_event(&mut self, event_type: EventType) {
        self.events_dispatched += 1;
        *self.events_by_type.entry(event_type).or_insert(0) += 1;
    }

    pub fn count(&self, event_type: EventType) -> u64 {
        self.events_by_type.get(&event_type).copied().unwrap_or(0)
    }

    /// Print summary statistics.
    pub fn print_summary(&self) {
        println!("\n=== Dispatch Summary ===");
        println!("Ticks: {}", self.ticks.tick_count);
        println!(
            "Tick time: avg {:.2}μs | min {:.2}μs | max {:.2}μs",
            self.ticks.avg_duration().as_secs_f64() * 1_000_000.0,
            self.ticks.min_duration.as_secs_f64() * 1_000_000.0,
            self.ticks.max_duration.as_secs_f64() * 1_000_000.0,
        );
        println!("Events dispatched: {}", self.events_dispatched);
        println!("Catch-up passes: {}", self.catch_up_passes);

        println!("\nEvents by type:");
        let mut entries: Vec<_> = self.events_by_type.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (event_type, count) in entries {
            println!("  {:30} : {}", event_type.as_str(), count);
        }
    }
}
