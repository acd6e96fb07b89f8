//! Synthetic scenarios: seeded flood datasets for demos, tests and benches.
//!
//! Generated datasets have the same shape as JSON fixtures, so they go through
//! the same [crate::dataset::Dataset::scripted_events] path when loaded.

mod build;
mod params;

pub use build::build_dataset;
pub use params::ScenarioParams;
