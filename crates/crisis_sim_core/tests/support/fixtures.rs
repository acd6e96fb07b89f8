#![allow(dead_code)]

use std::path::PathBuf;

use crisis_sim_core::dataset::Dataset;

/// The bundled June 2024 flood fixture.
pub fn flood_fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("flood_scenario.json")
}

pub fn flood_fixture() -> Dataset {
    Dataset::from_path(&flood_fixture_path()).expect("bundled fixture should load")
}

/// Scripted events the fixture yields (one more entry is malformed).
pub const FIXTURE_EVENT_COUNT: usize = 12;
