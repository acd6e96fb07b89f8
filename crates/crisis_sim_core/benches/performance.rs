//! Performance benchmarks for crisis_sim_core using Criterion.rs.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crisis_sim_core::config::SimulationConfig;
use crisis_sim_core::runner::run_until_finished;
use crisis_sim_core::scenario::{build_dataset, ScenarioParams};
use crisis_sim_core::service::SimulationService;
use crisis_sim_core::test_helpers::disaster_at;
use crisis_sim_core::timeline::TimelineDriver;

fn bench_timeline_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_advance");
    for size in [1_000_i64, 10_000, 100_000] {
        let events: Vec<_> = (0..size).map(|i| disaster_at(i * 100)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| {
                let mut driver = TimelineDriver::new();
                driver.load(events.clone());
                let mut dispatched = 0;
                // 1000 evenly spaced ticks across the script.
                let step = (size * 100 / 1_000).max(1);
                let mut now = 0;
                while !driver.is_exhausted() {
                    now += step;
                    dispatched += driver.advance(now).len();
                }
                black_box(dispatched)
            });
        });
    }
    group.finish();
}

fn bench_merge_reload(c: &mut Criterion) {
    let events: Vec<_> = (0..10_000_i64).map(|i| disaster_at(i * 100)).collect();
    c.bench_function("merge_duplicate_reload_10k", |b| {
        let mut driver = TimelineDriver::new();
        driver.merge(events.clone());
        b.iter(|| black_box(driver.merge(events.clone())));
    });
}

fn bench_full_replay(c: &mut Criterion) {
    let scenarios = vec![("small", 10, 10), ("medium", 100, 100), ("large", 1_000, 1_000)];

    let mut group = c.benchmark_group("full_replay");
    for (name, stations, resources) in scenarios {
        let dataset = build_dataset(
            &ScenarioParams::default()
                .with_seed(42)
                .with_stations(stations)
                .with_resources(resources)
                .with_evacuation_zones(stations / 4, stations / 8),
        );
        group.bench_with_input(BenchmarkId::from_parameter(name), &dataset, |b, dataset| {
            b.iter(|| {
                let service =
                    SimulationService::new(SimulationConfig::default().with_speed(60.0));
                service.load_data(dataset);
                black_box(run_until_finished(&service, Duration::from_secs(1), 1_000_000))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_timeline_advance, bench_merge_reload, bench_full_replay);
criterion_main!(benches);
