//! Criterion benchmarks for the insertion optimizer.
//!
//! Measures optimize time across problem sizes (25, 50, 100 stops over five
//! trucks) using the haversine provider, so the numbers cover matrix
//! construction, insertion and local search.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package truckify-solver
//! ```

// Criterion macros generate code that triggers missing_docs warnings.
#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geo::Coord;
use truckify_core::{
    Constraints, HaversineTravelTimeProvider, Optimizer, PlanRequest, Stop, Vehicle,
};
use truckify_solver::InsertionOptimizer;

/// Problem sizes to benchmark.
const PROBLEM_SIZES: &[usize] = &[25, 50, 100];

/// Trucks in every benchmark fleet.
const FLEET_SIZE: u32 = 5;

/// Spread `count` points over a deterministic spiral around central London.
#[expect(
    clippy::float_arithmetic,
    reason = "benchmark fixtures place points with floating-point geometry"
)]
fn spiral(count: usize) -> impl Iterator<Item = Coord<f64>> {
    const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
    (0..count).map(|idx| {
        #[expect(clippy::cast_precision_loss, reason = "benchmark sizes are small")]
        let step = idx as f64;
        let radius = 0.002 * step.sqrt();
        let angle = GOLDEN_ANGLE * step;
        Coord {
            x: -0.12 + radius * angle.cos(),
            y: 51.50 + radius * angle.sin(),
        }
    })
}

fn build_request(stop_count: usize) -> PlanRequest {
    let vehicles = (0..FLEET_SIZE)
        .zip(spiral(usize::try_from(FLEET_SIZE).unwrap_or(1)))
        .map(|(idx, position)| Vehicle::new(format!("V{idx}"), 40, position))
        .collect();
    let stops = spiral(stop_count)
        .zip([1_u32, 2, 3].into_iter().cycle())
        .enumerate()
        .map(|(idx, (location, demand))| Stop::new(format!("S{idx:03}"), location, demand))
        .collect();
    PlanRequest {
        plan_id: "bench".into(),
        vehicles,
        stops,
        constraints: Constraints::default(),
    }
}

fn bench_optimize_times(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize_time");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    let optimizer = InsertionOptimizer::new(HaversineTravelTimeProvider::default());
    for &size in PROBLEM_SIZES {
        let request = build_request(size);
        group.throughput(Throughput::Elements(u64::try_from(size).unwrap_or(u64::MAX)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| optimizer.optimize(request));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_optimize_times);
criterion_main!(benches);
