/// Pipeline throughput benchmarks
///
/// Measures profile estimation, forecasting and the full multi-node
/// forecast + attestation run over synthetic telemetry.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use pue_oracle::attestation::DigestProofGenerator;
use pue_oracle::config::PipelineConfig;
use pue_oracle::forecast::Forecaster;
use pue_oracle::noise::{RngGaussian, ZeroNoise};
use pue_oracle::pipeline::ForecastPipeline;
use pue_oracle::profile::SeasonalProfileEstimator;
use pue_oracle::store::TimeSeriesStore;
use pue_oracle::synthetic::{self, SyntheticConfig};

fn synthetic_store(days: usize, nodes: usize) -> TimeSeriesStore {
    let config = SyntheticConfig {
        days,
        nodes,
        end: Some("2024-06-30 23:00:00".to_string()),
        ..SyntheticConfig::default()
    };
    let rows = synthetic::generate(&config, &mut RngGaussian::seeded(1)).expect("synthetic data");
    TimeSeriesStore::from_observations(rows).expect("valid observations")
}

/// Benchmark: hourly profile over growing windows
fn bench_profile_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile_estimation");
    group.measurement_time(Duration::from_secs(5));

    let store = synthetic_store(90, 1);
    let series = store.series_for("node_0").expect("node_0");

    for window in [24usize, 168, 720, 2160] {
        group.throughput(Throughput::Elements(window as u64));
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &window| {
            let estimator = SeasonalProfileEstimator::new(window);
            b.iter(|| estimator.estimate(black_box(series)).expect("profile"));
        });
    }

    group.finish();
}

/// Benchmark: forecasting a day and a month ahead
fn bench_forecast(c: &mut Criterion) {
    let mut group = c.benchmark_group("forecast");

    let store = synthetic_store(7, 1);
    let series = store.series_for("node_0").expect("node_0");
    let profile = SeasonalProfileEstimator::default()
        .estimate(series)
        .expect("profile");
    let last = series.last().expect("history").timestamp;

    for horizon in [24usize, 720] {
        group.throughput(Throughput::Elements(horizon as u64));
        group.bench_with_input(BenchmarkId::new("jittered", horizon), &horizon, |b, &h| {
            let mut noise = RngGaussian::seeded(3);
            b.iter(|| {
                Forecaster::default()
                    .forecast(&profile, last, "node_0", h, &mut noise)
                    .expect("forecast")
            });
        });
        group.bench_with_input(BenchmarkId::new("silent", horizon), &horizon, |b, &h| {
            b.iter(|| {
                Forecaster::new(0.0)
                    .forecast(&profile, last, "node_0", h, &mut ZeroNoise)
                    .expect("forecast")
            });
        });
    }

    group.finish();
}

/// Benchmark: full pipeline, sequential vs. parallel
fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(30);

    let store = Arc::new(synthetic_store(30, 16));
    let prover = Arc::new(DigestProofGenerator);

    for parallel in [false, true] {
        let config = PipelineConfig {
            parallel,
            seed: Some(7),
            ..PipelineConfig::default()
        };
        let pipeline = ForecastPipeline::from_config(&config);
        let label = if parallel { "parallel" } else { "sequential" };

        group.bench_function(label, |b| {
            b.iter(|| pipeline.run(Arc::clone(&store), Arc::clone(&prover)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_profile_estimation,
    bench_forecast,
    bench_full_pipeline
);
criterion_main!(benches);
