//! End-to-end forecast scenarios
//!
//! Three nodes, one week of hourly history, no noise: every profile is flat at
//! the node's base PUE and the attestations carry `round(base * 1000)`.

use std::collections::BTreeSet;
use std::sync::Arc;

use pue_oracle::attestation::{AttestationBuilder, DigestProofGenerator};
use pue_oracle::config::PipelineConfig;
use pue_oracle::forecast::Forecaster;
use pue_oracle::noise::ZeroNoise;
use pue_oracle::pipeline::ForecastPipeline;
use pue_oracle::profile::SeasonalProfileEstimator;
use pue_oracle::store::TimeSeriesStore;
use pue_oracle::synthetic::{self, SyntheticConfig};
use pue_oracle::ForecastError;

fn flat_week_store() -> TimeSeriesStore {
    let config = SyntheticConfig {
        end: Some("2024-04-07 23:00:00".to_string()),
        ..SyntheticConfig::flat(7, 3)
    };
    let rows = synthetic::generate(&config, &mut ZeroNoise).unwrap();
    TimeSeriesStore::from_observations(rows).unwrap()
}

fn expected_base(node_id: &str) -> f64 {
    match node_id {
        "node_0" => 1.2,
        "node_1" => 1.3,
        "node_2" => 1.4,
        other => panic!("unexpected node {}", other),
    }
}

#[test]
fn test_flat_week_store_shape() {
    let store = flat_week_store();
    assert_eq!(store.node_ids(), vec!["node_0", "node_1", "node_2"]);
    for node in store.node_ids() {
        assert_eq!(store.series_for(&node).unwrap().len(), 168);
    }
}

#[test]
fn test_flat_week_profiles_are_flat() {
    let store = flat_week_store();
    let estimator = SeasonalProfileEstimator::default();

    for node in store.node_ids() {
        let profile = estimator.estimate(store.series_for(&node).unwrap()).unwrap();
        assert!(profile.is_complete());
        for hour in 0..24 {
            assert!((profile.get(hour).unwrap() - expected_base(&node)).abs() < 1e-9);
        }
    }
}

#[test]
fn test_flat_week_stage_by_stage() {
    let store = flat_week_store();
    let series = store.series_for("node_0").unwrap();
    let last = series.last().unwrap().timestamp;

    let profile = SeasonalProfileEstimator::default().estimate(series).unwrap();
    let points = Forecaster::new(0.0)
        .forecast(&profile, last, "node_0", 24, &mut ZeroNoise)
        .unwrap();
    let records = AttestationBuilder::new()
        .build(&points, &DigestProofGenerator)
        .unwrap();

    assert_eq!(points.len(), 24);
    assert_eq!(points[0].timestamp, last + chrono::Duration::hours(1));
    assert!(points.iter().all(|p| (p.predicted_pue - 1.2).abs() < 1e-9));
    assert!(records.iter().all(|r| r.pue_value == 1200));
}

#[test]
fn test_flat_week_full_pipeline() {
    let config = PipelineConfig {
        jitter_stddev: 0.0,
        ..PipelineConfig::default()
    };
    let store = flat_week_store();
    let report = ForecastPipeline::from_config(&config).run_sequential(&store, &DigestProofGenerator);

    assert_eq!(report.failure_count(), 0);
    let records = report.records();
    assert_eq!(records.len(), 3 * 24);

    for record in &records {
        let expected = (expected_base(&record.node_id) * 1000.0).round() as u32;
        assert_eq!(record.pue_value, expected);
    }

    // Node set is preserved end to end
    let input: BTreeSet<String> = store.node_ids().into_iter().collect();
    let output: BTreeSet<String> = records.iter().map(|r| r.node_id.clone()).collect();
    assert_eq!(input, output);
}

#[test]
fn test_parallel_pipeline_same_records() {
    let config = PipelineConfig {
        jitter_stddev: 0.0,
        parallel: true,
        node_timeout_ms: Some(10_000),
        ..PipelineConfig::default()
    };
    let store = Arc::new(flat_week_store());
    let pipeline = ForecastPipeline::from_config(&config);

    let parallel = pipeline.run(Arc::clone(&store), Arc::new(DigestProofGenerator));
    let sequential = pipeline.run_sequential(&store, &DigestProofGenerator);

    assert_eq!(parallel.records(), sequential.records());
}

#[test]
fn test_seasonal_profile_converges_with_noise() {
    // Hourly sine pattern with 3% multiplicative noise, four weeks of data
    let config = SyntheticConfig {
        end: Some("2024-04-28 23:00:00".to_string()),
        days: 28,
        nodes: 1,
        day_amplitude: 0.0,
        ..SyntheticConfig::default()
    };
    let rows = synthetic::generate(&config, &mut pue_oracle::noise::RngGaussian::seeded(11)).unwrap();
    let store = TimeSeriesStore::from_observations(rows).unwrap();
    let series = store.series_for("node_0").unwrap();

    let profile = SeasonalProfileEstimator::new(series.len())
        .estimate(series)
        .unwrap();

    for hour in 0..24u32 {
        let truth = 1.2 * (1.0 + 0.1 * (hour as f64 * std::f64::consts::PI / 12.0).sin());
        let estimate = profile.get(hour).unwrap();
        assert!(
            (estimate - truth).abs() < 0.04,
            "hour {}: estimate {} vs truth {}",
            hour,
            estimate,
            truth
        );
    }
}

#[test]
fn test_empty_history_is_insufficient_data() {
    let err = SeasonalProfileEstimator::default().estimate(&[]).unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientData(_)));
}

#[test]
fn test_repeated_build_is_idempotent_with_stub_prover() {
    let store = flat_week_store();
    let config = PipelineConfig {
        jitter_stddev: 0.0,
        ..PipelineConfig::default()
    };
    let pipeline = ForecastPipeline::from_config(&config);

    let first = pipeline.run_sequential(&store, &DigestProofGenerator).records();
    let second = pipeline.run_sequential(&store, &DigestProofGenerator).records();
    assert_eq!(first, second);
}
