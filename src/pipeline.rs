//! Batch forecast pipeline
//!
//! Runs `store -> profile -> forecast -> attest` for every node in a
//! [`TimeSeriesStore`]. Nodes are independent: each one gets its own noise
//! source and its own outcome, and a failing node never discards the records
//! already produced for the others.
//!
//! In parallel mode each node runs on its own thread reading a shared
//! `Arc<TimeSeriesStore>`. Outcomes are collected over a channel; with a
//! per-node timeout, nodes that have not reported by the deadline are marked
//! as timed out while the finished ones keep their results. A panicking
//! worker reports its panic instead of waiting out the deadline.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel;
use serde::Serialize;

use crate::attestation::{AttestationBuilder, AttestationRecord, ProofGenerator};
use crate::config::PipelineConfig;
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastPoint, Forecaster};
use crate::noise::{self, GaussianSource};
use crate::profile::{HourlyProfile, SeasonalProfileEstimator};
use crate::store::TimeSeriesStore;

/// Everything produced for one node
#[derive(Debug, Clone, Serialize)]
pub struct NodeForecast {
    pub node_id: String,
    /// Observations inside the profile window
    pub observations_used: usize,
    pub profile: HourlyProfile,
    pub forecasts: Vec<ForecastPoint>,
    pub records: Vec<AttestationRecord>,
}

/// Success or failure of a single node
#[derive(Debug)]
pub struct NodeOutcome {
    pub node_id: String,
    pub result: Result<NodeForecast>,
}

impl NodeOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-node outcomes of a batch run, in node id order
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<NodeOutcome>,
}

impl BatchReport {
    pub fn outcomes(&self) -> &[NodeOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<NodeOutcome> {
        self.outcomes
    }

    /// Outcome for one node
    pub fn outcome(&self, node_id: &str) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.node_id == node_id)
    }

    /// Successful nodes
    pub fn succeeded(&self) -> impl Iterator<Item = &NodeForecast> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed nodes with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ForecastError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.node_id.as_str(), e)))
    }

    /// All attestation records of successful nodes, node by node
    pub fn records(&self) -> Vec<AttestationRecord> {
        self.succeeded()
            .flat_map(|n| n.records.iter().cloned())
            .collect()
    }

    /// All forecast points of successful nodes, node by node
    pub fn forecasts(&self) -> Vec<ForecastPoint> {
        self.succeeded()
            .flat_map(|n| n.forecasts.iter().cloned())
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// True when there was at least one node and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.success_count() == 0
    }
}

/// Forecast + attestation driver for a whole store
#[derive(Debug, Clone, Copy)]
pub struct ForecastPipeline {
    estimator: SeasonalProfileEstimator,
    forecaster: Forecaster,
    builder: AttestationBuilder,
    horizon: usize,
    seed: Option<u64>,
    parallel: bool,
    node_timeout: Option<Duration>,
}

impl Default for ForecastPipeline {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ForecastPipeline {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            estimator: SeasonalProfileEstimator::new(config.window_size),
            forecaster: Forecaster::new(config.jitter_stddev).with_gap_policy(config.gap_policy),
            builder: AttestationBuilder::new(),
            horizon: config.horizon,
            seed: config.seed,
            parallel: config.parallel,
            node_timeout: config.node_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Forecast and attest a single node with an explicit noise source
    pub fn run_node<P, G>(
        &self,
        store: &TimeSeriesStore,
        node_id: &str,
        prover: &P,
        noise: &mut G,
    ) -> Result<NodeForecast>
    where
        P: ProofGenerator + ?Sized,
        G: GaussianSource + ?Sized,
    {
        let series = store.series_for(node_id)?;
        let window = store.window(node_id, self.estimator.window_size())?;
        let last_timestamp = series
            .last()
            .map(|o| o.timestamp)
            .ok_or(ForecastError::InsufficientData(0))?;

        let profile = self.estimator.estimate(window)?;
        if !profile.is_complete() {
            tracing::warn!(
                "Profile for {} covers {} of 24 hours",
                node_id,
                profile.coverage()
            );
        }

        let forecasts =
            self.forecaster
                .forecast(&profile, last_timestamp, node_id, self.horizon, noise)?;
        let records = self.builder.build(&forecasts, prover)?;

        Ok(NodeForecast {
            node_id: node_id.to_string(),
            observations_used: window.len(),
            profile,
            forecasts,
            records,
        })
    }

    /// Run every node, on threads when the pipeline is configured as parallel
    pub fn run<P>(&self, store: Arc<TimeSeriesStore>, prover: Arc<P>) -> BatchReport
    where
        P: ProofGenerator + Send + Sync + ?Sized + 'static,
    {
        if self.parallel {
            self.run_parallel(store, prover)
        } else {
            self.run_sequential(&store, &*prover)
        }
    }

    /// Run every node one after the other on the calling thread
    pub fn run_sequential<P>(&self, store: &TimeSeriesStore, prover: &P) -> BatchReport
    where
        P: ProofGenerator + ?Sized,
    {
        let outcomes = store
            .node_ids()
            .into_iter()
            .map(|node_id| {
                let mut noise = noise::source_for_node(self.seed, &node_id);
                let result = self.run_node(store, &node_id, prover, &mut noise);
                log_outcome(&node_id, &result);
                NodeOutcome { node_id, result }
            })
            .collect();

        BatchReport { outcomes }
    }

    /// Run every node on its own thread
    pub fn run_parallel<P>(&self, store: Arc<TimeSeriesStore>, prover: Arc<P>) -> BatchReport
    where
        P: ProofGenerator + Send + Sync + ?Sized + 'static,
    {
        let node_ids = store.node_ids();
        let mut slots: Vec<Option<Result<NodeForecast>>> =
            node_ids.iter().map(|_| None).collect();
        let (tx, rx) = channel::unbounded::<(usize, Result<NodeForecast>)>();

        for (index, node_id) in node_ids.iter().enumerate() {
            let pipeline = *self;
            let store = Arc::clone(&store);
            let prover = Arc::clone(&prover);
            let tx = tx.clone();
            let worker_node = node_id.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("pue-{}", node_id))
                .spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        let mut noise = noise::source_for_node(pipeline.seed, &worker_node);
                        pipeline.run_node(&store, &worker_node, &*prover, &mut noise)
                    }));
                    let result = outcome.unwrap_or_else(|payload| {
                        Err(ForecastError::WorkerPanicked {
                            node_id: worker_node.clone(),
                            message: panic_message(&*payload),
                        })
                    });
                    // Receiver may be gone after a timeout
                    let _ = tx.send((index, result));
                });

            if let Err(e) = spawned {
                slots[index] = Some(Err(ForecastError::Io(e)));
            }
        }
        drop(tx);

        let deadline = self.node_timeout.map(|timeout| Instant::now() + timeout);
        let mut pending = slots.iter().filter(|s| s.is_none()).count();

        while pending > 0 {
            let received = match deadline {
                Some(deadline) => rx.recv_deadline(deadline).ok(),
                None => rx.recv().ok(),
            };
            let Some((index, result)) = received else {
                break;
            };
            slots[index] = Some(result);
            pending -= 1;
        }

        let outcomes = node_ids
            .into_iter()
            .zip(slots)
            .map(|(node_id, slot)| {
                let result = slot.unwrap_or_else(|| Err(self.missing_result(&node_id)));
                log_outcome(&node_id, &result);
                NodeOutcome { node_id, result }
            })
            .collect();

        BatchReport { outcomes }
    }

    /// Error for a node that never reported back
    fn missing_result(&self, node_id: &str) -> ForecastError {
        match self.node_timeout {
            Some(timeout) => ForecastError::Timeout {
                node_id: node_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            None => ForecastError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("worker for node '{}' exited without a result", node_id),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_outcome(node_id: &str, result: &Result<NodeForecast>) {
    match result {
        Ok(node) => tracing::info!(
            "Node {}: {} forecasts, {} attestation records",
            node_id,
            node.forecasts.len(),
            node.records.len()
        ),
        Err(e) => tracing::warn!("Node {} failed ({}): {}", node_id, e.kind(), e),
    }
}
