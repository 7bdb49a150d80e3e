//! Per-node time series storage
//!
//! The store owns every observation of a run, grouped by node and kept in
//! timestamp order. Observations may arrive out of order; each append is
//! inserted at its sorted position so reads never have to sort.
//!
//! Appends take `&mut self` and reads take `&self`, so sharing the store behind
//! an `Arc` (or an `RwLock` when ingestion overlaps with reads) gives the
//! single-writer, multiple-reader discipline the batch pipeline relies on.

use std::collections::BTreeMap;

use crate::error::{ForecastError, Result};
use crate::observation::Observation;

/// Ordered per-node observation history
#[derive(Debug, Default, Clone)]
pub struct TimeSeriesStore {
    series: BTreeMap<String, Vec<Observation>>,
    total: usize,
}

impl TimeSeriesStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a batch of observations, failing on the first invalid one
    pub fn from_observations<I>(observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut store = Self::new();
        for obs in observations {
            store.append(obs)?;
        }
        Ok(store)
    }

    /// Add one observation
    ///
    /// Equal timestamps keep arrival order.
    pub fn append(&mut self, observation: Observation) -> Result<()> {
        observation.validate()?;

        let series = self.series.entry(observation.node_id.clone()).or_default();
        let position = series.partition_point(|o| o.timestamp <= observation.timestamp);
        series.insert(position, observation);
        self.total += 1;
        Ok(())
    }

    /// Full history of a node, ascending by timestamp
    pub fn series_for(&self, node_id: &str) -> Result<&[Observation]> {
        self.series
            .get(node_id)
            .map(Vec::as_slice)
            .ok_or_else(|| ForecastError::NotFound(node_id.to_string()))
    }

    /// The last `count` observations of a node, ascending by timestamp
    ///
    /// Returns fewer when the history is shorter; that is not an error.
    pub fn window(&self, node_id: &str, count: usize) -> Result<&[Observation]> {
        let series = self.series_for(node_id)?;
        let start = series.len().saturating_sub(count);
        Ok(&series[start..])
    }

    /// Node identifiers in sorted order
    pub fn node_ids(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    /// Number of distinct nodes
    pub fn node_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of observations across all nodes
    pub fn len(&self) -> usize {
        self.total
    }

    /// True if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// All observations, grouped by node in node order
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.series.values().flatten()
    }
}
