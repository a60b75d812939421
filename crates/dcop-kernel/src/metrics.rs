//! Per-round metrics reporting.
//!
//! The kernel exposes `(algorithm, round, global cost)` after every round
//! through an append-style sink; aggregation and plotting belong to the
//! collaborator on the other side of the interface.

use serde::{Deserialize, Serialize};

/// One round's observation of the running simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundMetrics {
    pub algorithm: String,
    pub round: usize,
    pub global_cost: f64,
}

/// Append-style recording interface.
pub trait MetricsSink {
    fn record(&mut self, metrics: RoundMetrics);
}

/// Vec-backed sink for in-process collection.
#[derive(Debug, Clone, Default)]
pub struct CostLog {
    pub entries: Vec<RoundMetrics>,
}

impl CostLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn costs(&self) -> Vec<f64> {
        self.entries.iter().map(|m| m.global_cost).collect()
    }
}

impl MetricsSink for CostLog {
    fn record(&mut self, metrics: RoundMetrics) {
        self.entries.push(metrics);
    }
}
