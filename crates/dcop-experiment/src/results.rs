//! Results collection and output for algorithm comparison runs.
//!
//! Captures per-run cost curves and aggregates them per graph family and
//! algorithm: averaged cost-by-iteration, final costs, improvement over the
//! initial random assignment.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Algorithm name, e.g. "DSA-C(p=0.7)"
    pub algorithm: String,
    /// Graph family name, e.g. "uniform_sparse"
    pub family: String,
    /// Number of agents
    pub agents: usize,
    /// Domain size
    pub domain_size: usize,
    /// Constraint density
    pub density: f64,
    /// Trial number (instance index within the batch)
    pub trial: usize,
    /// Random seed for the run
    pub seed: u64,
}

/// Results from a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Run configuration
    pub config: RunConfig,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Algorithm iterations executed
    pub iterations: usize,
    /// Cost of the random initial assignment
    pub initial_cost: f64,
    /// Cost after the last iteration
    pub final_cost: f64,
    /// Improvement over the initial assignment, in percent
    pub improvement_pct: f64,
    /// Global cost per iteration, index 0 being the initial assignment
    pub cost_history: Vec<f64>,
}

/// Aggregate results from a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResults {
    /// All individual results
    pub results: Vec<RunResult>,
    /// Summary statistics keyed by `family:algorithm`
    pub summary: HashMap<String, AlgorithmSummary>,
}

/// Summary statistics for one algorithm on one graph family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub config_key: String,
    pub trials: usize,
    pub avg_initial_cost: f64,
    pub avg_final_cost: f64,
    pub avg_improvement_pct: f64,
    pub best_final_cost: f64,
    pub worst_final_cost: f64,
    /// Cost per iteration averaged over the trials
    pub avg_cost_by_iteration: Vec<f64>,
}

impl ComparisonResults {
    /// Create a new empty result set.
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            summary: HashMap::new(),
        }
    }

    /// Add a result.
    pub fn add(&mut self, result: RunResult) {
        self.results.push(result);
    }

    /// Compute summary statistics over everything added so far.
    pub fn compute_summary(&mut self) {
        let mut by_key: HashMap<String, Vec<&RunResult>> = HashMap::new();
        for result in &self.results {
            let key = format!("{}:{}", result.config.family, result.config.algorithm);
            by_key.entry(key).or_default().push(result);
        }

        for (key, results) in by_key {
            let n = results.len() as f64;

            let avg_initial_cost = results.iter().map(|r| r.initial_cost).sum::<f64>() / n;
            let avg_final_cost = results.iter().map(|r| r.final_cost).sum::<f64>() / n;
            let avg_improvement_pct =
                results.iter().map(|r| r.improvement_pct).sum::<f64>() / n;
            let best_final_cost = results
                .iter()
                .map(|r| r.final_cost)
                .fold(f64::INFINITY, f64::min);
            let worst_final_cost = results
                .iter()
                .map(|r| r.final_cost)
                .fold(f64::NEG_INFINITY, f64::max);

            // Trials share the iteration budget, so the curves line up
            // index by index.
            let curve_len = results
                .iter()
                .map(|r| r.cost_history.len())
                .min()
                .unwrap_or(0);
            let avg_cost_by_iteration = (0..curve_len)
                .map(|i| results.iter().map(|r| r.cost_history[i]).sum::<f64>() / n)
                .collect();

            self.summary.insert(
                key.clone(),
                AlgorithmSummary {
                    config_key: key,
                    trials: results.len(),
                    avg_initial_cost,
                    avg_final_cost,
                    avg_improvement_pct,
                    best_final_cost,
                    worst_final_cost,
                    avg_cost_by_iteration,
                },
            );
        }
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

impl Default for ComparisonResults {
    fn default() -> Self {
        Self::new()
    }
}

/// Improvement of `final_cost` over `initial_cost` in percent, zero when the
/// initial assignment already cost nothing.
pub fn improvement_pct(initial_cost: f64, final_cost: f64) -> f64 {
    if initial_cost == 0.0 {
        0.0
    } else {
        (initial_cost - final_cost) / initial_cost * 100.0
    }
}
