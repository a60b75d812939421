//! Benchmark harness for the DCOP kernel.
//!
//! Generates random constraint graphs, runs the local-search algorithms the
//! kernel provides over them, and collects per-iteration cost curves:
//! - seeded graph generation (uniform random and graph coloring)
//! - single runs and multi-algorithm comparisons averaged over instances
//! - JSON results with summary statistics

pub mod experiment;
pub mod generator;
pub mod results;
