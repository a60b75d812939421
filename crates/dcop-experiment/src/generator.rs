//! Random constraint-graph generator.
//!
//! Produces the two benchmark problem families: uniform random graphs, where
//! every value combination on an edge draws a cost from `[cost_lb, cost_ub]`,
//! and graph coloring, where only matching values are penalized.

use anyhow::{ensure, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use dcop_kernel::graph::CostTable;
use dcop_kernel::{AgentId, ConstraintGraph, Value};

/// Which cost structure to put on each generated edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Every value pair draws an independent uniform cost.
    UniformRandom,
    /// Matching values draw a uniform penalty, differing values cost nothing.
    GraphColoring,
}

/// Configuration for graph generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of agents (one variable each)
    pub agents: usize,
    /// Domain size, shared by every agent
    pub domain_size: usize,
    /// Probability of a constraint between any two agents
    pub density: f64,
    /// Lower bound for random costs
    pub cost_lb: f64,
    /// Upper bound for random costs
    pub cost_ub: f64,
    /// Cost structure on each edge
    pub kind: GraphKind,
    /// Random seed for reproducibility (None for random)
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            agents: 30,
            domain_size: 5,
            density: 0.25,
            cost_lb: 100.0,
            cost_ub: 200.0,
            kind: GraphKind::UniformRandom,
            seed: None,
        }
    }
}

/// Constraint graph generator.
pub struct GraphGenerator {
    config: GeneratorConfig,
}

impl GraphGenerator {
    /// Create a new generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Generate one constraint graph.
    ///
    /// Agents are named `agent_0 .. agent_{n-1}` and share the ascending
    /// domain `0 .. domain_size`. Each unordered agent pair gets an edge with
    /// probability `density`.
    pub fn generate(&self) -> Result<ConstraintGraph> {
        let cfg = &self.config;
        ensure!(
            (0.0..=1.0).contains(&cfg.density),
            "density must be in [0, 1], got {}",
            cfg.density
        );
        ensure!(cfg.domain_size >= 1, "domain size must be at least 1");
        ensure!(
            cfg.cost_lb <= cfg.cost_ub,
            "cost bounds are inverted: [{}, {}]",
            cfg.cost_lb,
            cfg.cost_ub
        );

        let mut rng: Box<dyn RngCore> = match cfg.seed {
            Some(seed) => Box::new(ChaCha8Rng::seed_from_u64(seed)),
            None => Box::new(rand::rng()),
        };

        let ids: Vec<AgentId> = (0..cfg.agents).map(|i| format!("agent_{i}")).collect();
        let domain: Vec<Value> = (0..cfg.domain_size as Value).collect();

        let mut graph = ConstraintGraph::new();
        for id in &ids {
            graph.add_agent(id.clone(), domain.clone())?;
        }

        for i in 0..cfg.agents {
            for j in (i + 1)..cfg.agents {
                if !rng.random_bool(cfg.density) {
                    continue;
                }
                let mut table = CostTable::new();
                for &a in &domain {
                    for &b in &domain {
                        let cost = match cfg.kind {
                            GraphKind::UniformRandom => {
                                rng.random_range(cfg.cost_lb..=cfg.cost_ub)
                            }
                            GraphKind::GraphColoring if a == b => {
                                rng.random_range(cfg.cost_lb..=cfg.cost_ub)
                            }
                            GraphKind::GraphColoring => 0.0,
                        };
                        table.insert((a, b), cost);
                    }
                }
                graph.add_constraint(ids[i].clone(), ids[j].clone(), table)?;
            }
        }

        Ok(graph)
    }

    /// Generate multiple independent instances. With a fixed base seed,
    /// instance `k` uses `seed + k` so the batch is reproducible as a whole.
    pub fn generate_batch(&self, count: usize) -> Result<Vec<ConstraintGraph>> {
        (0..count)
            .map(|k| {
                let config = GeneratorConfig {
                    seed: self.config.seed.map(|s| s + k as u64),
                    ..self.config.clone()
                };
                GraphGenerator::new(config).generate()
            })
            .collect()
    }
}

/// The benchmark problem families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFamily {
    /// Uniform random costs, density 0.25
    UniformSparse,
    /// Uniform random costs, density 0.75
    UniformDense,
    /// Graph coloring with 3 colors, density 0.1
    Coloring,
}

impl GraphFamily {
    pub fn all() -> Vec<Self> {
        vec![Self::UniformSparse, Self::UniformDense, Self::Coloring]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UniformSparse => "uniform_sparse",
            Self::UniformDense => "uniform_dense",
            Self::Coloring => "graph_coloring",
        }
    }

    /// Get the generator config for this family.
    pub fn config(self) -> GeneratorConfig {
        match self {
            Self::UniformSparse => GeneratorConfig {
                domain_size: 5,
                density: 0.25,
                kind: GraphKind::UniformRandom,
                ..GeneratorConfig::default()
            },
            Self::UniformDense => GeneratorConfig {
                domain_size: 5,
                density: 0.75,
                kind: GraphKind::UniformRandom,
                ..GeneratorConfig::default()
            },
            Self::Coloring => GeneratorConfig {
                domain_size: 3,
                density: 0.1,
                kind: GraphKind::GraphColoring,
                ..GeneratorConfig::default()
            },
        }
    }
}
