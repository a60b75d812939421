//! Experiment runner for algorithm comparisons.
//!
//! Orchestrates the run lifecycle:
//! 1. Generate a constraint graph (or accept one)
//! 2. Build agents for the chosen algorithm and register them
//! 3. Drive the round scheduler for the iteration budget
//! 4. Collect the per-iteration cost curve into a [`RunResult`]

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use dcop_kernel::{build_agents, AlgorithmKind, ConstraintGraph, CostLog, Environment};

use crate::generator::{GeneratorConfig, GraphFamily, GraphGenerator};
use crate::results::{improvement_pct, ComparisonResults, RunConfig, RunResult};

/// Configuration for the experiment runner.
#[derive(Debug, Clone)]
pub struct ExperimentRunnerConfig {
    /// Number of agents per generated graph
    pub agents: usize,
    /// Algorithm iterations per run
    pub iterations: usize,
}

impl Default for ExperimentRunnerConfig {
    fn default() -> Self {
        Self {
            agents: 30,
            iterations: 50,
        }
    }
}

/// The algorithm line-up every comparison runs.
pub fn comparison_suite() -> Vec<AlgorithmKind> {
    vec![
        AlgorithmKind::DsaC { probability: 0.2 },
        AlgorithmKind::DsaC { probability: 0.7 },
        AlgorithmKind::DsaC { probability: 1.0 },
        AlgorithmKind::Mgm,
        AlgorithmKind::Mgm2 {
            offer_probability: 0.5,
        },
    ]
}

/// The experiment runner.
pub struct ExperimentRunner {
    config: ExperimentRunnerConfig,
}

impl ExperimentRunner {
    /// Create a new experiment runner.
    pub fn new(config: ExperimentRunnerConfig) -> Self {
        Self { config }
    }

    /// Run one algorithm on one graph instance and collect its cost curve.
    ///
    /// The scheduler advances `iterations * rounds_per_iteration` rounds; the
    /// recorded history is downsampled to iteration boundaries so curves from
    /// different algorithms are comparable point by point.
    pub fn run_single(
        &self,
        graph: &ConstraintGraph,
        kind: AlgorithmKind,
        family: &str,
        density: f64,
        trial: usize,
        seed: u64,
    ) -> Result<RunResult> {
        let started_at = Utc::now();

        let agents =
            build_agents(graph, kind, seed).context("building agents over the graph")?;
        let domain_size = graph
            .agent_ids()
            .next()
            .and_then(|id| graph.domain(id))
            .map_or(0, |d| d.len());

        let mut env = Environment::new(graph.clone()).context("setting up the environment")?;
        for agent in agents {
            env.register_agent(agent)
                .context("registering generated agents")?;
        }

        let rounds_per_iteration = kind.rounds_per_iteration();
        let mut log = CostLog::default();
        env.run(
            &kind.name(),
            self.config.iterations * rounds_per_iteration,
            &mut log,
        )
        .context("running the round scheduler")?;

        let costs = log.costs();
        let cost_history: Vec<f64> = costs
            .iter()
            .copied()
            .step_by(rounds_per_iteration)
            .collect();
        let initial_cost = cost_history.first().copied().unwrap_or(0.0);
        let final_cost = cost_history.last().copied().unwrap_or(0.0);

        info!(
            algorithm = %kind.name(),
            family = family,
            trial = trial,
            initial_cost = initial_cost,
            final_cost = final_cost,
            "run finished"
        );

        Ok(RunResult {
            config: RunConfig {
                algorithm: kind.name(),
                family: family.to_string(),
                agents: env.agent_count(),
                domain_size,
                density,
                trial,
                seed,
            },
            started_at,
            ended_at: Utc::now(),
            iterations: self.config.iterations,
            initial_cost,
            final_cost,
            improvement_pct: improvement_pct(initial_cost, final_cost),
            cost_history,
        })
    }

    /// Run the full comparison: every algorithm in the suite on `trials`
    /// instances of each family, all algorithms sharing the same instances.
    pub fn run_comparison(
        &self,
        families: &[GraphFamily],
        trials: usize,
        seed: u64,
    ) -> Result<ComparisonResults> {
        let mut results = ComparisonResults::new();

        for &family in families {
            let gen_config = GeneratorConfig {
                agents: self.config.agents,
                seed: Some(seed),
                ..family.config()
            };
            let density = gen_config.density;
            info!(
                family = family.name(),
                trials = trials,
                agents = gen_config.agents,
                density = density,
                "generating instances"
            );
            let graphs = GraphGenerator::new(gen_config)
                .generate_batch(trials)
                .with_context(|| format!("generating {} instances", family.name()))?;

            for kind in comparison_suite() {
                for (trial, graph) in graphs.iter().enumerate() {
                    let run_seed = seed + trial as u64;
                    let result = self.run_single(
                        graph,
                        kind,
                        family.name(),
                        density,
                        trial,
                        run_seed,
                    )?;
                    results.add(result);
                }
            }
        }

        results.compute_summary();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GraphKind;

    fn runner() -> ExperimentRunner {
        ExperimentRunner::new(ExperimentRunnerConfig {
            agents: 6,
            iterations: 10,
        })
    }

    fn small_graph(seed: u64) -> ConstraintGraph {
        GraphGenerator::new(GeneratorConfig {
            agents: 6,
            domain_size: 3,
            density: 0.6,
            kind: GraphKind::UniformRandom,
            seed: Some(seed),
            ..GeneratorConfig::default()
        })
        .generate()
        .unwrap()
    }

    #[test]
    fn cost_history_has_one_point_per_iteration() {
        let graph = small_graph(5);
        for kind in comparison_suite() {
            let result = runner()
                .run_single(&graph, kind, "test", 0.6, 0, 99)
                .unwrap();
            // Initial assignment plus one point per iteration.
            assert_eq!(result.cost_history.len(), 11, "{}", kind.name());
            assert_eq!(result.initial_cost, result.cost_history[0]);
            assert_eq!(result.final_cost, *result.cost_history.last().unwrap());
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_curve() {
        let graph = small_graph(7);
        let kind = AlgorithmKind::DsaC { probability: 0.7 };
        let a = runner().run_single(&graph, kind, "test", 0.6, 0, 21).unwrap();
        let b = runner().run_single(&graph, kind, "test", 0.6, 0, 21).unwrap();
        assert_eq!(a.cost_history, b.cost_history);
    }

    #[test]
    fn mgm_curve_is_monotone_non_increasing() {
        let graph = small_graph(11);
        let result = runner()
            .run_single(&graph, AlgorithmKind::Mgm, "test", 0.6, 0, 33)
            .unwrap();
        for pair in result.cost_history.windows(2) {
            assert!(pair[1] <= pair[0], "cost rose from {} to {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn comparison_covers_every_family_and_algorithm() {
        let runner = ExperimentRunner::new(ExperimentRunnerConfig {
            agents: 5,
            iterations: 3,
        });
        let families = [GraphFamily::UniformSparse, GraphFamily::Coloring];
        let results = runner.run_comparison(&families, 2, 42).unwrap();

        // 2 families x 5 algorithms x 2 trials.
        assert_eq!(results.results.len(), 20);
        assert_eq!(results.summary.len(), 10);
        for summary in results.summary.values() {
            assert_eq!(summary.trials, 2);
            assert_eq!(summary.avg_cost_by_iteration.len(), 4);
        }
    }
}
