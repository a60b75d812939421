//! End-to-end tests for the algorithm suite over generated graphs.
//!
//! Tests the full flow of:
//! - ConstraintGraph -> build_agents -> Environment -> cost curve
//! - MGM's monotonicity and convergence to a local optimum
//! - Reproducibility of whole runs from a single seed

use std::collections::HashMap;

use dcop_kernel::graph::CostTable;
use dcop_kernel::{build_agents, AlgorithmKind, ConstraintGraph, CostLog, Environment};

use dcop_experiment::experiment::{comparison_suite, ExperimentRunner, ExperimentRunnerConfig};
use dcop_experiment::generator::{GeneratorConfig, GraphGenerator, GraphKind};

/// Cost 1 when the two endpoints disagree, 0 when they agree.
fn disagreement_table() -> CostTable {
    HashMap::from([((0, 0), 0.0), ((1, 1), 0.0), ((0, 1), 1.0), ((1, 0), 1.0)])
}

/// A 4-agent cycle of binary variables with disagreement costs.
fn four_cycle() -> ConstraintGraph {
    let mut graph = ConstraintGraph::new();
    for i in 0..4 {
        graph.add_agent(format!("agent_{i}"), vec![0, 1]).unwrap();
    }
    for i in 0..4 {
        graph
            .add_constraint(
                format!("agent_{i}"),
                format!("agent_{}", (i + 1) % 4),
                disagreement_table(),
            )
            .unwrap();
    }
    graph
}

fn run_costs(graph: &ConstraintGraph, kind: AlgorithmKind, iterations: usize, seed: u64) -> (Environment, Vec<f64>) {
    let agents = build_agents(graph, kind, seed).unwrap();
    let mut env = Environment::new(graph.clone()).unwrap();
    for agent in agents {
        env.register_agent(agent).unwrap();
    }
    let mut log = CostLog::new();
    env.run(&kind.name(), iterations * kind.rounds_per_iteration(), &mut log)
        .unwrap();
    (env, log.costs())
}

#[test]
fn mgm_on_a_cycle_is_monotone_and_ends_in_a_local_optimum() {
    let graph = four_cycle();
    let (env, costs) = run_costs(&graph, AlgorithmKind::Mgm, 20, 42);

    for pair in costs.windows(2) {
        assert!(pair[1] <= pair[0], "cost rose from {} to {}", pair[0], pair[1]);
    }

    // After 20 iterations on 4 binary variables every strict improvement has
    // been taken: no single agent can reduce the global cost by flipping.
    let assignment = env.assignment();
    let final_cost = env.graph().global_cost(&assignment);
    for (id, &value) in &assignment {
        let mut flipped = assignment.clone();
        flipped.insert(id.clone(), 1 - value);
        assert!(
            env.graph().global_cost(&flipped) >= final_cost,
            "{id} still had an improving flip at the end"
        );
    }
}

#[test]
fn mgm2_never_worsens_a_coloring_instance() {
    let graph = GraphGenerator::new(GeneratorConfig {
        agents: 10,
        domain_size: 3,
        density: 0.4,
        kind: GraphKind::GraphColoring,
        seed: Some(9),
        ..GeneratorConfig::default()
    })
    .generate()
    .unwrap();

    let (_, costs) = run_costs(
        &graph,
        AlgorithmKind::Mgm2 {
            offer_probability: 0.5,
        },
        25,
        42,
    );
    for pair in costs.windows(2) {
        assert!(pair[1] <= pair[0], "cost rose from {} to {}", pair[0], pair[1]);
    }
}

#[test]
fn whole_runs_are_reproducible_from_the_seed() {
    let graph = GraphGenerator::new(GeneratorConfig {
        agents: 12,
        domain_size: 4,
        density: 0.5,
        kind: GraphKind::UniformRandom,
        seed: Some(3),
        ..GeneratorConfig::default()
    })
    .generate()
    .unwrap();

    for kind in comparison_suite() {
        let (_, a) = run_costs(&graph, kind, 15, 7);
        let (_, b) = run_costs(&graph, kind, 15, 7);
        assert_eq!(a, b, "{} diverged between identical runs", kind.name());
    }
}

#[test]
fn different_seeds_give_different_initial_assignments() {
    let graph = GraphGenerator::new(GeneratorConfig {
        agents: 12,
        domain_size: 4,
        density: 0.5,
        kind: GraphKind::UniformRandom,
        seed: Some(3),
        ..GeneratorConfig::default()
    })
    .generate()
    .unwrap();

    let (_, a) = run_costs(&graph, AlgorithmKind::Mgm, 1, 1);
    let (_, b) = run_costs(&graph, AlgorithmKind::Mgm, 1, 2);
    // Twelve agents drawing from four values: identical initial assignments
    // across seeds are vanishingly unlikely.
    assert_ne!(a[0], b[0]);
}

#[test]
fn runner_produces_comparable_curves_for_the_whole_suite() {
    let runner = ExperimentRunner::new(ExperimentRunnerConfig {
        agents: 8,
        iterations: 12,
    });
    let graph = GraphGenerator::new(GeneratorConfig {
        agents: 8,
        domain_size: 3,
        density: 0.5,
        kind: GraphKind::UniformRandom,
        seed: Some(21),
        ..GeneratorConfig::default()
    })
    .generate()
    .unwrap();

    for kind in comparison_suite() {
        let result = runner
            .run_single(&graph, kind, "uniform_sparse", 0.5, 0, 21)
            .unwrap();
        assert_eq!(result.cost_history.len(), 13, "{}", kind.name());
        assert_eq!(result.iterations, 12);
        // Local search never creates constraints out of thin air; the curve
        // stays within [0, initial] for the monotone algorithms and is at
        // least well-formed for DSA.
        assert!(result.cost_history.iter().all(|c| *c >= 0.0));
    }
}
