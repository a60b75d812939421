//! The three local-search strategies and the factory that builds them.
//!
//! Every strategy implements the same [`Agent`](crate::agent::Agent)
//! contract; the environment is agnostic to which variant it drives.

pub mod dsa;
pub mod mgm;
pub mod mgm2;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, Neighborhood};
use crate::error::KernelError;
use crate::graph::ConstraintGraph;
use crate::message::AgentId;

pub use dsa::DsaAgent;
pub use mgm::MgmAgent;
pub use mgm2::Mgm2Agent;

/// Which strategy to instantiate, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlgorithmKind {
    /// Stochastic local search: switch to the best local value with
    /// probability `probability` whenever a strict improvement exists.
    DsaC { probability: f64 },
    /// Maximum Gain Message: only the unique local-maximum gain moves.
    Mgm,
    /// Pairwise MGM: agents may additionally coordinate joint moves with a
    /// neighbor; each iteration an agent offers pairing with
    /// `offer_probability`.
    Mgm2 { offer_probability: f64 },
}

impl AlgorithmKind {
    /// Display name carrying the parameterization, for metrics and results.
    pub fn name(&self) -> String {
        match self {
            Self::DsaC { probability } => format!("DSA-C(p={probability})"),
            Self::Mgm => "MGM".to_string(),
            Self::Mgm2 { offer_probability } => format!("MGM-2(q={offer_probability})"),
        }
    }

    /// Scheduler rounds each strategy needs per algorithm iteration.
    ///
    /// DSA-C decides every round. MGM alternates value and gain phases.
    /// MGM-2 walks value, offer, accept, gain, go, and commit phases.
    pub fn rounds_per_iteration(&self) -> usize {
        match self {
            Self::DsaC { .. } => 1,
            Self::Mgm => 2,
            Self::Mgm2 { .. } => 6,
        }
    }

    /// Probabilities must lie in `[0, 1]`; drawing against anything else
    /// panics mid-round, so reject them before any agent is built.
    pub fn validate(&self) -> Result<(), KernelError> {
        let (parameter, value) = match self {
            Self::DsaC { probability } => ("activation probability", *probability),
            Self::Mgm => return Ok(()),
            Self::Mgm2 { offer_probability } => ("offer probability", *offer_probability),
        };
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(KernelError::InvalidProbability { parameter, value })
        }
    }
}

/// Derive an agent's private generator from the run seed and its id.
///
/// FNV-1a over the id bytes keeps the derivation stable across runs and
/// ports, so a given `(seed, iteration count)` always reproduces the same
/// cost sequence.
pub fn agent_rng(seed: u64, id: &AgentId) -> ChaCha8Rng {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    ChaCha8Rng::seed_from_u64(seed ^ hash)
}

/// The unique-maximum rule shared by MGM and MGM-2.
///
/// An agent (or pair) moves only if its gain is positive and strictly
/// greater than every competing gain, with equal gains resolved by the
/// lexicographically smaller tiebreak id. Of any two conflicting neighbors,
/// exactly one can satisfy this.
pub fn unique_max_gain<'a>(
    gain: f64,
    tiebreak_id: &AgentId,
    competitors: impl Iterator<Item = (f64, &'a AgentId)>,
) -> bool {
    if gain <= 0.0 {
        return false;
    }
    for (other_gain, other_id) in competitors {
        if other_gain > gain || (other_gain == gain && other_id < tiebreak_id) {
            return false;
        }
    }
    true
}

/// Build one agent per graph variable for the chosen strategy.
///
/// Each agent gets its local view of the problem (domain, neighbors, shared
/// cost tables), a seeded initial value, and its own derived generator; the
/// caller registers the results with an [`Environment`].
///
/// [`Environment`]: crate::environment::Environment
pub fn build_agents(
    graph: &ConstraintGraph,
    kind: AlgorithmKind,
    seed: u64,
) -> Result<Vec<Box<dyn Agent>>, KernelError> {
    kind.validate()?;
    graph.validate()?;
    let ids: Vec<AgentId> = graph.agent_ids().cloned().collect();
    let mut agents: Vec<Box<dyn Agent>> = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(domain) = graph.domain(&id) else {
            // Unreachable after validate; ids come from the graph itself.
            continue;
        };
        let mut neighborhood = Neighborhood::new(id.clone(), domain.to_vec(), graph.neighbors(&id));
        for neighbor in graph.neighbors(&id) {
            if let Some(table) = graph.edge_table(&id, &neighbor) {
                neighborhood.set_cost_table(neighbor, table);
            }
        }

        let mut rng = agent_rng(seed, &id);
        if let Some(&initial) = neighborhood.domain().to_vec().choose(&mut rng) {
            neighborhood.set_value(initial);
        }

        let agent: Box<dyn Agent> = match kind {
            AlgorithmKind::DsaC { probability } => {
                Box::new(DsaAgent::new(neighborhood, probability, rng))
            }
            AlgorithmKind::Mgm => Box::new(MgmAgent::new(neighborhood)),
            AlgorithmKind::Mgm2 { offer_probability } => {
                Box::new(Mgm2Agent::new(neighborhood, offer_probability, rng))
            }
        };
        agents.push(agent);
    }
    Ok(agents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_max_requires_positive_gain() {
        let me = "a".to_string();
        assert!(!unique_max_gain(0.0, &me, std::iter::empty()));
        assert!(unique_max_gain(1.0, &me, std::iter::empty()));
    }

    #[test]
    fn unique_max_breaks_gain_ties_by_id() {
        let a = "agent_0".to_string();
        let b = "agent_1".to_string();
        let gains = vec![(5.0, &b)];
        // Equal gains: the smaller id wins, the larger yields.
        assert!(unique_max_gain(5.0, &a, gains.clone().into_iter()));
        assert!(!unique_max_gain(5.0, &b, vec![(5.0, &a)].into_iter()));
        // A strictly larger competitor always blocks.
        assert!(!unique_max_gain(4.0, &a, gains.into_iter()));
    }

    #[test]
    fn out_of_range_probabilities_are_rejected_before_any_round() {
        let mut graph = ConstraintGraph::new();
        graph.add_agent("a", vec![0, 1]).unwrap();

        let err = build_agents(&graph, AlgorithmKind::DsaC { probability: 1.5 }, 1).unwrap_err();
        assert_eq!(
            err,
            KernelError::InvalidProbability {
                parameter: "activation probability",
                value: 1.5,
            }
        );
        let err =
            build_agents(&graph, AlgorithmKind::Mgm2 { offer_probability: -0.1 }, 1).unwrap_err();
        assert!(matches!(err, KernelError::InvalidProbability { .. }));
        assert!(AlgorithmKind::Mgm2 { offer_probability: f64::NAN }.validate().is_err());

        // The closed endpoints are legal draws.
        assert!(build_agents(&graph, AlgorithmKind::DsaC { probability: 0.0 }, 1).is_ok());
        assert!(build_agents(&graph, AlgorithmKind::DsaC { probability: 1.0 }, 1).is_ok());
    }

    #[test]
    fn derived_rng_is_stable_per_agent() {
        let a = "agent_0".to_string();
        let b = "agent_1".to_string();
        let mut first = agent_rng(42, &a);
        let mut again = agent_rng(42, &a);
        let mut other = agent_rng(42, &b);
        let draw: u64 = first.random();
        assert_eq!(draw, again.random::<u64>());
        assert_ne!(draw, other.random::<u64>());
    }
}
