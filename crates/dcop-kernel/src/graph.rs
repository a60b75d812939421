//! Static description of a constraint optimization problem.
//!
//! A [`ConstraintGraph`] holds the variables (one per agent), their ordered
//! domains, and one symmetric pairwise cost table per constrained pair. The
//! kernel consumes this structure as-is; generators live outside the kernel.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::GraphError;
use crate::message::{AgentId, Value};

/// A pairwise cost table, keyed in the orientation of the stored edge.
pub type CostTable = HashMap<(Value, Value), f64>;

/// Static variables, domains, and pairwise cost relations.
///
/// Edge keys are normalized to `(smaller id, larger id)`, so every
/// constrained pair has exactly one cost entry and lookups answer
/// symmetrically regardless of query direction.
///
/// A value pair absent from a table, or a pair of agents with no edge at
/// all, contributes cost `0.0`: "no constraint" rather than an error.
#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
    domains: BTreeMap<AgentId, Vec<Value>>,
    constraints: BTreeMap<(AgentId, AgentId), CostTable>,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an agent and the ordered set of values it may take.
    pub fn add_agent(&mut self, id: impl Into<AgentId>, domain: Vec<Value>) -> Result<(), GraphError> {
        let id = id.into();
        if domain.is_empty() {
            return Err(GraphError::EmptyDomain(id));
        }
        self.domains.insert(id, domain);
        Ok(())
    }

    /// Add the symmetric cost table for the pair `(i, j)`.
    ///
    /// `table` is keyed `(value of i, value of j)`; it is re-oriented if the
    /// normalized edge order differs. Both endpoints must already be declared.
    pub fn add_constraint(
        &mut self,
        i: impl Into<AgentId>,
        j: impl Into<AgentId>,
        table: CostTable,
    ) -> Result<(), GraphError> {
        let i = i.into();
        let j = j.into();
        if i == j {
            return Err(GraphError::SelfConstraint(i));
        }
        for id in [&i, &j] {
            if !self.domains.contains_key(id) {
                return Err(GraphError::UnknownAgent(id.clone()));
            }
        }
        let (key, oriented) = if i < j {
            ((i, j), table)
        } else {
            let flipped = table.into_iter().map(|((a, b), c)| ((b, a), c)).collect();
            ((j, i), flipped)
        };
        self.constraints.insert(key, oriented);
        Ok(())
    }

    /// Re-check every structural invariant. Graphs built through the typed
    /// API are always valid; this guards graphs assembled by external
    /// generators before any round runs.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (id, domain) in &self.domains {
            if domain.is_empty() {
                return Err(GraphError::EmptyDomain(id.clone()));
            }
        }
        for (i, j) in self.constraints.keys() {
            if i == j {
                return Err(GraphError::SelfConstraint(i.clone()));
            }
            for id in [i, j] {
                if !self.domains.contains_key(id) {
                    return Err(GraphError::UnknownAgent(id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Cost of `i = a, j = b`, queried in either direction.
    pub fn cost(&self, i: &AgentId, a: Value, j: &AgentId, b: Value) -> f64 {
        let (key, pair) = if i < j {
            ((i.clone(), j.clone()), (a, b))
        } else {
            ((j.clone(), i.clone()), (b, a))
        };
        self.constraints
            .get(&key)
            .and_then(|table| table.get(&pair))
            .copied()
            .unwrap_or(0.0)
    }

    /// Agents with a direct constraint to `id`. The relation is symmetric by
    /// construction.
    pub fn neighbors(&self, id: &AgentId) -> BTreeSet<AgentId> {
        self.constraints
            .keys()
            .filter_map(|(i, j)| {
                if i == id {
                    Some(j.clone())
                } else if j == id {
                    Some(i.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.domains.keys()
    }

    pub fn domain(&self, id: &AgentId) -> Option<&[Value]> {
        self.domains.get(id).map(|d| d.as_slice())
    }

    pub fn agent_count(&self) -> usize {
        self.domains.len()
    }

    /// All constrained pairs, in normalized `(smaller, larger)` order.
    pub fn edges(&self) -> impl Iterator<Item = (&AgentId, &AgentId)> {
        self.constraints.keys().map(|(i, j)| (i, j))
    }

    /// The cost table for edge `(i, j)`, oriented `(value of i, value of j)`.
    pub fn edge_table(&self, i: &AgentId, j: &AgentId) -> Option<CostTable> {
        if i < j {
            self.constraints.get(&(i.clone(), j.clone())).cloned()
        } else {
            self.constraints.get(&(j.clone(), i.clone())).map(|table| {
                table
                    .iter()
                    .map(|(&(a, b), &c)| ((b, a), c))
                    .collect()
            })
        }
    }

    /// Sum of edge costs under the given assignment. Agents missing from the
    /// assignment contribute nothing.
    pub fn global_cost(&self, assignment: &BTreeMap<AgentId, Value>) -> f64 {
        self.constraints
            .iter()
            .map(|((i, j), table)| {
                match (assignment.get(i), assignment.get(j)) {
                    (Some(&a), Some(&b)) => table.get(&(a, b)).copied().unwrap_or(0.0),
                    _ => 0.0,
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_agent_graph() -> ConstraintGraph {
        let mut graph = ConstraintGraph::new();
        graph.add_agent("a", vec![0, 1]).unwrap();
        graph.add_agent("b", vec![0, 1]).unwrap();
        let table = HashMap::from([((0, 0), 0.0), ((0, 1), 10.0), ((1, 0), 7.0), ((1, 1), 0.0)]);
        graph.add_constraint("a", "b", table).unwrap();
        graph
    }

    #[test]
    fn cost_lookup_is_symmetric() {
        let graph = two_agent_graph();
        let a = "a".to_string();
        let b = "b".to_string();
        assert_eq!(graph.cost(&a, 0, &b, 1), 10.0);
        assert_eq!(graph.cost(&b, 1, &a, 0), 10.0);
        assert_eq!(graph.cost(&a, 1, &b, 0), 7.0);
        assert_eq!(graph.cost(&b, 0, &a, 1), 7.0);
    }

    #[test]
    fn constraint_added_in_reverse_order_is_reoriented() {
        let mut graph = ConstraintGraph::new();
        graph.add_agent("a", vec![0, 1]).unwrap();
        graph.add_agent("b", vec![0, 1]).unwrap();
        // Declare the edge from b's point of view.
        let table = HashMap::from([((0, 1), 3.0)]);
        graph.add_constraint("b", "a", table).unwrap();
        let a = "a".to_string();
        let b = "b".to_string();
        // (b=0, a=1) must read back the same in either direction.
        assert_eq!(graph.cost(&b, 0, &a, 1), 3.0);
        assert_eq!(graph.cost(&a, 1, &b, 0), 3.0);
    }

    #[test]
    fn missing_edge_and_missing_value_pair_cost_zero() {
        let mut graph = two_agent_graph();
        graph.add_agent("c", vec![0]).unwrap();
        let a = "a".to_string();
        let c = "c".to_string();
        assert_eq!(graph.cost(&a, 0, &c, 0), 0.0);

        let mut sparse = ConstraintGraph::new();
        sparse.add_agent("a", vec![0, 1]).unwrap();
        sparse.add_agent("b", vec![0, 1]).unwrap();
        sparse
            .add_constraint("a", "b", HashMap::from([((1, 1), 5.0)]))
            .unwrap();
        let b = "b".to_string();
        assert_eq!(sparse.cost(&a, 0, &b, 0), 0.0);
        assert_eq!(sparse.cost(&a, 1, &b, 1), 5.0);
    }

    #[test]
    fn empty_domain_is_rejected() {
        let mut graph = ConstraintGraph::new();
        assert_eq!(
            graph.add_agent("a", vec![]),
            Err(GraphError::EmptyDomain("a".to_string()))
        );
    }

    #[test]
    fn constraint_with_unknown_endpoint_is_rejected() {
        let mut graph = ConstraintGraph::new();
        graph.add_agent("a", vec![0]).unwrap();
        assert_eq!(
            graph.add_constraint("a", "ghost", HashMap::new()),
            Err(GraphError::UnknownAgent("ghost".to_string()))
        );
    }

    #[test]
    fn self_constraint_is_rejected() {
        let mut graph = ConstraintGraph::new();
        graph.add_agent("a", vec![0]).unwrap();
        assert_eq!(
            graph.add_constraint("a", "a", HashMap::new()),
            Err(GraphError::SelfConstraint("a".to_string()))
        );
    }

    #[test]
    fn neighbor_relation_is_mirrored() {
        let graph = two_agent_graph();
        let a = "a".to_string();
        let b = "b".to_string();
        assert!(graph.neighbors(&a).contains(&b));
        assert!(graph.neighbors(&b).contains(&a));
    }

    #[test]
    fn global_cost_sums_every_edge() {
        let graph = two_agent_graph();
        let assignment = BTreeMap::from([("a".to_string(), 0), ("b".to_string(), 1)]);
        assert_eq!(graph.global_cost(&assignment), 10.0);
        let aligned = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 1)]);
        assert_eq!(graph.global_cost(&aligned), 0.0);
    }
}
