//! MGM: Maximum Gain Message.
//!
//! Each iteration spans two scheduler rounds. In the value phase an agent
//! announces its value and the gain of its best unilateral move; in the gain
//! phase it commits that move only if it is the unique maximum gain in its
//! neighborhood. Of two conflicting neighbors at most one ever moves, which
//! is what makes the global cost non-increasing round over round.

use std::collections::BTreeMap;

use crate::agent::{Agent, Neighborhood};
use crate::algorithms::unique_max_gain;
use crate::message::{AgentId, Message, Payload, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Value,
    Gain,
}

/// Agent running MGM.
#[derive(Debug)]
pub struct MgmAgent {
    neighborhood: Neighborhood,
    phase: Phase,
    iteration: usize,
    /// Best unilateral move found in the value phase.
    best_value: Value,
    gain: f64,
    pending: Value,
}

impl MgmAgent {
    pub fn new(neighborhood: Neighborhood) -> Self {
        let current = neighborhood.current_value();
        Self {
            neighborhood,
            phase: Phase::Value,
            iteration: 0,
            best_value: current,
            gain: 0.0,
            pending: current,
        }
    }

    fn neighbor_gains(&self) -> BTreeMap<AgentId, (f64, AgentId)> {
        let mut gains = BTreeMap::new();
        for msg in self.neighborhood.inbox() {
            if let Payload::GainAnnounce { gain, tiebreak_id, .. } = &msg.payload {
                gains.insert(msg.sender.clone(), (*gain, tiebreak_id.clone()));
            }
        }
        gains
    }
}

impl Agent for MgmAgent {
    fn id(&self) -> &AgentId {
        self.neighborhood.id()
    }

    fn current_value(&self) -> Value {
        self.neighborhood.current_value()
    }

    fn receive(&mut self, msg: Message) {
        self.neighborhood.receive(msg);
    }

    fn compute(&mut self) -> Vec<Message> {
        self.neighborhood.absorb_value_announcements();
        let current = self.neighborhood.current_value();

        match self.phase {
            Phase::Value => {
                let (best, gain) = self.neighborhood.best_improvement();
                self.best_value = best;
                self.gain = gain;
                self.pending = current;
                self.phase = Phase::Gain;

                let mut out = self.neighborhood.announce_value(current, self.iteration);
                out.extend(self.neighborhood.announce_gain(
                    gain,
                    self.neighborhood.id().clone(),
                    self.iteration,
                ));
                out
            }
            Phase::Gain => {
                let gains = self.neighbor_gains();
                let wins = unique_max_gain(
                    self.gain,
                    self.neighborhood.id(),
                    gains.values().map(|(gain, tiebreak)| (*gain, tiebreak)),
                );
                self.pending = if wins { self.best_value } else { current };
                self.phase = Phase::Value;
                self.iteration += 1;

                // Announce the committed value so the next value phase never
                // computes gains against a value already abandoned.
                self.neighborhood.announce_value(self.pending, self.iteration)
            }
        }
    }

    fn update_state(&mut self) {
        self.neighborhood.set_value(self.pending);
    }

    fn clear_mailbox(&mut self) {
        self.neighborhood.clear_mailbox();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    fn agreement_table() -> HashMap<(Value, Value), f64> {
        HashMap::from([((0, 0), 0.0), ((1, 1), 0.0), ((0, 1), 10.0), ((1, 0), 10.0)])
    }

    fn agent(id: &str, peers: &[&str], start: Value) -> MgmAgent {
        let neighbors: BTreeSet<AgentId> = peers.iter().map(|p| p.to_string()).collect();
        let mut neighborhood = Neighborhood::new(id, vec![0, 1], neighbors.clone());
        for peer in neighbors {
            neighborhood.set_cost_table(peer, agreement_table());
        }
        neighborhood.set_value(start);
        MgmAgent::new(neighborhood)
    }

    fn run_round(agents: &mut [MgmAgent]) {
        let mut out = Vec::new();
        for a in agents.iter_mut() {
            out.extend(a.compute());
        }
        for msg in out {
            if let Some(receiver) = agents.iter_mut().find(|a| *a.id() == msg.receiver) {
                receiver.receive(msg);
            }
        }
        for a in agents.iter_mut() {
            a.update_state();
        }
        for a in agents.iter_mut() {
            a.clear_mailbox();
        }
    }

    fn disagreement_cost(agents: &[MgmAgent], edges: &[(usize, usize)]) -> f64 {
        edges
            .iter()
            .map(|&(i, j)| {
                if agents[i].current_value() == agents[j].current_value() {
                    0.0
                } else {
                    10.0
                }
            })
            .sum()
    }

    #[test]
    fn equal_gains_resolve_by_id_and_reach_agreement() {
        // Both agents see gain 10 once informed; only "a" (smaller id) moves.
        let mut agents = vec![agent("a", &["b"], 0), agent("b", &["a"], 1)];
        run_round(&mut agents); // value phase, no information yet
        run_round(&mut agents); // gain phase, gains are still 0
        run_round(&mut agents); // value phase with fresh values, gains = 10
        run_round(&mut agents); // gain phase: tie, "a" wins
        assert_eq!(agents[0].current_value(), 1);
        assert_eq!(agents[1].current_value(), 1);
        assert_eq!(disagreement_cost(&agents, &[(0, 1)]), 0.0);
    }

    #[test]
    fn cost_is_non_increasing_on_a_cycle() {
        let mut agents = vec![
            agent("agent_0", &["agent_1", "agent_3"], 0),
            agent("agent_1", &["agent_0", "agent_2"], 1),
            agent("agent_2", &["agent_1", "agent_3"], 0),
            agent("agent_3", &["agent_2", "agent_0"], 1),
        ];
        let edges = [(0, 1), (1, 2), (2, 3), (3, 0)];

        let mut last = disagreement_cost(&agents, &edges);
        for _ in 0..20 {
            run_round(&mut agents);
            let cost = disagreement_cost(&agents, &edges);
            assert!(cost <= last, "cost increased from {last} to {cost}");
            last = cost;
        }
        // Alternating 0/1 on a 4-cycle has a reachable optimum at cost 0.
        assert_eq!(last, 0.0);
    }

    #[test]
    fn stable_once_no_positive_gain_remains() {
        let mut agents = vec![agent("a", &["b"], 1), agent("b", &["a"], 1)];
        for _ in 0..6 {
            run_round(&mut agents);
        }
        assert_eq!(agents[0].current_value(), 1);
        assert_eq!(agents[1].current_value(), 1);
    }
}
