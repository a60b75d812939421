//! The environment: agent registry, constraint graph, and the round scheduler.

use std::collections::BTreeMap;

use tracing::trace;

use crate::agent::Agent;
use crate::error::{GraphError, KernelError};
use crate::graph::ConstraintGraph;
use crate::message::{AgentId, Message, Payload, Value};
use crate::metrics::{MetricsSink, RoundMetrics};

/// Owns the agents and the constraint graph and drives discrete synchronous
/// rounds.
///
/// One round, fixed for every strategy:
/// 1. every agent computes against the previous round's mailbox and the
///    outgoing messages are collected;
/// 2. every collected message is delivered to its receiver;
/// 3. every agent commits its staged decision (`update_state`);
/// 4. every mailbox is drained, making this round's deliveries readable next
///    round;
/// 5. the round counter advances.
///
/// The compute/commit split is what gives the simulation its distributed
/// character inside a single control thread: no agent can see a neighbor's
/// round-N decision until round N+1. Agents never hold a reference to the
/// environment or to each other.
pub struct Environment {
    graph: ConstraintGraph,
    agents: BTreeMap<AgentId, Box<dyn Agent>>,
    time_step: usize,
}

impl Environment {
    /// Create an environment over a validated graph. Malformed graphs are
    /// rejected here, before any round can run.
    pub fn new(graph: ConstraintGraph) -> Result<Self, GraphError> {
        graph.validate()?;
        Ok(Self {
            graph,
            agents: BTreeMap::new(),
            time_step: 0,
        })
    }

    /// Register an agent. The id must be declared in the graph and not yet
    /// registered.
    pub fn register_agent(&mut self, agent: Box<dyn Agent>) -> Result<(), KernelError> {
        let id = agent.id().clone();
        if self.graph.domain(&id).is_none() {
            return Err(KernelError::UnknownGraphAgent(id));
        }
        if self.agents.contains_key(&id) {
            return Err(KernelError::DuplicateAgent(id));
        }
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Execute one synchronous round.
    pub fn step(&mut self) -> Result<(), KernelError> {
        // Phase 1: compute. Order-independent by contract; every agent sees
        // only last round's mailbox.
        let mut outgoing = Vec::new();
        for agent in self.agents.values_mut() {
            outgoing.extend(agent.compute());
        }
        trace!(round = self.time_step, messages = outgoing.len(), "round computed");

        // Phase 2: deliver. A receiver outside the registry is fatal; the
        // neighbor set is static and fully known.
        for msg in outgoing {
            match self.agents.get_mut(&msg.receiver) {
                Some(agent) => agent.receive(msg),
                None => {
                    return Err(KernelError::UnknownReceiver {
                        sender: msg.sender,
                        receiver: msg.receiver,
                    })
                }
            }
        }

        // Phases 3-4: commit, then drain mailboxes.
        for agent in self.agents.values_mut() {
            agent.update_state();
        }
        for agent in self.agents.values_mut() {
            agent.clear_mailbox();
        }

        self.time_step += 1;
        Ok(())
    }

    /// Deliver every registered agent's committed value to its graph
    /// neighbors and make those announcements readable in the next round.
    /// Without this the first round runs on empty knowledge and its staged
    /// decisions are no better than the random initial assignment.
    pub fn seed_knowledge(&mut self) -> Result<(), KernelError> {
        let mut announcements = Vec::new();
        for (id, agent) in &self.agents {
            for neighbor in self.graph.neighbors(id) {
                announcements.push(Message::new(
                    id.clone(),
                    neighbor,
                    Payload::ValueAnnounce {
                        value: agent.current_value(),
                        iteration: 0,
                    },
                ));
            }
        }
        for msg in announcements {
            match self.agents.get_mut(&msg.receiver) {
                Some(agent) => agent.receive(msg),
                None => {
                    return Err(KernelError::UnknownReceiver {
                        sender: msg.sender,
                        receiver: msg.receiver,
                    })
                }
            }
        }
        for agent in self.agents.values_mut() {
            agent.clear_mailbox();
        }
        Ok(())
    }

    /// Seed initial knowledge, then run a fixed number of rounds, reporting
    /// the global cost of the initial assignment and of every round after
    /// it. Non-convergence within the budget is a valid outcome, not an
    /// error.
    pub fn run(
        &mut self,
        algorithm: &str,
        rounds: usize,
        sink: &mut dyn MetricsSink,
    ) -> Result<(), KernelError> {
        self.seed_knowledge()?;
        sink.record(RoundMetrics {
            algorithm: algorithm.to_string(),
            round: self.time_step,
            global_cost: self.global_cost(),
        });
        for _ in 0..rounds {
            self.step()?;
            sink.record(RoundMetrics {
                algorithm: algorithm.to_string(),
                round: self.time_step,
                global_cost: self.global_cost(),
            });
        }
        Ok(())
    }

    /// Sum of constraint costs over every edge, using each agent's committed
    /// value.
    pub fn global_cost(&self) -> f64 {
        self.graph.global_cost(&self.assignment())
    }

    /// The committed value of every registered agent.
    pub fn assignment(&self) -> BTreeMap<AgentId, Value> {
        self.agents
            .iter()
            .map(|(id, agent)| (id.clone(), agent.current_value()))
            .collect()
    }

    pub fn graph(&self) -> &ConstraintGraph {
        &self.graph
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Payload};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Probe agent: sends one announcement per round to a fixed peer and
    /// records how many inbox messages each compute call could read.
    #[derive(Debug)]
    struct Probe {
        id: AgentId,
        peer: Option<AgentId>,
        inbox: Vec<Message>,
        staged: Vec<Message>,
        seen: Rc<RefCell<Vec<usize>>>,
    }

    impl Probe {
        fn new(id: &str, peer: Option<&str>, seen: Rc<RefCell<Vec<usize>>>) -> Self {
            Self {
                id: id.to_string(),
                peer: peer.map(str::to_string),
                inbox: Vec::new(),
                staged: Vec::new(),
                seen,
            }
        }
    }

    impl Agent for Probe {
        fn id(&self) -> &AgentId {
            &self.id
        }

        fn current_value(&self) -> Value {
            0
        }

        fn receive(&mut self, msg: Message) {
            self.staged.push(msg);
        }

        fn compute(&mut self) -> Vec<Message> {
            self.seen.borrow_mut().push(self.inbox.len());
            match &self.peer {
                Some(peer) => vec![Message::new(
                    self.id.clone(),
                    peer.clone(),
                    Payload::ValueAnnounce { value: 0, iteration: 0 },
                )],
                None => Vec::new(),
            }
        }

        fn update_state(&mut self) {}

        fn clear_mailbox(&mut self) {
            self.inbox = std::mem::take(&mut self.staged);
        }
    }

    fn empty_graph(ids: &[&str]) -> ConstraintGraph {
        let mut graph = ConstraintGraph::new();
        for id in ids {
            graph.add_agent(*id, vec![0]).unwrap();
        }
        graph
    }

    #[test]
    fn messages_become_readable_one_round_later() {
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));
        let mut env = Environment::new(empty_graph(&["a", "b"])).unwrap();
        env.register_agent(Box::new(Probe::new("a", Some("b"), seen_a.clone())))
            .unwrap();
        env.register_agent(Box::new(Probe::new("b", Some("a"), seen_b.clone())))
            .unwrap();

        env.step().unwrap();
        env.step().unwrap();
        env.step().unwrap();

        // Round 0 computes against an empty inbox; every later round reads
        // exactly the single message delivered the round before.
        assert_eq!(*seen_a.borrow(), vec![0, 1, 1]);
        assert_eq!(*seen_b.borrow(), vec![0, 1, 1]);
        assert_eq!(env.time_step(), 3);
    }

    #[test]
    fn seeded_knowledge_is_readable_in_the_first_round() {
        use std::collections::HashMap;

        let mut graph = empty_graph(&["a", "b"]);
        graph
            .add_constraint("a", "b", HashMap::from([((0, 0), 1.0)]))
            .unwrap();

        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));
        let mut env = Environment::new(graph).unwrap();
        env.register_agent(Box::new(Probe::new("a", None, seen_a.clone())))
            .unwrap();
        env.register_agent(Box::new(Probe::new("b", None, seen_b.clone())))
            .unwrap();

        env.seed_knowledge().unwrap();
        env.step().unwrap();

        assert_eq!(*seen_a.borrow(), vec![1]);
        assert_eq!(*seen_b.borrow(), vec![1]);
    }

    #[test]
    fn message_to_unregistered_receiver_is_fatal() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut env = Environment::new(empty_graph(&["a"])).unwrap();
        env.register_agent(Box::new(Probe::new("a", Some("ghost"), seen)))
            .unwrap();
        assert_eq!(
            env.step(),
            Err(KernelError::UnknownReceiver {
                sender: "a".to_string(),
                receiver: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut env = Environment::new(empty_graph(&["a"])).unwrap();
        env.register_agent(Box::new(Probe::new("a", None, seen.clone())))
            .unwrap();
        assert_eq!(
            env.register_agent(Box::new(Probe::new("a", None, seen))),
            Err(KernelError::DuplicateAgent("a".to_string()))
        );
    }

    #[test]
    fn registration_outside_the_graph_is_rejected() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut env = Environment::new(empty_graph(&["a"])).unwrap();
        assert_eq!(
            env.register_agent(Box::new(Probe::new("z", None, seen))),
            Err(KernelError::UnknownGraphAgent("z".to_string()))
        );
    }
}
