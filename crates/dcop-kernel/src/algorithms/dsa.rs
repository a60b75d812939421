//! DSA-C: distributed stochastic local search.
//!
//! Every round each agent looks for the domain value minimizing its local
//! cost against its neighbors' last-known values. If a strict improvement
//! exists it switches with probability `p`; otherwise it stays. The
//! randomized commitment is what breaks the correlation when many agents
//! see an improving move along the same constraint at once.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, Neighborhood};
use crate::message::{AgentId, Message, Value};

/// Agent running DSA-C with change probability `p`.
///
/// There is no terminal state; the agent runs for whatever round budget the
/// caller configures.
///
/// Known limitation, inherited from the algorithm itself: with `p = 1.0`,
/// two neighbors whose constraint has two symmetric optima can oscillate
/// between them indefinitely, each switching to the best response against
/// the other's previous value. Lower `p` breaks the symmetry in practice.
#[derive(Debug)]
pub struct DsaAgent {
    neighborhood: Neighborhood,
    probability: f64,
    rng: ChaCha8Rng,
    iteration: usize,
    /// Value staged by `compute`, committed by `update_state`.
    pending: Value,
}

impl DsaAgent {
    pub fn new(neighborhood: Neighborhood, probability: f64, rng: ChaCha8Rng) -> Self {
        let pending = neighborhood.current_value();
        Self {
            neighborhood,
            probability,
            rng,
            iteration: 0,
            pending,
        }
    }
}

impl Agent for DsaAgent {
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
        self.iteration += 1;

        let (best, gain) = self.neighborhood.best_improvement();
        self.pending = self.neighborhood.current_value();
        if gain > 0.0 && self.rng.random_bool(self.probability) {
            self.pending = best;
        }

        // Announce the value that will hold once this round commits, so
        // neighbors never evaluate against a value already abandoned.
        self.neighborhood.announce_value(self.pending, self.iteration)
    }

    fn update_state(&mut self) {
        self.neighborhood.set_value(self.pending);
    }

    fn clear_mailbox(&mut self) {
        self.neighborhood.clear_mailbox();
    }
}
