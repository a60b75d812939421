//! The agent contract and the shared local-view state every strategy builds on.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::CostTable;
use crate::message::{AgentId, Message, Payload, Value};

/// Capability interface every strategy implements. The scheduler holds only
/// this type and drives all variants identically.
///
/// Contract, enforced by the round scheduler:
/// - `receive` appends to the mailbox and has no other side effects.
/// - `compute` reads only messages delivered in the *previous* round, stages
///   a decision in scratch state, and returns outgoing messages. It must not
///   change the committed value, and its result must not depend on the order
///   in which agents are computed within a round.
/// - `update_state` commits the staged decision, after every agent's compute
///   phase for the round has finished.
/// - `clear_mailbox` drains the messages `compute` consumed and makes this
///   round's deliveries readable for the next round.
pub trait Agent: std::fmt::Debug {
    fn id(&self) -> &AgentId;

    /// The committed value of the variable this agent owns.
    fn current_value(&self) -> Value;

    fn receive(&mut self, msg: Message);

    fn compute(&mut self) -> Vec<Message>;

    fn update_state(&mut self);

    fn clear_mailbox(&mut self);
}

/// An agent's entire window onto the problem: its domain, its neighbors, the
/// cost tables it shares with them, their last-announced values, and the
/// mailbox.
///
/// The mailbox is double-buffered: deliveries land in a staging buffer and
/// only become readable when `clear_mailbox` runs at the end of the round.
/// That is what lets the scheduler deliver mid-round (after all computes)
/// while guaranteeing no agent reads a same-round message.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    id: AgentId,
    domain: Vec<Value>,
    neighbors: BTreeSet<AgentId>,
    /// Cost tables oriented `(my value, their value)`.
    costs: BTreeMap<AgentId, CostTable>,
    current: Value,
    neighbor_values: BTreeMap<AgentId, Value>,
    inbox: Vec<Message>,
    staged: Vec<Message>,
}

impl Neighborhood {
    /// Create a local view. The initial value is the first domain entry;
    /// callers that want a randomized start follow up with [`set_value`].
    ///
    /// [`set_value`]: Neighborhood::set_value
    pub fn new(id: impl Into<AgentId>, domain: Vec<Value>, neighbors: BTreeSet<AgentId>) -> Self {
        debug_assert!(!domain.is_empty(), "agent domain must be non-empty");
        let current = domain[0];
        Self {
            id: id.into(),
            domain,
            neighbors,
            costs: BTreeMap::new(),
            current,
            neighbor_values: BTreeMap::new(),
            inbox: Vec::new(),
            staged: Vec::new(),
        }
    }

    /// Install the cost table shared with `neighbor`, oriented
    /// `(my value, their value)`.
    pub fn set_cost_table(&mut self, neighbor: impl Into<AgentId>, table: CostTable) {
        let neighbor = neighbor.into();
        self.neighbors.insert(neighbor.clone());
        self.costs.insert(neighbor, table);
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn domain(&self) -> &[Value] {
        &self.domain
    }

    pub fn neighbors(&self) -> &BTreeSet<AgentId> {
        &self.neighbors
    }

    pub fn current_value(&self) -> Value {
        self.current
    }

    /// Commit a value. The value must come from the domain; every staged
    /// decision in the kernel is produced by a domain scan.
    pub fn set_value(&mut self, value: Value) {
        debug_assert!(self.domain.contains(&value), "committed value must be in domain");
        self.current = value;
    }

    pub fn receive(&mut self, msg: Message) {
        self.staged.push(msg);
    }

    /// Messages delivered in the previous round.
    pub fn inbox(&self) -> &[Message] {
        &self.inbox
    }

    pub fn clear_mailbox(&mut self) {
        self.inbox = std::mem::take(&mut self.staged);
    }

    /// Fold every value announcement in the inbox into the last-known
    /// neighbor values.
    pub fn absorb_value_announcements(&mut self) {
        for i in 0..self.inbox.len() {
            if let Payload::ValueAnnounce { value, .. } = self.inbox[i].payload {
                let sender = self.inbox[i].sender.clone();
                self.neighbor_values.insert(sender, value);
            }
        }
    }

    pub fn known_value(&self, neighbor: &AgentId) -> Option<Value> {
        self.neighbor_values.get(neighbor).copied()
    }

    /// Cost of the shared constraint with `neighbor` for one value pair.
    /// Absent table or absent value pair means no constraint: cost 0.
    pub fn pair_cost(&self, mine: Value, neighbor: &AgentId, theirs: Value) -> f64 {
        self.costs
            .get(neighbor)
            .and_then(|table| table.get(&(mine, theirs)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Local cost of `value` against every neighbor whose value is known.
    pub fn local_cost(&self, value: Value) -> f64 {
        self.neighbor_values
            .iter()
            .map(|(neighbor, &theirs)| self.pair_cost(value, neighbor, theirs))
            .sum()
    }

    /// Local cost of `value` with the edge to `skip` left out. Used when a
    /// pair evaluates the shared edge separately.
    pub fn local_cost_excluding(&self, value: Value, skip: &AgentId) -> f64 {
        self.neighbor_values
            .iter()
            .filter(|(neighbor, _)| *neighbor != skip)
            .map(|(neighbor, &theirs)| self.pair_cost(value, neighbor, theirs))
            .sum()
    }

    /// The domain value minimizing local cost against known neighbor values.
    /// Ties break to the earliest domain entry (lowest value first for the
    /// ascending domains the generators produce). Returns `(value, cost)`.
    pub fn best_value(&self) -> (Value, f64) {
        let mut best = self.domain[0];
        let mut best_cost = self.local_cost(best);
        for &value in &self.domain[1..] {
            let cost = self.local_cost(value);
            if cost < best_cost {
                best = value;
                best_cost = cost;
            }
        }
        (best, best_cost)
    }

    /// Best unilateral move: `(best value, gain)` where
    /// `gain = cost(current) - cost(best) >= 0`.
    pub fn best_improvement(&self) -> (Value, f64) {
        let current_cost = self.local_cost(self.current);
        let (best, best_cost) = self.best_value();
        (best, current_cost - best_cost)
    }

    /// A value announcement to every neighbor. Neighbors must see a value
    /// every iteration or their local-cost estimates go stale.
    pub fn announce_value(&self, value: Value, iteration: usize) -> Vec<Message> {
        self.neighbors
            .iter()
            .map(|neighbor| {
                Message::new(
                    self.id.clone(),
                    neighbor.clone(),
                    Payload::ValueAnnounce { value, iteration },
                )
            })
            .collect()
    }

    /// A gain announcement to every neighbor.
    pub fn announce_gain(&self, gain: f64, tiebreak_id: AgentId, iteration: usize) -> Vec<Message> {
        self.neighbors
            .iter()
            .map(|neighbor| {
                Message::new(
                    self.id.clone(),
                    neighbor.clone(),
                    Payload::GainAnnounce {
                        gain,
                        tiebreak_id: tiebreak_id.clone(),
                        iteration,
                    },
                )
            })
            .collect()
    }
}
