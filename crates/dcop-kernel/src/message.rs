//! Message types for inter-agent communication.
//!
//! Messages are immutable data units created during one round's compute phase,
//! delivered by the scheduler, read during the next round, and then destroyed.
//! They are the only channel between agents.

use serde::{Deserialize, Serialize};

/// Unique identifier for an agent (and the variable it owns).
pub type AgentId = String;

/// A domain value an agent can take.
pub type Value = i64;

/// A message passed between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: AgentId,
    pub receiver: AgentId,
    pub payload: Payload,
}

/// Typed message payloads.
///
/// The iteration counter is carried for observability only; the round
/// scheduler already guarantees that a mailbox holds exactly one round's
/// worth of traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// The sender's committed (or about-to-commit) variable value.
    ValueAnnounce { value: Value, iteration: usize },

    /// The sender's achievable cost reduction this iteration.
    ///
    /// `tiebreak_id` is the sender's own id for a unilateral gain, or the
    /// lexicographically smaller member id when the gain belongs to an
    /// accepted pair (MGM-2), so every observer resolves equal gains with
    /// the same total order.
    GainAnnounce {
        gain: f64,
        tiebreak_id: AgentId,
        iteration: usize,
    },

    /// A pairing attempt (MGM-2). Carries everything the receiver needs to
    /// evaluate the exact joint gain over the Cartesian product of the two
    /// domains: for each of the offerer's domain values, the offerer's cost
    /// against its *other* neighbors' last-known values.
    PairOffer {
        offerer_current: Value,
        offerer_value_costs: Vec<(Value, f64)>,
        iteration: usize,
    },

    /// Reply to a `PairOffer`, and also the go/no-go exchange between the
    /// members of an accepted pair before the joint commit.
    ///
    /// On offer resolution: `accepted` with `joint = Some((offerer_value,
    /// receiver_value))` and the computed joint gain. On go/no-go:
    /// `accepted` alone signals whether the sender's side of the pair won
    /// its neighborhood comparison.
    PairResponse {
        accepted: bool,
        joint: Option<(Value, Value)>,
        joint_gain: f64,
        iteration: usize,
    },
}

impl Message {
    pub fn new(sender: impl Into<AgentId>, receiver: impl Into<AgentId>, payload: Payload) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            payload,
        }
    }
}
