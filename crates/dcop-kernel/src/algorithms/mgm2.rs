//! MGM-2: pairwise Maximum Gain Message.
//!
//! Extends MGM with coordinated joint moves. Each iteration spans six
//! scheduler rounds:
//!
//! 1. **Value**: announce the committed value, pick a role (offerer with
//!    probability `q`, receiver otherwise), compute the unilateral best move.
//! 2. **Offer**: offerers send a pairing offer to one uniformly chosen
//!    neighbor, carrying their cost against their *other* neighbors for every
//!    domain value, so the receiver can evaluate the joint move exactly.
//! 3. **Accept**: receivers score each offer over the Cartesian product of
//!    the two domains and accept at most one: the highest positive joint gain
//!    that also beats their own unilateral gain, equal gains resolved by the
//!    smaller offerer id. Everyone else gets a rejection.
//! 4. **Gain**: paired agents announce the joint gain under the pair's
//!    shared tiebreak id (the smaller member id); everyone else announces
//!    their unilateral gain.
//! 5. **Go**: each agent checks whether its gain is the unique maximum over
//!    every non-partner neighbor; pair members tell their partner go/no-go.
//! 6. **Commit**: a pair commits its joint assignment atomically only if
//!    both members said go; unpaired winners commit their unilateral move in
//!    the same phase.
//!
//! Requiring both members to win their own neighborhood scopes the
//! maximum-gain comparison over the union of the pair's neighborhoods, so an
//! outside agent with a higher gain blocks the pair just as it would block a
//! single agent, and two overlapping pairs can never both commit.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, Neighborhood};
use crate::algorithms::unique_max_gain;
use crate::message::{AgentId, Message, Payload, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Value,
    Offer,
    Accept,
    Gain,
    Go,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Offerer,
    Receiver,
}

/// Agent running MGM-2 with offer probability `q`.
#[derive(Debug)]
pub struct Mgm2Agent {
    neighborhood: Neighborhood,
    offer_probability: f64,
    rng: ChaCha8Rng,
    phase: Phase,
    iteration: usize,
    role: Role,
    /// Best unilateral move found in the value phase.
    best_value: Value,
    unilateral_gain: f64,
    /// Neighbor this agent offered to (offerer role only).
    offered_to: Option<AgentId>,
    /// Accepted partner, if any, and this agent's value in the joint move.
    partner: Option<AgentId>,
    joint_value: Value,
    joint_gain: f64,
    my_go: bool,
    /// Unilateral move staged in the go phase, committed in the commit phase.
    staged_move: Option<Value>,
    /// Whether the last commit phase applied a joint move.
    committed_as_pair: bool,
    pending: Value,
}

impl Mgm2Agent {
    pub fn new(neighborhood: Neighborhood, offer_probability: f64, rng: ChaCha8Rng) -> Self {
        let current = neighborhood.current_value();
        Self {
            neighborhood,
            offer_probability,
            rng,
            phase: Phase::Value,
            iteration: 0,
            role: Role::Receiver,
            best_value: current,
            unilateral_gain: 0.0,
            offered_to: None,
            partner: None,
            joint_value: current,
            joint_gain: 0.0,
            my_go: false,
            staged_move: None,
            committed_as_pair: false,
            pending: current,
        }
    }

    /// The gain and tiebreak id this agent announces: the pair's joint gain
    /// under the smaller member id when paired, the unilateral gain under the
    /// agent's own id otherwise.
    fn effective_gain(&self) -> (f64, AgentId) {
        match &self.partner {
            Some(partner) => {
                let tiebreak = self.neighborhood.id().min(partner).clone();
                (self.joint_gain, tiebreak)
            }
            None => (self.unilateral_gain, self.neighborhood.id().clone()),
        }
    }

    /// Score one received offer: the best joint assignment over the full
    /// Cartesian product and its gain over the current joint configuration.
    /// Scanning both domains in order makes the choice deterministic.
    fn evaluate_offer(
        &self,
        offerer: &AgentId,
        offerer_current: Value,
        offerer_value_costs: &[(Value, f64)],
    ) -> Option<((Value, Value), f64)> {
        let current = self.neighborhood.current_value();
        let my_other_cost = |value: Value| self.neighborhood.local_cost_excluding(value, offerer);
        let offerer_cost = |value: Value| {
            offerer_value_costs
                .iter()
                .find(|(v, _)| *v == value)
                .map(|(_, c)| *c)
        };

        let current_joint = offerer_cost(offerer_current)?
            + self.neighborhood.pair_cost(current, offerer, offerer_current)
            + my_other_cost(current);

        let mut best: Option<((Value, Value), f64)> = None;
        for &(their_value, their_cost) in offerer_value_costs {
            for &my_value in self.neighborhood.domain() {
                let joint = their_cost
                    + self.neighborhood.pair_cost(my_value, offerer, their_value)
                    + my_other_cost(my_value);
                if best.map_or(true, |(_, cost)| joint < cost) {
                    best = Some(((their_value, my_value), joint));
                }
            }
        }
        best.map(|(assignment, cost)| (assignment, current_joint - cost))
    }

    fn compute_value_phase(&mut self) -> Vec<Message> {
        let current = self.neighborhood.current_value();
        let (best, gain) = self.neighborhood.best_improvement();
        self.best_value = best;
        self.unilateral_gain = gain;

        self.offered_to = None;
        self.partner = None;
        self.joint_value = current;
        self.joint_gain = 0.0;
        self.my_go = false;
        self.staged_move = None;
        self.committed_as_pair = false;

        self.role = if !self.neighborhood.neighbors().is_empty()
            && self.rng.random_bool(self.offer_probability)
        {
            Role::Offerer
        } else {
            Role::Receiver
        };

        self.neighborhood.announce_value(current, self.iteration)
    }

    fn compute_offer_phase(&mut self) -> Vec<Message> {
        if self.role != Role::Offerer {
            return Vec::new();
        }
        let neighbors: Vec<AgentId> = self.neighborhood.neighbors().iter().cloned().collect();
        let Some(target) = neighbors.choose(&mut self.rng).cloned() else {
            return Vec::new();
        };

        let offerer_value_costs = self
            .neighborhood
            .domain()
            .iter()
            .map(|&value| (value, self.neighborhood.local_cost_excluding(value, &target)))
            .collect();
        self.offered_to = Some(target.clone());

        vec![Message::new(
            self.neighborhood.id().clone(),
            target,
            Payload::PairOffer {
                offerer_current: self.neighborhood.current_value(),
                offerer_value_costs,
                iteration: self.iteration,
            },
        )]
    }

    fn compute_accept_phase(&mut self) -> Vec<Message> {
        if self.role != Role::Receiver {
            return Vec::new();
        }

        let mut offers: Vec<(AgentId, (Value, Value), f64)> = Vec::new();
        for msg in self.neighborhood.inbox() {
            if let Payload::PairOffer {
                offerer_current,
                offerer_value_costs,
                ..
            } = &msg.payload
            {
                if let Some((joint, gain)) =
                    self.evaluate_offer(&msg.sender, *offerer_current, offerer_value_costs)
                {
                    offers.push((msg.sender.clone(), joint, gain));
                }
            }
        }

        // Deterministic resolution: highest joint gain, then smaller offerer
        // id. The joint move must beat this agent's own unilateral option.
        let chosen = offers
            .iter()
            .filter(|(_, _, gain)| *gain > 0.0 && *gain > self.unilateral_gain)
            .max_by(|(id_a, _, gain_a), (id_b, _, gain_b)| {
                gain_a
                    .partial_cmp(gain_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| id_b.cmp(id_a))
            })
            .cloned();

        if let Some((partner, (_, my_value), gain)) = &chosen {
            self.partner = Some(partner.clone());
            self.joint_value = *my_value;
            self.joint_gain = *gain;
            tracing::debug!(
                agent = %self.neighborhood.id(),
                partner = %partner,
                joint_gain = gain,
                "accepted pairing offer"
            );
        }

        offers
            .into_iter()
            .map(|(offerer, joint, gain)| {
                let accepted = Some(&offerer) == self.partner.as_ref();
                Message::new(
                    self.neighborhood.id().clone(),
                    offerer,
                    Payload::PairResponse {
                        accepted,
                        joint: accepted.then_some(joint),
                        joint_gain: gain,
                        iteration: self.iteration,
                    },
                )
            })
            .collect()
    }

    fn compute_gain_phase(&mut self) -> Vec<Message> {
        if self.role == Role::Offerer {
            // An accepted offer binds this agent to the pair; a rejection
            // (or silence) leaves it on its unilateral move.
            for msg in self.neighborhood.inbox() {
                if let Payload::PairResponse {
                    accepted: true,
                    joint: Some((my_value, _)),
                    joint_gain,
                    ..
                } = &msg.payload
                {
                    if self.offered_to.as_ref() == Some(&msg.sender) {
                        self.partner = Some(msg.sender.clone());
                        self.joint_value = *my_value;
                        self.joint_gain = *joint_gain;
                    }
                }
            }
        }

        let (gain, tiebreak) = self.effective_gain();
        self.neighborhood.announce_gain(gain, tiebreak, self.iteration)
    }

    fn compute_go_phase(&mut self) -> Vec<Message> {
        let mut competitors: Vec<(f64, AgentId)> = Vec::new();
        for msg in self.neighborhood.inbox() {
            if let Payload::GainAnnounce { gain, tiebreak_id, .. } = &msg.payload {
                if self.partner.as_ref() != Some(&msg.sender) {
                    competitors.push((*gain, tiebreak_id.clone()));
                }
            }
        }

        let (gain, tiebreak) = self.effective_gain();
        let wins = unique_max_gain(
            gain,
            &tiebreak,
            competitors.iter().map(|(g, id)| (*g, id)),
        );

        match self.partner.clone() {
            Some(partner) => {
                self.my_go = wins;
                vec![Message::new(
                    self.neighborhood.id().clone(),
                    partner,
                    Payload::PairResponse {
                        accepted: wins,
                        joint: None,
                        joint_gain: 0.0,
                        iteration: self.iteration,
                    },
                )]
            }
            None => {
                if wins {
                    self.staged_move = Some(self.best_value);
                }
                Vec::new()
            }
        }
    }

    fn compute_commit_phase(&mut self) -> Vec<Message> {
        let current = self.neighborhood.current_value();
        self.pending = current;

        match &self.partner {
            Some(partner) => {
                let partner_go = self.neighborhood.inbox().iter().any(|msg| {
                    msg.sender == *partner
                        && matches!(msg.payload, Payload::PairResponse { accepted: true, .. })
                });
                if self.my_go && partner_go {
                    self.pending = self.joint_value;
                    self.committed_as_pair = true;
                }
            }
            None => {
                if let Some(value) = self.staged_move {
                    self.pending = value;
                }
            }
        }

        self.iteration += 1;
        // Fresh values for the next iteration's value phase.
        self.neighborhood.announce_value(self.pending, self.iteration)
    }

    #[cfg(test)]
    fn committed_as_pair_with(&self) -> Option<&AgentId> {
        if self.committed_as_pair {
            self.partner.as_ref()
        } else {
            None
        }
    }
}

impl Agent for Mgm2Agent {
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
        // Values are refreshed once per iteration, from the announcements the
        // commit phase broadcast, so every phase of an iteration evaluates
        // costs against the same snapshot.
        if self.phase == Phase::Value {
            self.neighborhood.absorb_value_announcements();
        }
        // Only the commit phase stages a change.
        self.pending = self.neighborhood.current_value();

        let (out, next) = match self.phase {
            Phase::Value => (self.compute_value_phase(), Phase::Offer),
            Phase::Offer => (self.compute_offer_phase(), Phase::Accept),
            Phase::Accept => (self.compute_accept_phase(), Phase::Gain),
            Phase::Gain => (self.compute_gain_phase(), Phase::Go),
            Phase::Go => (self.compute_go_phase(), Phase::Commit),
            Phase::Commit => (self.compute_commit_phase(), Phase::Value),
        };
        self.phase = next;
        out
    }

    fn update_state(&mut self) {
        self.neighborhood.set_value(self.pending);
    }

    fn clear_mailbox(&mut self) {
        self.neighborhood.clear_mailbox();
    }
}
