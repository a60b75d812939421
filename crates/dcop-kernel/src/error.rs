//! Error types for graph construction and round execution.

use thiserror::Error;

use crate::message::AgentId;

/// A malformed constraint graph. These are construction-time failures:
/// a graph must be rejected before any round runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("domain for agent {0} is empty")]
    EmptyDomain(AgentId),

    #[error("constraint references unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error("constraint connects agent {0} to itself")]
    SelfConstraint(AgentId),
}

/// A failure while driving the simulation. Distributed local search assumes
/// a static, fully known agent set, so these are fatal rather than retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{parameter} must be within [0, 1], got {value}")]
    InvalidProbability { parameter: &'static str, value: f64 },

    #[error("agent {0} is already registered")]
    DuplicateAgent(AgentId),

    #[error("agent {0} is registered but not declared in the constraint graph")]
    UnknownGraphAgent(AgentId),

    #[error("message from {sender} addressed to unregistered agent {receiver}")]
    UnknownReceiver { sender: AgentId, receiver: AgentId },
}
