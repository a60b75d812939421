//! DCOP Kernel: round-synchronous simulation of distributed constraint optimization.
//!
//! A set of autonomous agents, each owning one variable of a global optimization
//! problem, exchange messages over discrete synchronous rounds to jointly minimize
//! a sum of pairwise constraint costs. No agent ever observes the global state;
//! everything it knows arrives through its mailbox.
//!
//! The kernel provides:
//! - The agent/message contract and the round scheduler ([`Environment`])
//! - The static problem description ([`ConstraintGraph`])
//! - Three local-search strategies on top of the same contract:
//!   DSA-C, MGM, and MGM-2 (see [`algorithms`])
//!
//! The reference execution model is a single-threaded discrete-round simulation
//! that emulates parallelism: every agent computes against last round's mailbox
//! before any agent commits, so no agent can react to a neighbor's same-round
//! decision.

pub mod agent;
pub mod algorithms;
pub mod environment;
pub mod error;
pub mod graph;
pub mod message;
pub mod metrics;

pub use agent::{Agent, Neighborhood};
pub use algorithms::{build_agents, AlgorithmKind};
pub use environment::Environment;
pub use error::{GraphError, KernelError};
pub use graph::ConstraintGraph;
pub use message::{AgentId, Message, Payload, Value};
pub use metrics::{CostLog, MetricsSink, RoundMetrics};
