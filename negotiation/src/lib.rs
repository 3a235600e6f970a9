//! Argumentation-based negotiation between autonomous agents.
//!
//! Agents hold private ordinal preferences over a shared set of items and
//! exchange proposals, justifications and counter-arguments until they
//! commit to one item or the round budget runs out.
//!
//! - [`preferences`]: values, criteria, items and per-agent preference tables
//! - [`argument`]: arguments and the engine that supports and rebuts them
//! - [`message`]: performatives, envelopes and the round-delayed bus
//! - [`agent`]: the per-agent negotiation state machine
//! - [`coordinator`]: round scheduling, reports and pairwise tournaments

pub mod agent;
pub mod argument;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod preferences;
pub mod scenario;

pub use agent::{NegotiationAgent, Role};
pub use config::{ConfigError, NegotiationConfig};
pub use coordinator::{
    run_pair, select_initiator, Coordinator, NegotiationOutcome, NegotiationReport, Participant,
    Tournament,
};
pub use error::{NegotiationError, NegotiationResult, ProtocolViolation};
pub use message::{AgentId, Message, Performative};
pub use preferences::{Criterion, Item, PreferenceTable, Value};
pub use scenario::Scenario;
