//! Negotiation error types.

use crate::agent::{StateKind, TransitionError};
use crate::message::{AgentId, Message, Performative};
use crate::preferences::{Item, PreferenceError};

/// Result type alias for negotiation operations
pub type NegotiationResult<T> = Result<T, NegotiationError>;

/// A message that does not fit the receiver's state. Fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("protocol violation at {agent} ({state}): {performative} from {sender}: {reason}")]
pub struct ProtocolViolation {
    pub agent: AgentId,
    pub sender: AgentId,
    pub performative: Performative,
    pub state: StateKind,
    pub reason: String,
}

impl ProtocolViolation {
    pub fn new(
        agent: &AgentId,
        state: StateKind,
        message: &Message,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.clone(),
            sender: message.sender.clone(),
            performative: message.performative,
            state,
            reason: reason.into(),
        }
    }
}

/// Everything that can abort a negotiation.
///
/// Running out of rounds is not an error; it is reported as a
/// `NoAgreement` outcome.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error("agent {agent}: {source}")]
    Transition {
        agent: AgentId,
        #[source]
        source: TransitionError,
    },

    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error("invalid setup: {0}")]
    InvalidSetup(String),

    #[error("agents finished on different items: {0:?}")]
    InconsistentCommit(Vec<(AgentId, Item)>),
}

impl NegotiationError {
    /// Whether the error comes from a misbehaving counterpart rather than
    /// from bad input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Transition { .. } | Self::InconsistentCommit(_)
        )
    }
}
