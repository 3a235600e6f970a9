//! Negotiation state machine: states, transitions and the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::consensus::ConsensusTracker;
use crate::message::AgentId;
use crate::preferences::Item;

/// Discriminant of [`NegotiationState`], used for transition rules and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Nothing on the table.
    Rest,
    /// An item is on the table and being argued.
    Arguing,
    /// Accepted a proposal, waiting for the proposer's COMMIT.
    WaitingAnswerAccept,
    /// Every counterpart accepted; waiting for their COMMIT echoes.
    WaitingForCommit,
    /// Committed.
    Finished,
}

impl StateKind {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Valid transitions from this state.
    pub fn valid_transitions(self) -> &'static [StateKind] {
        match self {
            Self::Rest => &[Self::Arguing, Self::WaitingAnswerAccept],
            Self::Arguing => &[
                Self::Arguing,
                Self::WaitingAnswerAccept,
                Self::WaitingForCommit,
                Self::Rest,
            ],
            Self::WaitingAnswerAccept => {
                &[Self::Arguing, Self::WaitingAnswerAccept, Self::Finished]
            }
            Self::WaitingForCommit => &[Self::Finished],
            Self::Finished => &[],
        }
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rest => write!(f, "rest"),
            Self::Arguing => write!(f, "arguing"),
            Self::WaitingAnswerAccept => write!(f, "waiting_answer_accept"),
            Self::WaitingForCommit => write!(f, "waiting_for_commit"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Which side of the table an arguing agent is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    /// This agent proposed the item and tracks who accepted it.
    Proposing(ConsensusTracker),
    /// A counterpart proposed the item.
    Considering { proposer: AgentId },
}

/// How an agent reached FINISHED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitRole {
    /// Proposed the item and collected every COMMIT.
    Proposer,
    /// Accepted the item and echoed the proposer's COMMIT.
    Acceptor,
}

/// Per-agent negotiation state. Every state past REST carries the item on
/// the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationState {
    Rest,
    Arguing {
        item: Item,
        stance: Stance,
    },
    WaitingAnswerAccept {
        item: Item,
        proposer: AgentId,
    },
    WaitingForCommit {
        item: Item,
        tracker: ConsensusTracker,
    },
    Finished {
        item: Item,
        role: CommitRole,
    },
}

impl NegotiationState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Rest => StateKind::Rest,
            Self::Arguing { .. } => StateKind::Arguing,
            Self::WaitingAnswerAccept { .. } => StateKind::WaitingAnswerAccept,
            Self::WaitingForCommit { .. } => StateKind::WaitingForCommit,
            Self::Finished { .. } => StateKind::Finished,
        }
    }

    /// The item on the table, if any.
    pub fn item(&self) -> Option<&Item> {
        match self {
            Self::Rest => None,
            Self::Arguing { item, .. }
            | Self::WaitingAnswerAccept { item, .. }
            | Self::WaitingForCommit { item, .. }
            | Self::Finished { item, .. } => Some(item),
        }
    }
}

/// A state transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: StateKind,
    pub to: StateKind,
    /// Item on the table after the transition.
    pub item: Option<Item>,
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: StateKind,
    pub to: StateKind,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// Current state plus the history of how it got there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMachine {
    state: NegotiationState,
    transitions: Vec<StateTransition>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Start in REST.
    pub fn new() -> Self {
        Self {
            state: NegotiationState::Rest,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// In-place access for bookkeeping that does not change the state kind
    /// (e.g. marking a counterpart as agreed).
    pub(crate) fn state_mut(&mut self) -> &mut NegotiationState {
        &mut self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Move to `next`, recording the reason.
    pub fn transition(
        &mut self,
        next: NegotiationState,
        round: u32,
        reason: &str,
    ) -> Result<(), TransitionError> {
        let from = self.state.kind();
        let to = next.kind();
        if !from.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?}) while {}",
                    from.valid_transitions(),
                    reason
                ),
            });
        }

        self.transitions.push(StateTransition {
            from,
            to,
            item: next.item().cloned(),
            round,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.state = next;
        Ok(())
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        match self.state.item() {
            Some(item) => format!(
                "[{}] item={} | {} transitions",
                self.kind(),
                item,
                self.transitions.len()
            ),
            None => format!("[{}] | {} transitions", self.kind(), self.transitions.len()),
        }
    }
}
