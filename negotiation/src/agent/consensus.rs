//! Two-phase accept/commit bookkeeping for a proposer.
//!
//! A proposer builds one tracker per proposed item. ACCEPTs fill it; once
//! it is unanimous the proposer broadcasts COMMIT and builds a fresh
//! tracker for the COMMIT echoes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::message::AgentId;
use crate::preferences::Item;

/// A message came from someone the tracker does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a tracked counterpart")]
pub struct UntrackedCounterpart(pub AgentId);

/// Where a tracker stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusOutcome {
    /// Every counterpart agreed.
    Reached,
    /// Still waiting on these counterparts.
    Pending(Vec<AgentId>),
}

impl std::fmt::Display for ConsensusOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reached => write!(f, "reached"),
            Self::Pending(waiting) => write!(f, "pending ({} waiting)", waiting.len()),
        }
    }
}

/// Counterpart → "has agreed" flags for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusTracker {
    item: Item,
    agreed: BTreeMap<AgentId, bool>,
}

impl ConsensusTracker {
    /// Track `counterparts`, none of whom has agreed yet.
    pub fn new<'a>(item: Item, counterparts: impl IntoIterator<Item = &'a AgentId>) -> Self {
        Self {
            item,
            agreed: counterparts
                .into_iter()
                .map(|id| (id.clone(), false))
                .collect(),
        }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn counterparts(&self) -> impl Iterator<Item = &AgentId> {
        self.agreed.keys()
    }

    /// Mark `counterpart` as agreed. Returns whether the flag changed.
    pub fn agree(&mut self, counterpart: &AgentId) -> Result<bool, UntrackedCounterpart> {
        let flag = self
            .agreed
            .get_mut(counterpart)
            .ok_or_else(|| UntrackedCounterpart(counterpart.clone()))?;
        let changed = !*flag;
        *flag = true;
        Ok(changed)
    }

    /// Same counterparts, all flags cleared.
    pub fn reset(&self) -> Self {
        Self::new(self.item.clone(), self.agreed.keys())
    }

    pub fn is_unanimous(&self) -> bool {
        !self.agreed.is_empty() && self.agreed.values().all(|agreed| *agreed)
    }

    pub fn outcome(&self) -> ConsensusOutcome {
        if self.is_unanimous() {
            return ConsensusOutcome::Reached;
        }
        ConsensusOutcome::Pending(
            self.agreed
                .iter()
                .filter(|(_, agreed)| !**agreed)
                .map(|(id, _)| id.clone())
                .collect(),
        )
    }
}
