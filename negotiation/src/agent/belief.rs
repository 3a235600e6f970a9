//! What an agent believes about a counterpart's preferences.

use serde::Serialize;
use tracing::debug;

use crate::argument::Argument;
use crate::message::AgentId;
use crate::preferences::PreferenceTable;

/// An agent's private model of one counterpart.
///
/// Seeded from the agent's own table (the only prior it has) and refined
/// from every argument the counterpart sends. Owned by the observing agent;
/// it never aliases the agent's own preferences.
#[derive(Debug, Clone, Serialize)]
pub struct BeliefModel {
    counterpart: AgentId,
    table: PreferenceTable,
    arguments_seen: u32,
}

impl BeliefModel {
    pub fn new(counterpart: AgentId, prior: &PreferenceTable) -> Self {
        Self {
            counterpart,
            table: prior.clone(),
            arguments_seen: 0,
        }
    }

    /// Believed preferences of the counterpart.
    pub fn table(&self) -> &PreferenceTable {
        &self.table
    }

    pub fn arguments_seen(&self) -> u32 {
        self.arguments_seen
    }

    /// Fold `argument` into the model: comparison premises reorder the
    /// believed ranking, couple premises overwrite believed ratings.
    /// Returns how many premises changed the model. Claims about unknown
    /// criteria or items are skipped.
    pub fn absorb(&mut self, argument: &Argument) -> usize {
        self.arguments_seen += 1;
        let mut changed = 0;

        for comparison in &argument.comparison_premises {
            match self
                .table
                .promote(&comparison.more_important, &comparison.less_important)
            {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(err) => debug!(counterpart = %self.counterpart, %err, "Ignoring comparison premise"),
            }
        }

        for premise in &argument.couple_premises {
            let before = self.table.value_of(&argument.item, &premise.criterion).ok();
            if before == Some(premise.value) {
                continue;
            }
            match self
                .table
                .set_value(&argument.item, &premise.criterion, premise.value)
            {
                Ok(()) => changed += 1,
                Err(err) => debug!(counterpart = %self.counterpart, %err, "Ignoring couple premise"),
            }
        }

        changed
    }
}
