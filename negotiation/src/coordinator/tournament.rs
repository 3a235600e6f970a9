//! Round-robin of pairwise negotiations over a population of agents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Coordinator, NegotiationOutcome, NegotiationReport, Participant};
use crate::argument::CoupleValue;
use crate::config::NegotiationConfig;
use crate::error::NegotiationResult;
use crate::message::AgentId;
use crate::preferences::Item;

/// A converged pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairResult {
    pub winner: AgentId,
    pub loser: AgentId,
    pub item: Item,
    /// The winner's supporting premises for the item.
    pub arguments: Vec<CoupleValue>,
    pub rounds: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentSummary {
    pub results: Vec<PairResult>,
    /// Pairs that ran out of rounds or stalled.
    pub unresolved: Vec<(AgentId, AgentId)>,
}

impl TournamentSummary {
    pub fn pairs(&self) -> usize {
        self.results.len() + self.unresolved.len()
    }

    /// How often each item was agreed on, keyed by item name.
    pub fn wins_by_item(&self) -> BTreeMap<String, usize> {
        let mut wins = BTreeMap::new();
        for result in &self.results {
            *wins.entry(result.item.name().to_string()).or_insert(0) += 1;
        }
        wins
    }

    /// How often each agent's proposal won.
    pub fn wins_by_agent(&self) -> BTreeMap<AgentId, usize> {
        let mut wins = BTreeMap::new();
        for result in &self.results {
            *wins.entry(result.winner.clone()).or_insert(0) += 1;
        }
        wins
    }
}

/// Negotiates every unordered pair once, with fresh agents per pair.
#[derive(Debug, Clone)]
pub struct Tournament {
    participants: Vec<Participant>,
    config: NegotiationConfig,
}

impl Tournament {
    pub fn new(mut participants: Vec<Participant>, config: NegotiationConfig) -> Self {
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            participants,
            config,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn run(&self) -> NegotiationResult<TournamentSummary> {
        self.run_with(|_| {})
    }

    /// Like [`run`](Self::run), handing every pair's full report to
    /// `observe` as it completes.
    pub fn run_with(
        &self,
        mut observe: impl FnMut(&NegotiationReport),
    ) -> NegotiationResult<TournamentSummary> {
        let mut rng = self.config.rng();
        let mut summary = TournamentSummary::default();

        for (i, first) in self.participants.iter().enumerate() {
            for second in &self.participants[i + 1..] {
                let report = Coordinator::with_rng(
                    vec![first.clone(), second.clone()],
                    &self.config,
                    &mut rng,
                )?
                .run(self.config.max_rounds)?;
                observe(&report);

                match &report.outcome {
                    NegotiationOutcome::Agreement {
                        item,
                        winner,
                        justification,
                    } => {
                        let loser = if *winner == first.id {
                            second.id.clone()
                        } else {
                            first.id.clone()
                        };
                        summary.results.push(PairResult {
                            winner: winner.clone(),
                            loser,
                            item: item.clone(),
                            arguments: justification.clone(),
                            rounds: report.rounds,
                        });
                    }
                    NegotiationOutcome::NoAgreement { .. } => {
                        summary.unresolved.push((first.id.clone(), second.id.clone()));
                    }
                }
            }
        }

        info!(
            pairs = summary.pairs(),
            converged = summary.results.len(),
            unresolved = summary.unresolved.len(),
            "Tournament finished"
        );
        Ok(summary)
    }
}
