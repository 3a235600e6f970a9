//! Negotiation coordinator: builds the agents, steps them round by round and
//! reports the outcome.
//!
//! Every round steps each agent exactly once, in identity order. Messages
//! posted during round N are delivered when round N closes.

mod tournament;

pub use tournament::{PairResult, Tournament, TournamentSummary};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{CommitRole, NegotiationAgent, Role, StateKind};
use crate::argument::{supporting_premises, CoupleValue};
use crate::config::NegotiationConfig;
use crate::error::{NegotiationError, NegotiationResult};
use crate::message::{AgentId, Message, MessageBus, Performative};
use crate::preferences::{Item, PreferenceTable};

/// An agent identity paired with its private preferences.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub id: AgentId,
    pub preferences: PreferenceTable,
}

impl Participant {
    pub fn new(id: impl Into<AgentId>, preferences: PreferenceTable) -> Self {
        Self {
            id: id.into(),
            preferences,
        }
    }
}

/// The lowest identity opens the negotiation. Trailing numbers compare by
/// value, so `agent2` opens before `agent10`.
pub fn select_initiator<'a>(ids: impl IntoIterator<Item = &'a AgentId>) -> Option<&'a AgentId> {
    ids.into_iter().min()
}

/// Why a run ended without agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoAgreementReason {
    /// The round budget ran out.
    BudgetExhausted,
    /// Nobody had anything left to say.
    Stalled,
}

impl std::fmt::Display for NoAgreementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetExhausted => write!(f, "round budget exhausted"),
            Self::Stalled => write!(f, "stalled"),
        }
    }
}

/// How a negotiation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NegotiationOutcome {
    Agreement {
        item: Item,
        /// The agent whose proposal was committed.
        winner: AgentId,
        /// The winner's supporting premises for the item.
        justification: Vec<CoupleValue>,
    },
    NoAgreement {
        /// Item each agent last had on the table or proposed.
        last_proposals: BTreeMap<AgentId, Option<Item>>,
        reason: NoAgreementReason,
    },
}

impl NegotiationOutcome {
    /// Committed item and winner, if any.
    pub fn agreement(&self) -> Option<(&Item, &AgentId)> {
        match self {
            Self::Agreement { item, winner, .. } => Some((item, winner)),
            Self::NoAgreement { .. } => None,
        }
    }
}

/// End-of-run snapshot of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub state: StateKind,
    pub threshold_percent: u32,
    pub widenings: u32,
    pub arguments_used: usize,
    pub transitions: usize,
    pub last_proposal: Option<Item>,
}

impl AgentSummary {
    fn of(agent: &NegotiationAgent) -> Self {
        Self {
            id: agent.id().clone(),
            state: agent.kind(),
            threshold_percent: agent.threshold().percent(),
            widenings: agent.threshold().widenings(),
            arguments_used: agent.used_arguments().len(),
            transitions: agent.machine().transitions().len(),
            last_proposal: agent.last_proposal().cloned(),
        }
    }
}

/// Everything a caller needs to know about one negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationReport {
    pub id: Uuid,
    pub initiator: AgentId,
    pub outcome: NegotiationOutcome,
    /// Rounds actually played.
    pub rounds: u32,
    pub transcript: Vec<Message>,
    pub agents: Vec<AgentSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NegotiationReport {
    pub fn agreement(&self) -> Option<(&Item, &AgentId)> {
        self.outcome.agreement()
    }

    /// Number of messages sent with `performative`.
    pub fn count(&self, performative: Performative) -> usize {
        self.transcript
            .iter()
            .filter(|message| message.performative == performative)
            .count()
    }

    /// Compact one-line summary for logs.
    pub fn summary_line(&self) -> String {
        match &self.outcome {
            NegotiationOutcome::Agreement { item, winner, .. } => format!(
                "agreed on {} (proposed by {}) after {} rounds, {} messages",
                item,
                winner,
                self.rounds,
                self.transcript.len()
            ),
            NegotiationOutcome::NoAgreement { reason, .. } => format!(
                "no agreement ({}) after {} rounds, {} messages",
                reason,
                self.rounds,
                self.transcript.len()
            ),
        }
    }
}

/// Drives one initiator and its counterparts to agreement or exhaustion.
#[derive(Debug)]
pub struct Coordinator {
    agents: Vec<NegotiationAgent>,
    bus: MessageBus,
    initiator: AgentId,
}

impl Coordinator {
    /// Build agents for `participants`, breaking score ties from the
    /// config's random source.
    pub fn new(participants: Vec<Participant>, config: &NegotiationConfig) -> NegotiationResult<Self> {
        let mut rng = config.rng();
        Self::with_rng(participants, config, &mut rng)
    }

    pub fn with_rng<R: Rng + ?Sized>(
        mut participants: Vec<Participant>,
        config: &NegotiationConfig,
        rng: &mut R,
    ) -> NegotiationResult<Self> {
        if participants.len() < 2 {
            return Err(NegotiationError::InvalidSetup(format!(
                "need at least two agents, got {}",
                participants.len()
            )));
        }
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = participants.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(NegotiationError::InvalidSetup(format!(
                "duplicate agent {}",
                pair[0].id
            )));
        }
        check_same_items(&participants)?;

        let ids: Vec<AgentId> = participants.iter().map(|p| p.id.clone()).collect();
        let initiator = select_initiator(&ids)
            .cloned()
            .ok_or_else(|| NegotiationError::InvalidSetup("no agents".into()))?;

        let mut bus = MessageBus::new();
        let mut agents = Vec::with_capacity(participants.len());
        for participant in participants {
            let role = if participant.id == initiator {
                Role::Initiator {
                    counterparts: ids.iter().filter(|id| **id != initiator).cloned().collect(),
                }
            } else {
                Role::Respondent {
                    initiator: initiator.clone(),
                    fan_out: ids.len() > 2,
                }
            };
            bus.register(participant.id.clone());
            agents.push(NegotiationAgent::new(
                participant.id,
                participant.preferences,
                role,
                config,
                rng,
            )?);
        }

        Ok(Self {
            agents,
            bus,
            initiator,
        })
    }

    pub fn initiator(&self) -> &AgentId {
        &self.initiator
    }

    pub fn agents(&self) -> &[NegotiationAgent] {
        &self.agents
    }

    pub fn agent(&self, id: &AgentId) -> Option<&NegotiationAgent> {
        self.agents.iter().find(|agent| agent.id() == id)
    }

    /// Play one round. Returns the number of messages sent in it.
    pub fn play_round(&mut self, round: u32) -> NegotiationResult<usize> {
        for agent in &mut self.agents {
            let inbox = self.bus.take_inbox(agent.id());
            for message in agent.step(round, inbox)? {
                self.bus.post(message)?;
            }
        }
        Ok(self.bus.end_round())
    }

    pub fn all_finished(&self) -> bool {
        self.agents.iter().all(NegotiationAgent::is_finished)
    }

    /// Run until every agent has committed, the exchange goes quiet, or
    /// `max_rounds` is spent. Running out of rounds is a normal outcome.
    pub fn run(mut self, max_rounds: u32) -> NegotiationResult<NegotiationReport> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run = %id, initiator = %self.initiator, agents = self.agents.len(), max_rounds, "Negotiation started");

        let mut rounds = 0;
        let mut stalled = false;
        while rounds < max_rounds {
            rounds += 1;
            let sent = self.play_round(rounds)?;
            debug!(run = %id, round = rounds, sent, "Round closed");
            if self.all_finished() {
                break;
            }
            if sent == 0 && self.bus.is_idle() {
                stalled = true;
                break;
            }
        }

        self.check_consistency()?;
        let outcome = self.outcome(stalled)?;
        match &outcome {
            NegotiationOutcome::Agreement { item, winner, .. } => {
                info!(run = %id, rounds, item = %item, winner = %winner, "Negotiation converged")
            }
            NegotiationOutcome::NoAgreement { reason, .. } => {
                warn!(run = %id, rounds, %reason, "Negotiation ended without agreement")
            }
        }

        let agents = self.agents.iter().map(AgentSummary::of).collect();
        Ok(NegotiationReport {
            id,
            initiator: self.initiator,
            outcome,
            rounds,
            transcript: self.bus.into_transcript(),
            agents,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// No two finished agents may hold different items.
    fn check_consistency(&self) -> NegotiationResult<()> {
        let committed: Vec<(AgentId, Item)> = self
            .agents
            .iter()
            .filter_map(|agent| agent.commitment().map(|(item, _)| (agent.id().clone(), item.clone())))
            .collect();
        let distinct: BTreeSet<&str> = committed.iter().map(|(_, item)| item.name()).collect();
        if distinct.len() > 1 {
            return Err(NegotiationError::InconsistentCommit(committed));
        }
        Ok(())
    }

    fn outcome(&self, stalled: bool) -> NegotiationResult<NegotiationOutcome> {
        if self.all_finished() {
            let winner = self
                .agents
                .iter()
                .find(|agent| matches!(agent.commitment(), Some((_, CommitRole::Proposer))));
            if let Some(winner) = winner {
                if let Some((item, _)) = winner.commitment() {
                    return Ok(NegotiationOutcome::Agreement {
                        item: item.clone(),
                        winner: winner.id().clone(),
                        justification: supporting_premises(winner.preferences(), item)?,
                    });
                }
            }
        }

        let last_proposals = self
            .agents
            .iter()
            .map(|agent| {
                let item = agent.state().item().or(agent.last_proposal()).cloned();
                (agent.id().clone(), item)
            })
            .collect();
        Ok(NegotiationOutcome::NoAgreement {
            last_proposals,
            reason: if stalled {
                NoAgreementReason::Stalled
            } else {
                NoAgreementReason::BudgetExhausted
            },
        })
    }
}

fn check_same_items(participants: &[Participant]) -> NegotiationResult<()> {
    let names = |table: &PreferenceTable| -> BTreeSet<String> {
        table.items().iter().map(|item| item.name().to_string()).collect()
    };
    let Some((first, rest)) = participants.split_first() else {
        return Ok(());
    };
    let expected = names(&first.preferences);
    for participant in rest {
        if names(&participant.preferences) != expected {
            return Err(NegotiationError::InvalidSetup(format!(
                "{} and {} do not rate the same items",
                first.id, participant.id
            )));
        }
    }
    Ok(())
}

/// Negotiate between exactly two agents.
pub fn run_pair(
    a: Participant,
    b: Participant,
    config: &NegotiationConfig,
    max_rounds: u32,
) -> NegotiationResult<NegotiationReport> {
    Coordinator::new(vec![a, b], config)?.run(max_rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Value;

    fn table(values: [[Value; 2]; 2]) -> PreferenceTable {
        PreferenceTable::builder(["cost", "noise"])
            .rate_all(&Item::named("A"), &values[0])
            .rate_all(&Item::named("B"), &values[1])
            .build()
            .unwrap()
    }

    fn likes_a() -> PreferenceTable {
        table([[Value::VeryGood, Value::Good], [Value::Bad, Value::Bad]])
    }

    #[test]
    fn test_select_initiator_is_lowest_identity() {
        let ids: Vec<AgentId> = vec!["agent3".into(), "agent1".into(), "agent2".into()];
        assert_eq!(select_initiator(&ids), Some(&AgentId::new("agent1")));
        assert_eq!(select_initiator(&Vec::<AgentId>::new()), None);

        let ids: Vec<AgentId> = vec!["agent10".into(), "agent2".into(), "agent11".into()];
        assert_eq!(select_initiator(&ids), Some(&AgentId::new("agent2")));
    }

    #[test]
    fn test_initiator_independent_of_input_order() {
        let coordinator = Coordinator::new(
            vec![Participant::new("bob", likes_a()), Participant::new("alice", likes_a())],
            &NegotiationConfig::default(),
        )
        .unwrap();
        assert_eq!(coordinator.initiator().as_str(), "alice");
        assert_eq!(coordinator.agents()[0].id().as_str(), "alice");
        assert!(coordinator.agent(&"bob".into()).is_some());
    }

    #[test]
    fn test_setup_errors() {
        let config = NegotiationConfig::default();
        let err = Coordinator::new(vec![Participant::new("a", likes_a())], &config).unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidSetup(_)));

        let err = Coordinator::new(
            vec![Participant::new("a", likes_a()), Participant::new("a", likes_a())],
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidSetup(_)));

        let other_items = PreferenceTable::builder(["cost"])
            .rate(&Item::named("Z"), "cost", Value::Good)
            .build()
            .unwrap();
        let err = Coordinator::new(
            vec![Participant::new("a", likes_a()), Participant::new("b", other_items)],
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidSetup(_)));
    }

    #[test]
    fn test_pair_agreement_report() {
        let report = run_pair(
            Participant::new("agent1", likes_a()),
            Participant::new("agent2", likes_a()),
            &NegotiationConfig::default(),
            20,
        )
        .unwrap();

        let (item, winner) = report.agreement().unwrap();
        assert_eq!(item, &Item::named("A"));
        assert_eq!(winner.as_str(), "agent1");
        match &report.outcome {
            NegotiationOutcome::Agreement { justification, .. } => {
                assert_eq!(justification.len(), 2);
                assert_eq!(justification[0].value, Value::VeryGood);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.count(Performative::Commit), 2);
        assert!(report.agents.iter().all(|agent| agent.state == StateKind::Finished));
        assert!(report.summary_line().starts_with("agreed on A"));
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let report = run_pair(
            Participant::new("agent1", likes_a()),
            Participant::new("agent2", likes_a()),
            &NegotiationConfig::default(),
            2,
        )
        .unwrap();

        assert_eq!(report.rounds, 2);
        match &report.outcome {
            NegotiationOutcome::NoAgreement {
                last_proposals,
                reason,
            } => {
                assert_eq!(*reason, NoAgreementReason::BudgetExhausted);
                assert_eq!(last_proposals[&AgentId::new("agent1")], Some(Item::named("A")));
                assert_eq!(last_proposals[&AgentId::new("agent2")], Some(Item::named("A")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_report_serializes() {
        let report = run_pair(
            Participant::new("agent1", likes_a()),
            Participant::new("agent2", likes_a()),
            &NegotiationConfig::default(),
            20,
        )
        .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["outcome"], "agreement");
        assert_eq!(json["outcome"]["item"]["name"], "A");
        assert_eq!(json["transcript"][0]["performative"], "PROPOSE");
    }
}
