//! Negotiation agent: one private preference table, a tagged state machine,
//! and the reaction to every performative.
//!
//! ```text
//! REST ──propose──▶ ARGUING ──ACCEPT from all──▶ WAITING_FOR_COMMIT ──COMMIT from all──▶ FINISHED
//!   │                 ▲  │
//!   │   PROPOSE       │  └─no rebuttal (considering)─▶ WAITING_ANSWER_ACCEPT ──COMMIT──▶ FINISHED
//!   └─within threshold┴──────────────────────────────────────▲
//! ```
//!
//! In a fan-out the initiator is the only proposer. Respondents argue or
//! accept; after NOT_AGREE they widen and wait for the initiator's next
//! proposal.

mod belief;
mod consensus;
mod state;
mod threshold;

pub use belief::BeliefModel;
pub use consensus::{ConsensusOutcome, ConsensusTracker, UntrackedCounterpart};
pub use state::{
    CommitRole, NegotiationState, Stance, StateKind, StateMachine, StateTransition,
    TransitionError,
};
pub use threshold::AcceptanceThreshold;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::argument::{best_support, rebut_among, Argument, ArgumentLog};
use crate::config::NegotiationConfig;
use crate::error::{NegotiationError, NegotiationResult, ProtocolViolation};
use crate::message::{AgentId, Message, Payload, Performative};
use crate::preferences::{top_count, Item, PreferenceResult, PreferenceTable};

/// Who opens the negotiation and who the agent talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Opens with a proposal to every counterpart.
    Initiator { counterparts: Vec<AgentId> },
    /// Waits for the initiator's first message. With `fan_out` set the
    /// initiator talks to several respondents at once and is the only one
    /// allowed to propose.
    Respondent {
        initiator: AgentId,
        #[serde(default)]
        fan_out: bool,
    },
}

impl Role {
    pub fn counterparts(&self) -> Vec<AgentId> {
        match self {
            Self::Initiator { counterparts } => counterparts.clone(),
            Self::Respondent { initiator, .. } => vec![initiator.clone()],
        }
    }

    pub fn is_initiator(&self) -> bool {
        matches!(self, Self::Initiator { .. })
    }

    /// One initiator facing several respondents.
    pub fn is_fan_out(&self) -> bool {
        match self {
            Self::Initiator { counterparts } => counterparts.len() > 1,
            Self::Respondent { fan_out, .. } => *fan_out,
        }
    }

    /// Whether this agent may put its own items on the table.
    pub fn may_propose(&self) -> bool {
        self.is_initiator() || !self.is_fan_out()
    }
}

/// An autonomous negotiating agent.
#[derive(Debug, Clone)]
pub struct NegotiationAgent {
    id: AgentId,
    preferences: PreferenceTable,
    /// Own items, best first, score ties already broken.
    ranked_items: Vec<Item>,
    role: Role,
    counterparts: Vec<AgentId>,
    opened: bool,
    machine: StateMachine,
    threshold: AcceptanceThreshold,
    /// Items proposed since the last threshold widening.
    proposed: Vec<Item>,
    /// Every item ever proposed, kept across widenings.
    offered: Vec<Item>,
    /// Round of the latest proposal; replies stamped no later are stale.
    proposed_round: u32,
    last_proposal: Option<Item>,
    used_arguments: ArgumentLog,
    beliefs: BTreeMap<AgentId, BeliefModel>,
}

impl NegotiationAgent {
    /// Build an agent in REST. `rng` only breaks score ties in the agent's
    /// own ranking.
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        preferences: PreferenceTable,
        role: Role,
        config: &NegotiationConfig,
        rng: &mut R,
    ) -> NegotiationResult<Self> {
        let counterparts = role.counterparts();
        if counterparts.is_empty() {
            return Err(NegotiationError::InvalidSetup(format!(
                "agent {id} has no counterpart"
            )));
        }
        if counterparts.contains(&id) {
            return Err(NegotiationError::InvalidSetup(format!(
                "agent {id} cannot negotiate with itself"
            )));
        }

        let ranked_items = preferences.ranked_items(rng)?;
        let beliefs = counterparts
            .iter()
            .map(|counterpart| {
                (
                    counterpart.clone(),
                    BeliefModel::new(counterpart.clone(), &preferences),
                )
            })
            .collect();

        Ok(Self {
            id,
            preferences,
            ranked_items,
            role,
            counterparts,
            opened: false,
            machine: StateMachine::new(),
            threshold: AcceptanceThreshold::new(
                config.initial_threshold_percent,
                config.threshold_increment_percent,
            ),
            proposed: Vec::new(),
            offered: Vec::new(),
            proposed_round: 0,
            last_proposal: None,
            used_arguments: ArgumentLog::new(),
            beliefs,
        })
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn preferences(&self) -> &PreferenceTable {
        &self.preferences
    }

    pub fn ranked_items(&self) -> &[Item] {
        &self.ranked_items
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn counterparts(&self) -> &[AgentId] {
        &self.counterparts
    }

    pub fn state(&self) -> &NegotiationState {
        self.machine.state()
    }

    pub fn kind(&self) -> StateKind {
        self.machine.kind()
    }

    /// State machine with its transition history.
    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn threshold(&self) -> &AcceptanceThreshold {
        &self.threshold
    }

    pub fn used_arguments(&self) -> &ArgumentLog {
        &self.used_arguments
    }

    /// What this agent believes `counterpart` prefers.
    pub fn belief(&self, counterpart: &AgentId) -> Option<&BeliefModel> {
        self.beliefs.get(counterpart)
    }

    pub fn last_proposal(&self) -> Option<&Item> {
        self.last_proposal.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Item and role once FINISHED.
    pub fn commitment(&self) -> Option<(&Item, CommitRole)> {
        match self.machine.state() {
            NegotiationState::Finished { item, role } => Some((item, *role)),
            _ => None,
        }
    }

    /// Items the agent currently accepts without argument, best first.
    pub fn candidates(&self) -> &[Item] {
        let limit = top_count(self.ranked_items.len(), self.threshold.fraction());
        &self.ranked_items[..limit]
    }

    pub fn accepts(&self, item: &Item) -> PreferenceResult<bool> {
        self.preferences
            .is_within_top_fraction(item, &self.ranked_items, self.threshold.fraction())
    }

    /// Run one round: open the negotiation if this agent is the initiator and
    /// has not done so yet, then react to every delivered message in order.
    ///
    /// Calling it again with an empty inbox sends nothing.
    pub fn step(&mut self, round: u32, inbox: Vec<Message>) -> NegotiationResult<Vec<Message>> {
        let mut outbox = Vec::new();
        if self.role.is_initiator() && !self.opened {
            self.opened = true;
            self.propose_next(round, &mut outbox, "opening the negotiation")?;
        }
        for message in inbox {
            self.handle(round, message, &mut outbox)?;
        }
        Ok(outbox)
    }

    fn handle(
        &mut self,
        round: u32,
        message: Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        if self.is_finished() {
            return Err(self.violation(&message, "already finished"));
        }
        if message.recipient != self.id {
            return Err(self.violation(&message, format!("addressed to {}", message.recipient)));
        }
        if !self.counterparts.contains(&message.sender) {
            return Err(self.violation(&message, "sender is not a counterpart"));
        }

        debug!(
            agent = %self.id,
            round,
            from = %message.sender,
            performative = %message.performative,
            payload = %message.payload,
            "Received message"
        );

        match message.performative {
            Performative::Propose => self.on_propose(round, &message, outbox),
            Performative::Accept => self.on_accept(round, &message, outbox),
            Performative::AskWhy => self.on_ask_why(round, &message, outbox),
            Performative::Argue => self.on_argue(round, &message, outbox),
            Performative::Commit => self.on_commit(round, &message, outbox),
            Performative::NotAgree => self.on_not_agree(round, &message, outbox),
        }
    }

    fn on_propose(
        &mut self,
        round: u32,
        message: &Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        let item = self.expect_item(message)?;
        let legal = match self.machine.state() {
            NegotiationState::Rest | NegotiationState::Arguing { .. } => true,
            // The proposer we accepted from switched item.
            NegotiationState::WaitingAnswerAccept { proposer, .. } => *proposer == message.sender,
            _ => false,
        };
        if !legal {
            return Err(self.violation(message, "unexpected proposal"));
        }
        if !self.preferences.contains_item(&item) {
            return Err(self.violation(message, format!("{item} is not under negotiation")));
        }

        if self.accepts(&item)? {
            info!(
                agent = %self.id,
                round,
                item = %item,
                threshold = self.threshold.percent(),
                "Accepting proposal"
            );
            self.send(outbox, &message.sender, Performative::Accept, Payload::Item(item.clone()), round);
            self.transition(
                NegotiationState::WaitingAnswerAccept {
                    item,
                    proposer: message.sender.clone(),
                },
                round,
                "proposal within threshold",
            )
        } else {
            self.send(outbox, &message.sender, Performative::AskWhy, Payload::Item(item.clone()), round);
            self.transition(
                NegotiationState::Arguing {
                    item,
                    stance: Stance::Considering {
                        proposer: message.sender.clone(),
                    },
                },
                round,
                "proposal outside threshold",
            )
        }
    }

    fn on_accept(
        &mut self,
        round: u32,
        message: &Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        let item = self.expect_item(message)?;
        if self.is_late(message, &item) {
            debug!(agent = %self.id, item = %item, from = %message.sender, "Ignoring late acceptance");
            return Ok(());
        }

        let kind = self.kind();
        let tracker = match self.machine.state_mut() {
            NegotiationState::Arguing {
                item: current,
                stance: Stance::Proposing(tracker),
            } if *current == item => tracker,
            _ => {
                return Err(ProtocolViolation::new(
                    &self.id,
                    kind,
                    message,
                    format!("{item} is not the current proposal"),
                )
                .into())
            }
        };
        tracker
            .agree(&message.sender)
            .map_err(|err| ProtocolViolation::new(&self.id, kind, message, err.to_string()))?;
        if !tracker.is_unanimous() {
            debug!(agent = %self.id, item = %item, consensus = %tracker.outcome(), "Waiting for more acceptances");
            return Ok(());
        }

        let commits = tracker.reset();
        let recipients: Vec<AgentId> = commits.counterparts().cloned().collect();
        info!(agent = %self.id, round, item = %item, "Every counterpart accepted, committing");
        for recipient in &recipients {
            self.send(outbox, recipient, Performative::Commit, Payload::Item(item.clone()), round);
        }
        self.transition(
            NegotiationState::WaitingForCommit {
                item,
                tracker: commits,
            },
            round,
            "unanimous acceptance",
        )
    }

    fn on_ask_why(
        &mut self,
        round: u32,
        message: &Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        let item = self.expect_item(message)?;
        if self.is_late(message, &item) {
            debug!(agent = %self.id, item = %item, from = %message.sender, "Ignoring late question");
            return Ok(());
        }
        if !self.is_proposing(&item) {
            return Err(self.violation(message, format!("asked to justify {item}, which is not proposed")));
        }

        match best_support(&self.preferences, &item, &self.used_arguments)? {
            Some(argument) => {
                self.used_arguments.record(argument.clone());
                self.send(outbox, &message.sender, Performative::Argue, Payload::Argument(argument), round);
                Ok(())
            }
            None => self.propose_next(round, outbox, "support exhausted"),
        }
    }

    fn on_argue(
        &mut self,
        round: u32,
        message: &Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        let Some(argument) = message.argument().cloned() else {
            return Err(self.violation(message, "expected an argument payload"));
        };
        let item = argument.item.clone();
        if self.is_late(message, &item) {
            debug!(agent = %self.id, item = %item, from = %message.sender, "Ignoring late argument");
            return Ok(());
        }
        let stance = match self.machine.state() {
            NegotiationState::Arguing {
                item: current,
                stance,
            } if *current == item => stance.clone(),
            // Crossed with our acceptance; the item is already agreed.
            NegotiationState::WaitingAnswerAccept {
                item: accepted,
                proposer,
            } if *accepted == item && *proposer == message.sender => {
                debug!(agent = %self.id, item = %item, "Already accepted, ignoring argument");
                return Ok(());
            }
            _ => return Err(self.violation(message, format!("{item} is not on the table"))),
        };

        if let Some(belief) = self.beliefs.get_mut(&message.sender) {
            belief.absorb(&argument);
        }

        let alternatives: Vec<Item> = if self.role.may_propose() {
            self.candidates()
                .iter()
                .filter(|candidate| **candidate != item && !self.proposed.contains(candidate))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        match rebut_among(&self.preferences, &argument, &self.used_arguments, &alternatives)? {
            Some(rebuttal) if rebuttal.targets_other_item(&item) => {
                info!(
                    agent = %self.id,
                    round,
                    from = %item,
                    to = %rebuttal.argument.item,
                    kind = %rebuttal.kind,
                    "Switching to a better alternative"
                );
                self.propose(rebuttal.argument.item, round, outbox, "better alternative")
            }
            Some(rebuttal) => {
                debug!(agent = %self.id, kind = %rebuttal.kind, argument = %rebuttal.argument, "Rebutting");
                self.used_arguments.record(rebuttal.argument.clone());
                self.send(
                    outbox,
                    &message.sender,
                    Performative::Argue,
                    Payload::Argument(rebuttal.argument),
                    round,
                );
                Ok(())
            }
            None => match stance {
                Stance::Considering { proposer } => {
                    info!(agent = %self.id, round, item = %item, "No rebuttal left, conceding");
                    self.send(outbox, &proposer, Performative::Accept, Payload::Item(item.clone()), round);
                    self.transition(
                        NegotiationState::WaitingAnswerAccept { item, proposer },
                        round,
                        "no rebuttal left",
                    )
                }
                Stance::Proposing(_) => self.propose_next(round, outbox, "proposal defeated"),
            },
        }
    }

    fn on_commit(
        &mut self,
        round: u32,
        message: &Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        let item = self.expect_item(message)?;
        let acceptor = matches!(
            self.machine.state(),
            NegotiationState::WaitingAnswerAccept { item: accepted, proposer }
                if *accepted == item && *proposer == message.sender
        );
        if acceptor {
            self.send(outbox, &message.sender, Performative::Commit, Payload::Item(item.clone()), round);
            info!(agent = %self.id, round, item = %item, "Committed");
            return self.transition(
                NegotiationState::Finished {
                    item,
                    role: CommitRole::Acceptor,
                },
                round,
                "commit echoed",
            );
        }

        let kind = self.kind();
        let tracker = match self.machine.state_mut() {
            NegotiationState::WaitingForCommit {
                item: committed,
                tracker,
            } if *committed == item => tracker,
            _ => {
                return Err(ProtocolViolation::new(
                    &self.id,
                    kind,
                    message,
                    format!("commit for {item} does not match the pending agreement"),
                )
                .into())
            }
        };
        tracker
            .agree(&message.sender)
            .map_err(|err| ProtocolViolation::new(&self.id, kind, message, err.to_string()))?;
        if !tracker.is_unanimous() {
            return Ok(());
        }

        info!(agent = %self.id, round, item = %item, "Every counterpart committed");
        self.transition(
            NegotiationState::Finished {
                item,
                role: CommitRole::Proposer,
            },
            round,
            "all commits received",
        )
    }

    fn on_not_agree(
        &mut self,
        round: u32,
        message: &Message,
        outbox: &mut Vec<Message>,
    ) -> NegotiationResult<()> {
        if self.kind() == StateKind::WaitingForCommit {
            return Err(self.violation(message, "counterpart withdrew after accepting"));
        }
        self.threshold.widen();
        self.proposed.clear();
        info!(
            agent = %self.id,
            round,
            from = %message.sender,
            threshold = self.threshold.percent(),
            "Counterpart gave up, widening threshold"
        );
        if !self.role.may_propose() {
            // The initiator follows up with its next proposal.
            return Ok(());
        }
        self.propose_next(round, outbox, "counterpart gave up")
    }

    /// Propose the best candidate not yet proposed, or give up if there is
    /// none left.
    fn propose_next(
        &mut self,
        round: u32,
        outbox: &mut Vec<Message>,
        reason: &str,
    ) -> NegotiationResult<()> {
        let next = self
            .candidates()
            .iter()
            .find(|candidate| !self.proposed.contains(candidate))
            .cloned();
        match next {
            Some(item) => self.propose(item, round, outbox, reason),
            None => self.give_up(round, outbox),
        }
    }

    fn propose(
        &mut self,
        item: Item,
        round: u32,
        outbox: &mut Vec<Message>,
        reason: &str,
    ) -> NegotiationResult<()> {
        if !self.proposed.contains(&item) {
            self.proposed.push(item.clone());
        }
        if !self.offered.contains(&item) {
            self.offered.push(item.clone());
        }
        self.proposed_round = round;
        self.last_proposal = Some(item.clone());
        info!(agent = %self.id, round, item = %item, reason, "Proposing");

        for counterpart in &self.counterparts {
            self.send(outbox, counterpart, Performative::Propose, Payload::Item(item.clone()), round);
        }
        let tracker = ConsensusTracker::new(item.clone(), &self.counterparts);
        self.transition(
            NegotiationState::Arguing {
                item,
                stance: Stance::Proposing(tracker),
            },
            round,
            reason,
        )
    }

    /// Every candidate was proposed and rejected: widen, forget and tell the
    /// counterparts. In a pair the agent then rests and the counterpart
    /// proposes next; in a fan-out the initiator restarts from its best
    /// candidate straight away.
    fn give_up(&mut self, round: u32, outbox: &mut Vec<Message>) -> NegotiationResult<()> {
        let exhausted = self.threshold.percent();
        let widened = self.threshold.widen();
        self.proposed.clear();
        warn!(
            agent = %self.id,
            round,
            exhausted,
            threshold = self.threshold.percent(),
            widened,
            "No candidate left, sending NOT_AGREE"
        );

        let text = format!("nothing left within my top {exhausted}%");
        for counterpart in &self.counterparts {
            self.send(outbox, counterpart, Performative::NotAgree, Payload::Text(text.clone()), round);
        }
        if self.role.is_fan_out() {
            if let Some(item) = self.candidates().first().cloned() {
                return self.propose(item, round, outbox, "restarting after widening");
            }
        }
        if self.kind() == StateKind::Rest {
            return Ok(());
        }
        self.transition(NegotiationState::Rest, round, "candidates exhausted")
    }

    fn is_proposing(&self, item: &Item) -> bool {
        matches!(
            self.machine.state(),
            NegotiationState::Arguing { item: current, stance: Stance::Proposing(_) } if current == item
        )
    }

    /// A reply written before the sender could see my latest proposal, or
    /// one about an item I proposed and have since replaced. Only a fan-out
    /// initiator receives these: several respondents answer in the same
    /// round and one of them can make it move on.
    fn is_late(&self, message: &Message, item: &Item) -> bool {
        message.round <= self.proposed_round
            || (self.machine.state().item() != Some(item) && self.offered.contains(item))
    }

    fn expect_item(&self, message: &Message) -> NegotiationResult<Item> {
        match &message.payload {
            Payload::Item(item) => Ok(item.clone()),
            _ => Err(self.violation(message, "expected an item payload")),
        }
    }

    fn send(
        &self,
        outbox: &mut Vec<Message>,
        recipient: &AgentId,
        performative: Performative,
        payload: Payload,
        round: u32,
    ) {
        debug!(agent = %self.id, round, to = %recipient, %performative, payload = %payload, "Sending message");
        outbox.push(Message::new(
            self.id.clone(),
            recipient.clone(),
            performative,
            payload,
            round,
        ));
    }

    fn transition(
        &mut self,
        next: NegotiationState,
        round: u32,
        reason: &str,
    ) -> NegotiationResult<()> {
        let from = self.kind();
        self.machine
            .transition(next, round, reason)
            .map_err(|source| NegotiationError::Transition {
                agent: self.id.clone(),
                source,
            })?;
        debug!(agent = %self.id, round, %from, to = %self.kind(), reason, "State transition");
        Ok(())
    }

    fn violation(&self, message: &Message, reason: impl Into<String>) -> NegotiationError {
        ProtocolViolation::new(&self.id, self.kind(), message, reason).into()
    }

    /// Arguments this agent put forward, oldest first.
    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.used_arguments.iter()
    }
}
