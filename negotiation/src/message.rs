//! Messages exchanged between agents and the in-process bus that carries
//! them.
//!
//! Delivery is round-delayed: anything posted during round N lands in the
//! recipient's inbox when the round closes, so it is first seen in round
//! N + 1 whatever the stepping order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::argument::Argument;
use crate::error::{NegotiationError, NegotiationResult};
use crate::preferences::Item;

/// Identity of an agent. Ordering decides who opens a negotiation.
///
/// Ids compare by their non-numeric prefix, then by the value of a trailing
/// number, so `agent2` sorts before `agent10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing digits parsed as a number, with the prefix before them.
    fn numeric_key(&self) -> (&str, Option<u64>) {
        let prefix = self.0.trim_end_matches(|c: char| c.is_ascii_digit());
        let number = self.0[prefix.len()..].parse().ok();
        (prefix, number)
    }
}

impl Ord for AgentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_key()
            .cmp(&other.numeric_key())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for AgentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Speech-act tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Performative {
    Propose,
    Accept,
    AskWhy,
    Argue,
    Commit,
    NotAgree,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propose => write!(f, "PROPOSE"),
            Self::Accept => write!(f, "ACCEPT"),
            Self::AskWhy => write!(f, "ASK_WHY"),
            Self::Argue => write!(f, "ARGUE"),
            Self::Commit => write!(f, "COMMIT"),
            Self::NotAgree => write!(f, "NOT_AGREE"),
        }
    }
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Item(Item),
    Argument(Argument),
    Text(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(item) => write!(f, "{}", item),
            Self::Argument(argument) => write!(f, "{}", argument),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

/// An immutable envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: AgentId,
    pub recipient: AgentId,
    pub performative: Performative,
    pub payload: Payload,
    /// Round in which the message was sent.
    pub round: u32,
}

impl Message {
    pub fn new(
        sender: AgentId,
        recipient: AgentId,
        performative: Performative,
        payload: Payload,
        round: u32,
    ) -> Self {
        Self {
            sender,
            recipient,
            performative,
            payload,
            round,
        }
    }

    /// The item this message is about: the payload item, or the target of
    /// the payload argument.
    pub fn item(&self) -> Option<&Item> {
        match &self.payload {
            Payload::Item(item) => Some(item),
            Payload::Argument(argument) => Some(&argument.item),
            Payload::Text(_) => None,
        }
    }

    pub fn argument(&self) -> Option<&Argument> {
        match &self.payload {
            Payload::Argument(argument) => Some(argument),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[r{}] {} -> {} ({}) {}",
            self.round, self.sender, self.recipient, self.performative, self.payload
        )
    }
}

/// In-process, lossless, round-delayed message bus.
#[derive(Debug, Default)]
pub struct MessageBus {
    inboxes: BTreeMap<AgentId, VecDeque<Message>>,
    in_flight: Vec<Message>,
    transcript: Vec<Message>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `agent` addressable.
    pub fn register(&mut self, agent: AgentId) {
        self.inboxes.entry(agent).or_default();
    }

    /// Queue a message for delivery at the end of the current round.
    pub fn post(&mut self, message: Message) -> NegotiationResult<()> {
        if !self.inboxes.contains_key(&message.recipient) {
            return Err(NegotiationError::UnknownAgent(message.recipient));
        }
        self.transcript.push(message.clone());
        self.in_flight.push(message);
        Ok(())
    }

    /// Drain the messages deliverable to `agent` this round.
    pub fn take_inbox(&mut self, agent: &AgentId) -> Vec<Message> {
        self.inboxes
            .get_mut(agent)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Close the round: everything posted becomes deliverable.
    /// Returns the number of messages delivered.
    pub fn end_round(&mut self) -> usize {
        let delivered = self.in_flight.len();
        for message in self.in_flight.drain(..) {
            if let Some(inbox) = self.inboxes.get_mut(&message.recipient) {
                inbox.push_back(message);
            }
        }
        delivered
    }

    /// Whether any message is waiting, posted or delivered.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.inboxes.values().all(VecDeque::is_empty)
    }

    /// Every message ever posted, in posting order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Message> {
        self.transcript
    }
}
