//! Built-in item and criterion sets.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::coordinator::Participant;
use crate::message::AgentId;
use crate::preferences::{generate_random, Criterion, Item, PreferenceResult};

/// A named set of items to negotiate over and criteria to judge them by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub items: Vec<Item>,
    pub criteria: Vec<Criterion>,
}

impl Scenario {
    pub const NAMES: [&'static str; 2] = ["cars", "presidential"];

    pub fn new(name: impl Into<String>, items: Vec<Item>, criteria: Vec<Criterion>) -> Self {
        Self {
            name: name.into(),
            items,
            criteria,
        }
    }

    /// Choosing a car engine.
    pub fn cars() -> Self {
        Self::new(
            "cars",
            vec![
                Item::new("E", "The nice electric car"),
                Item::new("ICED", "The great diesel car"),
                Item::new("HYBRID", "The super hybrid car"),
            ],
            criteria(&[
                "production_cost",
                "consumption",
                "durability",
                "environment_impact",
                "noise",
            ]),
        )
    }

    /// Electing a president.
    pub fn presidential() -> Self {
        Self::new(
            "presidential",
            vec![
                Item::new("MANIOC", "Center"),
                Item::new("MELON", "Far-Left"),
                Item::new("ZEBRA", "Far-Right"),
                Item::new("JASMIN", "Left"),
                Item::new("PECANS", "Right"),
            ],
            criteria(&[
                "education",
                "liberalism",
                "immigration",
                "environment",
                "security",
                "work",
            ]),
        )
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "cars" => Some(Self::cars()),
            "presidential" => Some(Self::presidential()),
            _ => None,
        }
    }

    /// `count` agents named `agent1..agentN`, each with random preferences.
    pub fn random_participants<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> PreferenceResult<Vec<Participant>> {
        (1..=count)
            .map(|n| {
                let preferences = generate_random(&self.items, &self.criteria, rng)?;
                Ok(Participant::new(AgentId::new(format!("agent{n}")), preferences))
            })
            .collect()
    }
}

fn criteria(names: &[&str]) -> Vec<Criterion> {
    names.iter().map(|name| Criterion::new(*name)).collect()
}
