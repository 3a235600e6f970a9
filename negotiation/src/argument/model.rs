//! Argument data model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::preferences::{Criterion, Item, Value};

/// Whether an argument supports or attacks its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Pro,
    Con,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pro => write!(f, "pro"),
            Self::Con => write!(f, "con"),
        }
    }
}

/// A `(criterion, value)` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoupleValue {
    pub criterion: Criterion,
    pub value: Value,
}

impl CoupleValue {
    pub fn new(criterion: Criterion, value: Value) -> Self {
        Self { criterion, value }
    }
}

impl fmt::Display for CoupleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.criterion, self.value)
    }
}

/// A claim that `more_important` outranks `less_important`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparison {
    pub less_important: Criterion,
    pub more_important: Criterion,
}

impl Comparison {
    pub fn new(less_important: Criterion, more_important: Criterion) -> Self {
        Self {
            less_important,
            more_important,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <= {}", self.less_important, self.more_important)
    }
}

/// A structured justification for or against an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub polarity: Polarity,
    pub item: Item,
    pub couple_premises: Vec<CoupleValue>,
    pub comparison_premises: Vec<Comparison>,
}

impl Argument {
    pub fn new(polarity: Polarity, item: Item) -> Self {
        Self {
            polarity,
            item,
            couple_premises: Vec::new(),
            comparison_premises: Vec::new(),
        }
    }

    pub fn pro(item: Item) -> Self {
        Self::new(Polarity::Pro, item)
    }

    pub fn con(item: Item) -> Self {
        Self::new(Polarity::Con, item)
    }

    pub fn with_couple(mut self, criterion: Criterion, value: Value) -> Self {
        self.couple_premises.push(CoupleValue::new(criterion, value));
        self
    }

    pub fn with_comparison(mut self, less_important: Criterion, more_important: Criterion) -> Self {
        self.comparison_premises
            .push(Comparison::new(less_important, more_important));
        self
    }

    pub fn is_pro(&self) -> bool {
        self.polarity == Polarity::Pro
    }

    /// Coarse equivalence used for anti-repetition.
    ///
    /// Same item, or identical non-empty couple premises, or identical
    /// non-empty comparison premises. Empty lists assert nothing and never
    /// make two arguments equivalent on their own.
    pub fn is_equivalent(&self, other: &Argument) -> bool {
        if self.item == other.item {
            return true;
        }
        if !self.couple_premises.is_empty() && self.couple_premises == other.couple_premises {
            return true;
        }
        !self.comparison_premises.is_empty()
            && self.comparison_premises == other.comparison_premises
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.polarity == Polarity::Con {
            write!(f, "not ")?;
        }
        write!(f, "{} <-", self.item)?;
        let premises = self
            .couple_premises
            .iter()
            .map(ToString::to_string)
            .chain(self.comparison_premises.iter().map(ToString::to_string));
        for (i, premise) in premises.enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, premise)?;
        }
        Ok(())
    }
}
