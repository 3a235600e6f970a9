//! Ordinal values, criteria and items.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Five-grade ordinal scale used for every rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    VeryBad = 1,
    Bad = 2,
    Average = 3,
    Good = 4,
    VeryGood = 5,
}

impl Value {
    /// All grades, worst first.
    pub const ALL: [Value; 5] = [
        Value::VeryBad,
        Value::Bad,
        Value::Average,
        Value::Good,
        Value::VeryGood,
    ];

    /// Numeric grade, 1 (very bad) to 5 (very good).
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// Inverse of [`Value::ordinal`].
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.ordinal() == ordinal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryBad => write!(f, "very_bad"),
            Self::Bad => write!(f, "bad"),
            Self::Average => write!(f, "average"),
            Self::Good => write!(f, "good"),
            Self::VeryGood => write!(f, "very_good"),
        }
    }
}

/// A named evaluation dimension. The set of criteria is scenario-specific.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criterion(String);

impl Criterion {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Criterion {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A candidate outcome of the negotiation.
///
/// Identity is the name: two items with the same name are the same item,
/// whatever their descriptions say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    name: String,
    #[serde(default)]
    description: String,
}

impl Item {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Item with an empty description.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ordering() {
        assert!(Value::VeryBad < Value::Bad);
        assert!(Value::Bad < Value::Average);
        assert!(Value::Average < Value::Good);
        assert!(Value::Good < Value::VeryGood);
    }

    #[test]
    fn test_value_ordinal_roundtrip() {
        for value in Value::ALL {
            assert_eq!(Value::from_ordinal(value.ordinal()), Some(value));
        }
        assert_eq!(Value::from_ordinal(0), None);
        assert_eq!(Value::from_ordinal(6), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::VeryBad.to_string(), "very_bad");
        assert_eq!(Value::VeryGood.to_string(), "very_good");
    }

    #[test]
    fn test_value_serde() {
        let json = serde_json::to_string(&Value::VeryGood).unwrap();
        assert_eq!(json, "\"very_good\"");
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Value::VeryGood);
    }

    #[test]
    fn test_item_identity_is_by_name() {
        let a = Item::new("E", "The nice electric car");
        let b = Item::new("E", "another description");
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&Item::named("ICED")));
    }

    #[test]
    fn test_criterion_display() {
        assert_eq!(Criterion::new("noise").to_string(), "noise");
        assert_eq!(Criterion::from("noise"), Criterion::new("noise"));
    }
}
