//! Log of arguments an agent has already put forward.

use serde::{Deserialize, Serialize};

use super::model::Argument;

/// Append-only log that never holds two equivalent arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgumentLog {
    entries: Vec<Argument>,
}

impl ArgumentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an argument equivalent to `argument` was already used.
    pub fn contains_equivalent(&self, argument: &Argument) -> bool {
        self.entries.iter().any(|used| used.is_equivalent(argument))
    }

    /// Record `argument`; returns false (and records nothing) if an
    /// equivalent one is already present.
    pub fn record(&mut self, argument: Argument) -> bool {
        if self.contains_equivalent(&argument) {
            return false;
        }
        self.entries.push(argument);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{Criterion, Item, Value};

    #[test]
    fn test_record_refuses_equivalent() {
        let mut log = ArgumentLog::new();
        let first = Argument::pro(Item::named("E")).with_couple(Criterion::new("noise"), Value::Good);
        let same_item = Argument::con(Item::named("E")).with_couple(Criterion::new("cost"), Value::Bad);
        let other = Argument::pro(Item::named("ICED")).with_couple(Criterion::new("cost"), Value::Good);

        assert!(log.record(first));
        assert!(!log.record(same_item.clone()));
        assert!(log.contains_equivalent(&same_item));
        assert!(log.record(other));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_no_two_entries_are_equivalent() {
        let mut log = ArgumentLog::new();
        for (item, criterion) in [("E", "noise"), ("E", "cost"), ("ICED", "noise"), ("HYBRID", "cost")] {
            log.record(Argument::pro(Item::named(item)).with_couple(Criterion::new(criterion), Value::Good));
        }
        let entries: Vec<_> = log.iter().collect();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                assert!(!a.is_equivalent(b));
            }
        }
    }
}
