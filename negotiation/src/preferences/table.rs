//! Per-agent preference table: criterion ranking plus item ratings.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::value::{Criterion, Item, Value};

/// Data errors in a preference table.
///
/// All of these surface at construction time; a built table only reports
/// `UnknownItem` / `UnknownCriterion` when asked about something foreign.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceError {
    #[error("preference table has no criteria")]
    NoCriteria,

    #[error("criterion {0} appears more than once in the ranking")]
    DuplicateCriterion(Criterion),

    #[error("criterion {0} is rated but not ranked")]
    UnrankedCriterion(Criterion),

    #[error("item {item} is rated twice on criterion {criterion}")]
    DuplicateRating { item: String, criterion: Criterion },

    #[error("missing rating for item {item} on criterion {criterion}")]
    MissingRating { item: String, criterion: Criterion },

    #[error("unknown item {0}")]
    UnknownItem(String),

    #[error("unknown criterion {0}")]
    UnknownCriterion(Criterion),
}

/// Result type for preference operations
pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Number of entries in the top `fraction` of `n` candidates (at least one).
///
/// The small epsilon keeps products like `0.3 * 10` from rounding up to 4.
pub fn top_count(n: usize, fraction: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let raw = (fraction.clamp(0.0, 1.0) * n as f64 - 1e-9).ceil();
    (raw.max(0.0) as usize).clamp(1, n)
}

/// An agent's private preferences.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceTable {
    /// Most important first.
    criterion_rank: Vec<Criterion>,
    /// Items in declaration order.
    items: Vec<Item>,
    /// item name -> criterion -> value
    ratings: BTreeMap<String, BTreeMap<Criterion, Value>>,
}

impl PreferenceTable {
    /// Start a table whose criteria are ranked in the given order.
    pub fn builder<I, C>(criteria: I) -> PreferenceTableBuilder
    where
        I: IntoIterator<Item = C>,
        C: Into<Criterion>,
    {
        PreferenceTableBuilder {
            criteria: criteria.into_iter().map(Into::into).collect(),
            items: Vec::new(),
            ratings: BTreeMap::new(),
            error: None,
        }
    }

    /// Criteria, most important first.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criterion_rank
    }

    /// Items in declaration order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn contains_item(&self, item: &Item) -> bool {
        self.ratings.contains_key(item.name())
    }

    pub fn value_of(&self, item: &Item, criterion: &Criterion) -> PreferenceResult<Value> {
        let row = self
            .ratings
            .get(item.name())
            .ok_or_else(|| PreferenceError::UnknownItem(item.name().to_string()))?;
        row.get(criterion)
            .copied()
            .ok_or_else(|| PreferenceError::MissingRating {
                item: item.name().to_string(),
                criterion: criterion.clone(),
            })
    }

    /// Position of `criterion` in the ranking, 0 being the most important.
    pub fn rank_of(&self, criterion: &Criterion) -> Option<usize> {
        self.criterion_rank.iter().position(|c| c == criterion)
    }

    /// Whether `a` is ranked strictly above `b`.
    pub fn is_preferred_criterion(&self, a: &Criterion, b: &Criterion) -> bool {
        match (self.rank_of(a), self.rank_of(b)) {
            (Some(ra), Some(rb)) => ra < rb,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Rank-weighted score: each rating's ordinal is multiplied by
    /// `n - rank`, so the most important criterion weighs `n` and the least
    /// important weighs 1.
    pub fn score(&self, item: &Item) -> PreferenceResult<u32> {
        let n = self.criterion_rank.len() as u32;
        let mut total = 0;
        for (rank, criterion) in self.criterion_rank.iter().enumerate() {
            let value = self.value_of(item, criterion)?;
            total += value.ordinal() * (n - rank as u32);
        }
        Ok(total)
    }

    pub fn is_preferred_item(&self, a: &Item, b: &Item) -> PreferenceResult<bool> {
        Ok(self.score(a)? > self.score(b)?)
    }

    /// Whether `item` is among the best-scoring `ceil(fraction * n)` of
    /// `candidates` (minimum one). Equal scores keep candidate order.
    pub fn is_within_top_fraction(
        &self,
        item: &Item,
        candidates: &[Item],
        fraction: f64,
    ) -> PreferenceResult<bool> {
        let mut scored = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            scored.push((index, self.score(candidate)?));
        }
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let k = top_count(candidates.len(), fraction);
        Ok(scored
            .iter()
            .take(k)
            .any(|(index, _)| &candidates[*index] == item))
    }

    /// All items, best first. Equal scores are ordered at random.
    pub fn ranked_items<R: Rng + ?Sized>(&self, rng: &mut R) -> PreferenceResult<Vec<Item>> {
        let mut shuffled = self.items.clone();
        shuffled.shuffle(rng);

        let mut scored = Vec::with_capacity(shuffled.len());
        for item in shuffled {
            let score = self.score(&item)?;
            scored.push((item, score));
        }
        // Stable sort keeps the shuffled order inside each score class.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(scored.into_iter().map(|(item, _)| item).collect())
    }

    /// Reorder so that `more` is strictly more important than `less`.
    ///
    /// Returns whether the ranking changed. Only belief models are promoted;
    /// an agent's own table never changes after construction.
    pub fn promote(&mut self, more: &Criterion, less: &Criterion) -> PreferenceResult<bool> {
        let from = self
            .rank_of(more)
            .ok_or_else(|| PreferenceError::UnknownCriterion(more.clone()))?;
        let to = self
            .rank_of(less)
            .ok_or_else(|| PreferenceError::UnknownCriterion(less.clone()))?;
        if from < to || more == less {
            return Ok(false);
        }
        let criterion = self.criterion_rank.remove(from);
        self.criterion_rank.insert(to, criterion);
        Ok(true)
    }

    /// Overwrite one rating. Used by belief models only.
    pub(crate) fn set_value(
        &mut self,
        item: &Item,
        criterion: &Criterion,
        value: Value,
    ) -> PreferenceResult<()> {
        if self.rank_of(criterion).is_none() {
            return Err(PreferenceError::UnknownCriterion(criterion.clone()));
        }
        let row = self
            .ratings
            .get_mut(item.name())
            .ok_or_else(|| PreferenceError::UnknownItem(item.name().to_string()))?;
        row.insert(criterion.clone(), value);
        Ok(())
    }
}

/// Builder that validates the table invariants on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct PreferenceTableBuilder {
    criteria: Vec<Criterion>,
    items: Vec<Item>,
    ratings: BTreeMap<String, BTreeMap<Criterion, Value>>,
    error: Option<PreferenceError>,
}

impl PreferenceTableBuilder {
    /// Declare an item under negotiation, even before any rating.
    pub fn item(mut self, item: &Item) -> Self {
        self.declare(item);
        self
    }

    /// Rate `item` on `criterion`.
    pub fn rate(mut self, item: &Item, criterion: impl Into<Criterion>, value: Value) -> Self {
        let criterion = criterion.into();
        self.declare(item);
        let row = self.ratings.entry(item.name().to_string()).or_default();
        if row.insert(criterion.clone(), value).is_some() && self.error.is_none() {
            self.error = Some(PreferenceError::DuplicateRating {
                item: item.name().to_string(),
                criterion,
            });
        }
        self
    }

    /// Rate `item` on every criterion at once, in ranking order.
    pub fn rate_all(mut self, item: &Item, values: &[Value]) -> Self {
        let criteria = self.criteria.clone();
        self.declare(item);
        for (criterion, value) in criteria.into_iter().zip(values.iter().copied()) {
            self = self.rate(item, criterion, value);
        }
        self
    }

    fn declare(&mut self, item: &Item) {
        if !self.items.contains(item) {
            self.items.push(item.clone());
            self.ratings.entry(item.name().to_string()).or_default();
        }
    }

    pub fn build(self) -> PreferenceResult<PreferenceTable> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.criteria.is_empty() {
            return Err(PreferenceError::NoCriteria);
        }
        for (i, criterion) in self.criteria.iter().enumerate() {
            if self.criteria[..i].contains(criterion) {
                return Err(PreferenceError::DuplicateCriterion(criterion.clone()));
            }
        }
        for item in &self.items {
            let row = self.ratings.get(item.name());
            if let Some(row) = row {
                if let Some(extra) = row.keys().find(|c| !self.criteria.contains(c)) {
                    return Err(PreferenceError::UnrankedCriterion(extra.clone()));
                }
            }
            for criterion in &self.criteria {
                if !row.is_some_and(|r| r.contains_key(criterion)) {
                    return Err(PreferenceError::MissingRating {
                        item: item.name().to_string(),
                        criterion: criterion.clone(),
                    });
                }
            }
        }
        Ok(PreferenceTable {
            criterion_rank: self.criteria,
            items: self.items,
            ratings: self.ratings,
        })
    }
}
