//! Argument engine: building support for an item and rebutting an
//! opponent's argument from one agent's preference table.
//!
//! Every function here is pure: the caller owns the [`ArgumentLog`] and
//! decides what to record.
//!
//! # Rebuttal priorities
//!
//! ```text
//! opponent argues FOR item on criterion c
//!   (1) a criterion ranked above c rates the item below AVERAGE  → con item
//!   (2) the claimed value is below min(my rating on c, AVERAGE)  → con item
//!   (3) another item rates strictly better than this one on c    → pro other item
//!
//! opponent argues AGAINST item on criterion c
//!   any other criterion rates the item above
//!   min(AVERAGE, worst rating of any item on that criterion)     → pro item
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::log::ArgumentLog;
use super::model::{Argument, CoupleValue, Polarity};
use crate::preferences::{Criterion, Item, PreferenceResult, PreferenceTable, Value};

/// Which rule produced a rebuttal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuttalKind {
    /// A more important criterion is bad for the item.
    MoreImportantCriterionBad,
    /// The opponent's own claim on the cited criterion is below average.
    CriterionBad,
    /// Another item is better on the cited criterion.
    BetterAlternative,
    /// The item is good on some other criterion.
    CounterSupport,
}

impl std::fmt::Display for RebuttalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MoreImportantCriterionBad => write!(f, "more_important_criterion_bad"),
            Self::CriterionBad => write!(f, "criterion_bad"),
            Self::BetterAlternative => write!(f, "better_alternative"),
            Self::CounterSupport => write!(f, "counter_support"),
        }
    }
}

/// A counter-argument and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebuttal {
    pub argument: Argument,
    pub kind: RebuttalKind,
}

impl Rebuttal {
    /// Whether the rebuttal switches the discussion to another item.
    pub fn targets_other_item(&self, current: &Item) -> bool {
        &self.argument.item != current
    }
}

fn premises_where(
    table: &PreferenceTable,
    item: &Item,
    keep: impl Fn(Value) -> bool,
) -> PreferenceResult<Vec<CoupleValue>> {
    let mut premises = Vec::new();
    // Criteria come out most important first; the stable sort below keeps
    // that as the secondary key.
    for criterion in table.criteria() {
        let value = table.value_of(item, criterion)?;
        if keep(value) {
            premises.push(CoupleValue::new(criterion.clone(), value));
        }
    }
    premises.sort_by(|a, b| b.value.cmp(&a.value));
    Ok(premises)
}

/// `(criterion, value)` pairs rated at least GOOD, best value first, then by
/// criterion importance.
pub fn supporting_premises(
    table: &PreferenceTable,
    item: &Item,
) -> PreferenceResult<Vec<CoupleValue>> {
    premises_where(table, item, |v| v >= Value::Good)
}

/// `(criterion, value)` pairs rated below GOOD, best value first, then by
/// criterion importance.
pub fn attacking_premises(
    table: &PreferenceTable,
    item: &Item,
) -> PreferenceResult<Vec<CoupleValue>> {
    premises_where(table, item, |v| v < Value::Good)
}

/// Strongest supporting premise not yet used, as a pro-argument.
///
/// `None` means the item cannot be justified any further.
pub fn best_support(
    table: &PreferenceTable,
    item: &Item,
    used: &ArgumentLog,
) -> PreferenceResult<Option<Argument>> {
    for premise in supporting_premises(table, item)? {
        let argument = Argument::pro(item.clone()).with_couple(premise.criterion, premise.value);
        if !used.contains_equivalent(&argument) {
            return Ok(Some(argument));
        }
    }
    Ok(None)
}

/// Rebut `opposing` using every other item of the table as an alternative.
pub fn rebut(
    table: &PreferenceTable,
    opposing: &Argument,
    used: &ArgumentLog,
) -> PreferenceResult<Option<Rebuttal>> {
    rebut_among(table, opposing, used, table.items())
}

/// Rebut `opposing`, drawing better-alternative arguments only from
/// `alternatives`.
///
/// Premises are scanned in order; `None` after the last premise means no
/// counter-argument exists.
pub fn rebut_among(
    table: &PreferenceTable,
    opposing: &Argument,
    used: &ArgumentLog,
    alternatives: &[Item],
) -> PreferenceResult<Option<Rebuttal>> {
    let item = &opposing.item;
    if !table.contains_item(item) {
        debug!(item = %item, "Opposing argument targets an item outside the table");
        return Ok(None);
    }

    for premise in &opposing.couple_premises {
        let found = match opposing.polarity {
            Polarity::Pro => attack_support(table, item, premise, used, alternatives)?,
            Polarity::Con => defend_item(table, item, premise, used)?,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn unused(argument: Argument, kind: RebuttalKind, used: &ArgumentLog) -> Option<Rebuttal> {
    (!used.contains_equivalent(&argument)).then_some(Rebuttal { argument, kind })
}

fn attack_support(
    table: &PreferenceTable,
    item: &Item,
    premise: &CoupleValue,
    used: &ArgumentLog,
    alternatives: &[Item],
) -> PreferenceResult<Option<Rebuttal>> {
    let cited = &premise.criterion;
    let Some(cited_rank) = table.rank_of(cited) else {
        debug!(criterion = %cited, "Skipping premise on a criterion outside the table");
        return Ok(None);
    };

    // (1) something I care about more is bad
    for criterion in &table.criteria()[..cited_rank] {
        let value = table.value_of(item, criterion)?;
        if value < Value::Average {
            let argument = Argument::con(item.clone())
                .with_couple(criterion.clone(), value)
                .with_comparison(cited.clone(), criterion.clone());
            if let Some(rebuttal) = unused(argument, RebuttalKind::MoreImportantCriterionBad, used) {
                return Ok(Some(rebuttal));
            }
        }
    }

    // (2) the claim itself rates the item poorly on c
    let own = table.value_of(item, cited)?;
    if premise.value < own.min(Value::Average) {
        let argument = Argument::con(item.clone()).with_couple(cited.clone(), own);
        if let Some(rebuttal) = unused(argument, RebuttalKind::CriterionBad, used) {
            return Ok(Some(rebuttal));
        }
    }

    // (3) another item does better on the cited criterion
    let mut better: Vec<(&Item, Value)> = Vec::new();
    for alternative in alternatives {
        if alternative == item || !table.contains_item(alternative) {
            continue;
        }
        let value = table.value_of(alternative, cited)?;
        if value > own {
            better.push((alternative, value));
        }
    }
    better.sort_by(|a, b| b.1.cmp(&a.1));
    for (alternative, value) in better {
        let argument = Argument::pro(alternative.clone()).with_couple(cited.clone(), value);
        if let Some(rebuttal) = unused(argument, RebuttalKind::BetterAlternative, used) {
            return Ok(Some(rebuttal));
        }
    }

    Ok(None)
}

fn defend_item(
    table: &PreferenceTable,
    item: &Item,
    premise: &CoupleValue,
    used: &ArgumentLog,
) -> PreferenceResult<Option<Rebuttal>> {
    let cited = &premise.criterion;
    for criterion in table.criteria() {
        if criterion == cited {
            continue;
        }
        let floor = worst_rating(table, criterion)?.min(Value::Average);
        let value = table.value_of(item, criterion)?;
        if value > floor {
            let argument = Argument::pro(item.clone())
                .with_couple(criterion.clone(), value)
                .with_comparison(cited.clone(), criterion.clone());
            if let Some(rebuttal) = unused(argument, RebuttalKind::CounterSupport, used) {
                return Ok(Some(rebuttal));
            }
        }
    }
    Ok(None)
}

fn worst_rating(table: &PreferenceTable, criterion: &Criterion) -> PreferenceResult<Value> {
    let mut worst = Value::VeryGood;
    for item in table.items() {
        worst = worst.min(table.value_of(item, criterion)?);
    }
    Ok(worst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str) -> Criterion {
        Criterion::new(name)
    }

    fn cars() -> (Item, Item, Item) {
        (Item::named("E"), Item::named("ICED"), Item::named("HYBRID"))
    }

    /// Ranking: cost > environment > consumption > noise
    fn table() -> PreferenceTable {
        let (e, iced, hybrid) = cars();
        PreferenceTable::builder(["cost", "environment", "consumption", "noise"])
            .rate_all(&e, &[Value::Bad, Value::VeryGood, Value::VeryGood, Value::VeryGood])
            .rate_all(&iced, &[Value::VeryGood, Value::VeryBad, Value::Average, Value::Bad])
            .rate_all(&hybrid, &[Value::Good, Value::Good, Value::Good, Value::Average])
            .build()
            .unwrap()
    }

    #[test]
    fn test_supporting_premises_sorted_by_value_then_rank() {
        let table = table();
        let (e, _, hybrid) = cars();
        let premises = supporting_premises(&table, &e).unwrap();
        let names: Vec<_> = premises.iter().map(|p| p.criterion.name()).collect();
        assert_eq!(names, vec!["environment", "consumption", "noise"]);

        let premises = supporting_premises(&table, &hybrid).unwrap();
        let names: Vec<_> = premises.iter().map(|p| p.criterion.name()).collect();
        assert_eq!(names, vec!["cost", "environment", "consumption"]);
    }

    #[test]
    fn test_attacking_premises() {
        let table = table();
        let (_, iced, _) = cars();
        let premises = attacking_premises(&table, &iced).unwrap();
        assert_eq!(
            premises,
            vec![
                CoupleValue::new(c("consumption"), Value::Average),
                CoupleValue::new(c("noise"), Value::Bad),
                CoupleValue::new(c("environment"), Value::VeryBad),
            ]
        );
    }

    #[test]
    fn test_best_support_skips_used() {
        let table = table();
        let (_, _, hybrid) = cars();
        let mut used = ArgumentLog::new();

        let first = best_support(&table, &hybrid, &used).unwrap().unwrap();
        assert!(first.is_pro());
        assert_eq!(first.couple_premises, vec![CoupleValue::new(c("cost"), Value::Good)]);

        // Any argument about the same item is equivalent, so support runs dry.
        used.record(first);
        assert_eq!(best_support(&table, &hybrid, &used).unwrap(), None);
    }

    #[test]
    fn test_best_support_none_without_good_ratings() {
        let (a, b) = (Item::named("A"), Item::named("B"));
        let table = PreferenceTable::builder(["cost"])
            .rate(&a, "cost", Value::Bad)
            .rate(&b, "cost", Value::Good)
            .build()
            .unwrap();
        assert_eq!(best_support(&table, &a, &ArgumentLog::new()).unwrap(), None);
    }

    #[test]
    fn test_rebut_pro_with_more_important_bad_criterion() {
        let table = table();
        let (e, _, _) = cars();
        // Opponent: "E is great on noise". I rank cost first and E is bad on cost.
        let opposing = Argument::pro(e.clone()).with_couple(c("noise"), Value::VeryGood);
        let rebuttal = rebut(&table, &opposing, &ArgumentLog::new()).unwrap().unwrap();

        assert_eq!(rebuttal.kind, RebuttalKind::MoreImportantCriterionBad);
        assert_eq!(rebuttal.argument.polarity, Polarity::Con);
        assert_eq!(rebuttal.argument.item, e);
        assert_eq!(
            rebuttal.argument.couple_premises,
            vec![CoupleValue::new(c("cost"), Value::Bad)]
        );
        assert_eq!(rebuttal.argument.comparison_premises[0].less_important, c("noise"));
        assert_eq!(rebuttal.argument.comparison_premises[0].more_important, c("cost"));
    }

    #[test]
    fn test_rebut_pro_with_weak_claim() {
        let table = table();
        let (_, iced, hybrid) = cars();
        // Opponent: "ICED is good on cost" -- cost is my top criterion, so
        // (1) has nothing above it; the claim is not below average, so (2)
        // fails; no item beats VeryGood on cost, so (3) fails too.
        let on_cost = Argument::pro(iced.clone()).with_couple(c("cost"), Value::Good);
        assert_eq!(rebut(&table, &on_cost, &ArgumentLog::new()).unwrap(), None);

        // Opponent backs HYBRID with a VeryBad rating on noise; nothing above
        // noise is bad for HYBRID and I rate it Average there, so the claim
        // is below min(Average, Average).
        let weak = Argument::pro(hybrid.clone()).with_couple(c("noise"), Value::VeryBad);
        let rebuttal = rebut(&table, &weak, &ArgumentLog::new()).unwrap().unwrap();
        assert_eq!(rebuttal.kind, RebuttalKind::CriterionBad);
        assert_eq!(rebuttal.argument.item, hybrid);
        assert_eq!(
            rebuttal.argument.couple_premises,
            vec![CoupleValue::new(c("noise"), Value::Average)]
        );
        assert!(rebuttal.argument.comparison_premises.is_empty());
    }

    #[test]
    fn test_criterion_bad_compares_claim_with_own_rating() {
        let (a, b) = (Item::named("A"), Item::named("B"));
        let table = PreferenceTable::builder(["cost", "noise"])
            .rate_all(&a, &[Value::Good, Value::Good])
            .rate_all(&b, &[Value::Bad, Value::Bad])
            .build()
            .unwrap();

        // Claim below both my rating and AVERAGE: con A carrying my rating.
        let low = Argument::pro(a.clone()).with_couple(c("cost"), Value::Bad);
        let rebuttal = rebut(&table, &low, &ArgumentLog::new()).unwrap().unwrap();
        assert_eq!(rebuttal.kind, RebuttalKind::CriterionBad);
        assert_eq!(rebuttal.argument.item, a);
        assert!(!rebuttal.argument.is_pro());
        assert_eq!(
            rebuttal.argument.couple_premises,
            vec![CoupleValue::new(c("cost"), Value::Good)]
        );

        // A glowing claim about B does not fire (2), even though I rate B Bad.
        let high = Argument::pro(b.clone()).with_couple(c("cost"), Value::VeryGood);
        let rebuttal = rebut(&table, &high, &ArgumentLog::new()).unwrap().unwrap();
        assert_eq!(rebuttal.kind, RebuttalKind::BetterAlternative);
        assert_eq!(rebuttal.argument.item, a);
        assert_eq!(rebut_among(&table, &high, &ArgumentLog::new(), &[]).unwrap(), None);
    }

    #[test]
    fn test_rebut_pro_with_better_alternative() {
        let table = table();
        let (e, _, hybrid) = cars();
        // HYBRID on consumption: nothing above is bad, my own rating (Good)
        // is not bad, but E is VeryGood on consumption.
        let opposing = Argument::pro(hybrid.clone()).with_couple(c("consumption"), Value::Good);
        let rebuttal = rebut(&table, &opposing, &ArgumentLog::new()).unwrap().unwrap();

        assert_eq!(rebuttal.kind, RebuttalKind::BetterAlternative);
        assert!(rebuttal.targets_other_item(&hybrid));
        assert_eq!(rebuttal.argument.item, e);
        assert!(rebuttal.argument.is_pro());
    }

    #[test]
    fn test_rebut_respects_alternative_list() {
        let table = table();
        let (_, _, hybrid) = cars();
        let opposing = Argument::pro(hybrid.clone()).with_couple(c("consumption"), Value::Good);
        let rebuttal =
            rebut_among(&table, &opposing, &ArgumentLog::new(), &[hybrid.clone()]).unwrap();
        assert_eq!(rebuttal, None);
    }

    #[test]
    fn test_rebut_skips_used_arguments() {
        let table = table();
        let (e, _, _) = cars();
        let opposing = Argument::pro(e.clone()).with_couple(c("noise"), Value::VeryGood);
        let mut used = ArgumentLog::new();
        used.record(Argument::con(e.clone()).with_couple(c("cost"), Value::Bad));

        // Every argument about E is now used; no alternative beats E on noise.
        assert_eq!(rebut(&table, &opposing, &used).unwrap(), None);
    }

    #[test]
    fn test_rebut_con_with_counter_support() {
        let table = table();
        let (e, _, _) = cars();
        // Opponent: "E is bad on cost". E shines on environment.
        let opposing = Argument::con(e.clone()).with_couple(c("cost"), Value::Bad);
        let rebuttal = rebut(&table, &opposing, &ArgumentLog::new()).unwrap().unwrap();

        assert_eq!(rebuttal.kind, RebuttalKind::CounterSupport);
        assert!(rebuttal.argument.is_pro());
        assert_eq!(rebuttal.argument.item, e);
        assert_eq!(
            rebuttal.argument.couple_premises,
            vec![CoupleValue::new(c("environment"), Value::VeryGood)]
        );
        assert_eq!(rebuttal.argument.comparison_premises[0].less_important, c("cost"));
    }

    #[test]
    fn test_rebut_con_none_when_item_is_floor_everywhere() {
        let (a, b) = (Item::named("A"), Item::named("B"));
        let table = PreferenceTable::builder(["cost", "noise"])
            .rate_all(&a, &[Value::VeryBad, Value::VeryBad])
            .rate_all(&b, &[Value::Good, Value::Good])
            .build()
            .unwrap();
        let opposing = Argument::con(a).with_couple(c("cost"), Value::VeryBad);
        assert_eq!(rebut(&table, &opposing, &ArgumentLog::new()).unwrap(), None);
    }

    #[test]
    fn test_rebut_scans_every_premise() {
        let table = table();
        let (_, iced, _) = cars();
        // First premise yields nothing (see above); on the second one E
        // beats ICED on environment.
        let opposing = Argument::pro(iced)
            .with_couple(c("cost"), Value::Good)
            .with_couple(c("environment"), Value::Good);
        let rebuttal = rebut(&table, &opposing, &ArgumentLog::new()).unwrap().unwrap();
        assert_eq!(rebuttal.kind, RebuttalKind::BetterAlternative);
        assert_eq!(rebuttal.argument.item, Item::named("E"));
        assert_eq!(
            rebuttal.argument.couple_premises,
            vec![CoupleValue::new(c("environment"), Value::VeryGood)]
        );
    }

    #[test]
    fn test_rebut_unknown_item_or_criterion() {
        let table = table();
        let foreign = Argument::pro(Item::named("BIKE")).with_couple(c("cost"), Value::Good);
        assert_eq!(rebut(&table, &foreign, &ArgumentLog::new()).unwrap(), None);

        let (e, _, _) = cars();
        let odd = Argument::pro(e).with_couple(c("color"), Value::Good);
        assert_eq!(rebut(&table, &odd, &ArgumentLog::new()).unwrap(), None);
    }
}
