//! Property tests over randomly generated preferences and arguments.
//!
//! Tests verify:
//! - Scores are total and a full top fraction holds every item
//! - Argument equivalence is reflexive and symmetric
//! - The argument log never holds two equivalent arguments
//! - Thresholds only grow and stop at 100%
//! - Pairwise negotiations terminate on a single committed item
//! - Fan-out negotiations with one initiator terminate the same way

use negotiation::agent::{AcceptanceThreshold, StateKind};
use negotiation::argument::{Argument, ArgumentLog, Polarity};
use negotiation::preferences::generate_random;
use negotiation::{
    run_pair, Coordinator, Criterion, Item, NegotiationConfig, Scenario, Value,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const CRITERIA: [&str; 3] = ["cost", "noise", "durability"];
const ITEMS: [&str; 3] = ["E", "ICED", "HYBRID"];

fn vocabulary(items: usize, criteria: usize) -> (Vec<Item>, Vec<Criterion>) {
    let items = (0..items).map(|i| Item::named(format!("item{i}"))).collect();
    let criteria = (0..criteria).map(|c| Criterion::new(format!("c{c}"))).collect();
    (items, criteria)
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop::sample::select(Value::ALL.to_vec())
}

fn arb_argument() -> impl Strategy<Value = Argument> {
    (
        any::<bool>(),
        0..ITEMS.len(),
        prop::collection::vec((0..CRITERIA.len(), arb_value()), 0..3),
        prop::collection::vec((0..CRITERIA.len(), 0..CRITERIA.len()), 0..2),
    )
        .prop_map(|(pro, item, couples, comparisons)| {
            let polarity = if pro { Polarity::Pro } else { Polarity::Con };
            let mut argument = Argument::new(polarity, Item::named(ITEMS[item]));
            for (criterion, value) in couples {
                argument = argument.with_couple(CRITERIA[criterion].into(), value);
            }
            for (less, more) in comparisons {
                argument = argument.with_comparison(CRITERIA[less].into(), CRITERIA[more].into());
            }
            argument
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn score_is_total_and_full_fraction_holds_everything(
        seed in any::<u64>(),
        item_count in 1usize..7,
        criterion_count in 1usize..6,
    ) {
        let (items, criteria) = vocabulary(item_count, criterion_count);
        let table = generate_random(&items, &criteria, &mut StdRng::seed_from_u64(seed)).unwrap();

        let max = (Value::VeryGood.ordinal() as usize * criterion_count * (criterion_count + 1) / 2) as u32;
        for item in &items {
            let score = table.score(item).unwrap();
            prop_assert!(score <= max);
            prop_assert!(table.is_within_top_fraction(item, &items, 1.0).unwrap());
        }
    }

    #[test]
    fn equivalence_is_reflexive_and_symmetric(a in arb_argument(), b in arb_argument()) {
        prop_assert!(a.is_equivalent(&a));
        prop_assert_eq!(a.is_equivalent(&b), b.is_equivalent(&a));
    }

    #[test]
    fn log_never_holds_equivalent_arguments(arguments in prop::collection::vec(arb_argument(), 0..12)) {
        let mut log = ArgumentLog::new();
        for argument in arguments {
            log.record(argument);
        }
        let entries: Vec<_> = log.iter().collect();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                prop_assert!(!a.is_equivalent(b));
            }
        }
    }

    #[test]
    fn threshold_is_monotone_and_capped(initial in 1u32..=100, increment in 1u32..=100) {
        let mut threshold = AcceptanceThreshold::new(initial, increment);
        let mut previous = threshold.percent();
        let steps_to_full = (100 - initial).div_ceil(increment);
        for step in 1..=steps_to_full + 2 {
            threshold.widen();
            prop_assert!(threshold.percent() >= previous);
            prop_assert!(threshold.percent() <= 100);
            if step >= steps_to_full {
                prop_assert!(threshold.is_full());
            }
            previous = threshold.percent();
        }
    }

    #[test]
    fn pairs_terminate_on_one_item(seed in any::<u64>(), presidential in any::<bool>()) {
        let scenario = if presidential { Scenario::presidential() } else { Scenario::cars() };
        let config = NegotiationConfig { seed: Some(seed), max_rounds: 400, ..Default::default() };
        let mut rng = config.rng();
        let mut participants = scenario.random_participants(2, &mut rng).unwrap();
        let second = participants.pop().unwrap();
        let first = participants.pop().unwrap();

        let report = run_pair(first, second, &config, config.max_rounds).unwrap();
        prop_assert!(report.rounds <= config.max_rounds);

        let (item, _) = report.agreement().expect("finite item set converges");
        prop_assert!(report.agents.iter().all(|agent| agent.state == StateKind::Finished));

        let commits: Vec<_> = report
            .transcript
            .iter()
            .filter(|m| m.performative == negotiation::Performative::Commit)
            .collect();
        prop_assert_eq!(commits.len(), 2);
        prop_assert!(commits.iter().all(|m| m.item() == Some(item)));
    }

    #[test]
    fn fan_out_terminates_on_one_item(
        seed in any::<u64>(),
        presidential in any::<bool>(),
        agents in 3usize..=5,
    ) {
        let scenario = if presidential { Scenario::presidential() } else { Scenario::cars() };
        let config = NegotiationConfig { seed: Some(seed), max_rounds: 400, ..Default::default() };
        let mut rng = config.rng();
        let participants = scenario.random_participants(agents, &mut rng).unwrap();

        let report = Coordinator::with_rng(participants, &config, &mut rng)
            .unwrap()
            .run(config.max_rounds);
        prop_assert!(report.is_ok(), "seed {}: {:?}", seed, report.as_ref().err());
        let report = report.unwrap();

        let (item, winner) = report.agreement().expect("finite item set converges");
        prop_assert_eq!(winner.as_str(), "agent1");
        prop_assert!(report.agents.iter().all(|agent| agent.state == StateKind::Finished));

        let commits: Vec<_> = report
            .transcript
            .iter()
            .filter(|m| m.performative == negotiation::Performative::Commit)
            .collect();
        prop_assert_eq!(commits.len(), 2 * (agents - 1));
        prop_assert!(commits.iter().all(|m| m.item() == Some(item)));
        prop_assert!(report
            .transcript
            .iter()
            .filter(|m| m.performative == negotiation::Performative::Propose)
            .all(|m| m.sender.as_str() == "agent1"));
    }
}
