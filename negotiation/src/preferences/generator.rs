//! Random preference tables for simulations.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use super::table::{PreferenceResult, PreferenceTable};
use super::value::{Criterion, Item, Value};

/// Draw a random table: the criterion ranking is a uniform shuffle and each
/// (item, criterion) rating is uniform over the five grades.
pub fn generate_random<R: Rng + ?Sized>(
    items: &[Item],
    criteria: &[Criterion],
    rng: &mut R,
) -> PreferenceResult<PreferenceTable> {
    let mut ranking = criteria.to_vec();
    ranking.shuffle(rng);

    let mut builder = PreferenceTable::builder(ranking.clone());
    for item in items {
        builder = builder.item(item);
        for criterion in &ranking {
            let value = *Value::ALL.choose(rng).unwrap_or(&Value::Average);
            builder = builder.rate(item, criterion.clone(), value);
        }
    }
    builder.build()
}
