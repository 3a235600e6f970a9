//! Preference model: ordinal values, criteria, items and per-agent tables.

pub mod generator;
pub mod table;
pub mod value;

pub use generator::generate_random;
pub use table::{top_count, PreferenceError, PreferenceResult, PreferenceTable, PreferenceTableBuilder};
pub use value::{Criterion, Item, Value};
