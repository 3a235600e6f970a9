//! Arguments: data model, the engine that builds and rebuts them, and the
//! per-agent log of arguments already used.

pub mod engine;
pub mod log;
pub mod model;

pub use engine::{
    attacking_premises, best_support, rebut, rebut_among, supporting_premises, Rebuttal,
    RebuttalKind,
};
pub use log::ArgumentLog;
pub use model::{Argument, Comparison, CoupleValue, Polarity};
