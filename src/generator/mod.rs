//! Prediction producers.
//!
//! - `catalog`: immutable tables shared by everything that needs random picks.
//! - `synthetic`: records built from the catalog alone.
//! - `live`: records extracted from text-generation answers.

pub mod catalog;
pub mod live;
pub mod synthetic;

pub use catalog::Catalog;
pub use live::{LiveGenerator, LiveSettings};
pub use synthetic::SyntheticGenerator;
