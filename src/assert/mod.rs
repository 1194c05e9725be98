// Assertion module

pub mod comparator;
pub mod diff;
pub mod engine;

pub use comparator::JsonComparator;
pub use diff::get_json_diff;
pub use engine::{AssertionEngine, AssertionResult};
