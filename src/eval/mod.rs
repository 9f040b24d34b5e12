//! Criterion evaluation and completion aggregation.
//!
//! One pass walks the tree depth-first against a single [`EvalContext`]
//! snapshot; nothing is cached between passes.
//!
//! [`EvalContext`]: crate::telemetry::EvalContext

mod aggregator;
mod evaluator;

pub use aggregator::*;
pub use evaluator::*;
