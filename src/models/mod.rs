//! Domain models for mission checklists.
//!
//! # Core Concepts
//!
//! - [`Criterion`]: the typed condition a step checks, one variant per
//!   [`CriterionKind`], each carrying only its own parameters.
//! - [`StepRecord`]: one checklist item: a criterion plus title, description and
//!   the `completed` / `locked` / `active` flags.
//! - [`StepTree`]: an ordered forest of [`StepNode`]s stored as an arena and
//!   addressed by [`NodeId`]. Each node has an [`AggregationMode`] deciding how its
//!   children's results combine.
//! - [`Mission`]: name, summary and step tree; the unit of persistence.

mod criterion;
mod mission;
mod step;
mod tree;

pub use criterion::*;
pub use mission::*;
pub use step::*;
pub use tree::*;
