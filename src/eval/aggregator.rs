use crate::models::{AggregationMode, NodeId, StepRecord, StepTree};
use crate::telemetry::EvalContext;

use super::evaluator::evaluate;

/// Counts from one evaluation pass over a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Nodes whose own criterion was evaluated.
    pub evaluated: usize,
    /// Roots whose aggregate result was true.
    pub roots_satisfied: usize,
    /// Nodes marked complete after the pass.
    pub completed: usize,
    pub total: usize,
}

/// Aggregate one node against `ctx`. See [`aggregate_with`].
pub fn aggregate(tree: &mut StepTree, id: NodeId, ctx: &EvalContext<'_>) -> bool {
    aggregate_with(tree, id, &mut |record| evaluate(record, ctx))
}

/// Combine a node's own result with its children's and stamp completion.
///
/// A failing own check returns false at once and leaves `completed` alone. A
/// passing one recurses into the children in document order: `RequireAll` stops
/// at the first failing child, `RequireAny` visits every child once and needs at
/// least one to pass (so it fails without children). On success an active
/// record is marked complete. Completion is only ever set here, never cleared.
pub fn aggregate_with<F>(tree: &mut StepTree, id: NodeId, eval: &mut F) -> bool
where
    F: FnMut(&StepRecord) -> bool,
{
    let Some(node) = tree.get(id) else {
        return false;
    };
    if !eval(&node.record) {
        return false;
    }
    let mode = node.mode;
    let children = node.children().to_vec();

    let combined = match mode {
        AggregationMode::RequireAll => {
            for child in children {
                if !aggregate_with(tree, child, eval) {
                    return false;
                }
            }
            true
        }
        AggregationMode::RequireAny => {
            let mut any = false;
            for child in children {
                if aggregate_with(tree, child, eval) {
                    any = true;
                }
            }
            any
        }
    };
    if !combined {
        return false;
    }

    if let Some(record) = tree.record_mut(id) {
        if record.active {
            record.completed = true;
        }
    }
    true
}

/// Run one pass over every root in order.
pub fn aggregate_all(tree: &mut StepTree, ctx: &EvalContext<'_>) -> PassReport {
    let mut evaluated = 0;
    let mut eval = |record: &StepRecord| {
        evaluated += 1;
        evaluate(record, ctx)
    };

    let roots = tree.roots().to_vec();
    let mut roots_satisfied = 0;
    for root in roots {
        if aggregate_with(tree, root, &mut eval) {
            roots_satisfied += 1;
        }
    }

    let report = PassReport {
        evaluated,
        roots_satisfied,
        completed: tree
            .depth_first()
            .into_iter()
            .filter(|&id| tree.record(id).is_some_and(|r| r.completed))
            .count(),
        total: tree.len(),
    };
    tracing::debug!(
        evaluated = report.evaluated,
        roots_satisfied = report.roots_satisfied,
        completed = report.completed,
        total = report.total,
        "Evaluation pass finished"
    );
    report
}
