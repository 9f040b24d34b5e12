use std::collections::BTreeMap;

use super::criterion::{Criterion, CriterionKind};

/// A single checklist item.
///
/// The criterion is private so that the `locked` flag can be enforced: while a
/// record is locked, [`StepRecord::criterion_mut`], [`StepRecord::set_criterion`]
/// and [`StepRecord::set_kind`] refuse to change anything. The `completed` flag is
/// not covered by the lock, the aggregator still stamps it.
///
/// Switching kinds stashes the outgoing criterion so that switching back
/// restores what the operator had entered.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub locked: bool,
    /// Inactive records still pass or fail but are never marked complete.
    pub active: bool,
    criterion: Criterion,
    stash: BTreeMap<CriterionKind, Criterion>,
}

impl Default for StepRecord {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            completed: false,
            locked: false,
            active: true,
            criterion: Criterion::Unconditional,
            stash: BTreeMap::new(),
        }
    }
}

impl StepRecord {
    pub fn new(title: impl Into<String>, criterion: Criterion) -> Self {
        Self {
            title: title.into(),
            criterion,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> CriterionKind {
        self.criterion.kind()
    }

    pub fn criterion(&self) -> &Criterion {
        &self.criterion
    }

    /// Mutable access to the criterion, `None` while locked.
    pub fn criterion_mut(&mut self) -> Option<&mut Criterion> {
        if self.locked {
            return None;
        }
        Some(&mut self.criterion)
    }

    /// Replace the criterion. The outgoing one is stashed if its kind differs.
    pub fn set_criterion(&mut self, criterion: Criterion) -> bool {
        if self.locked {
            return false;
        }
        let previous = std::mem::replace(&mut self.criterion, criterion);
        if previous.kind() != self.criterion.kind() {
            self.stash.remove(&self.criterion.kind());
            self.stash.insert(previous.kind(), previous);
        }
        true
    }

    /// Switch to another kind, restoring previously entered values for it.
    pub fn set_kind(&mut self, kind: CriterionKind) -> bool {
        if self.locked {
            return false;
        }
        if kind == self.kind() {
            return true;
        }
        let incoming = self
            .stash
            .remove(&kind)
            .unwrap_or_else(|| Criterion::default_for(kind));
        let outgoing = std::mem::replace(&mut self.criterion, incoming);
        self.stash.insert(outgoing.kind(), outgoing);
        true
    }

    /// Criteria entered for other kinds, ordered by kind.
    pub fn stashed(&self) -> impl Iterator<Item = &Criterion> {
        self.stash.values()
    }

    /// Restore a stashed criterion while decoding. Entries for the active kind
    /// are dropped.
    pub(crate) fn restore_stashed(&mut self, criterion: Criterion) {
        if criterion.kind() != self.kind() {
            self.stash.insert(criterion.kind(), criterion);
        }
    }
}

/// How a node combines its children's results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationMode {
    /// Every child must pass.
    #[default]
    RequireAll,
    /// At least one child must pass.
    RequireAny,
}

impl AggregationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequireAll => "all",
            Self::RequireAny => "any",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::RequireAll),
            "any" => Some(Self::RequireAny),
            _ => None,
        }
    }
}
