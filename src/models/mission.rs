use chrono::{DateTime, Utc};

use super::tree::StepTree;

/// A named checklist: the unit that is saved to and loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct Mission {
    pub name: String,
    /// Free-text summary shown in listings.
    pub summary: String,
    /// When the mission was last written successfully.
    pub saved_at: Option<DateTime<Utc>>,
    pub steps: StepTree,
}

impl Mission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Compare everything except `saved_at` and node ids.
    pub fn content_eq(&self, other: &Mission) -> bool {
        self.name == other.name
            && self.summary == other.summary
            && self.steps.structurally_eq(&other.steps)
    }
}
