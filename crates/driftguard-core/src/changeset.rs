//! Outcome records of a drift evaluation

use serde::Serialize;
use std::fmt;

use crate::object::{ObjectRef, StructuredObject};

/// Line reported when drift was detected only in fields the diff hides
pub const HIDDEN_DRIFT_NOTE: &str = "# drift detected in fields hidden from the rendered diff\n";

/// What applying an object would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Configured,
    Unchanged,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Configured => write!(f, "configured"),
            Action::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Outcome for a single object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSetEntry {
    pub subject: ObjectRef,
    pub action: Action,
    /// Unified diff, present only for configured objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ChangeSetEntry {
    pub fn created(object: &StructuredObject) -> Self {
        Self {
            subject: object.object_ref(),
            action: Action::Created,
            diff: None,
        }
    }

    pub fn unchanged(object: &StructuredObject) -> Self {
        Self {
            subject: object.object_ref(),
            action: Action::Unchanged,
            diff: None,
        }
    }

    /// A configured entry always carries a non-empty diff
    pub fn configured(object: &StructuredObject, diff: String) -> Self {
        let diff = if diff.is_empty() {
            HIDDEN_DRIFT_NOTE.to_string()
        } else {
            diff
        };
        Self {
            subject: object.object_ref(),
            action: Action::Configured,
            diff: Some(diff),
        }
    }

    pub fn is_change(&self) -> bool {
        self.action != Action::Unchanged
    }
}

impl fmt::Display for ChangeSetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.action)
    }
}

/// Ordered outcomes for a batch of objects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: ChangeSetEntry) {
        self.entries.push(entry);
    }

    pub fn append(&mut self, other: ChangeSet) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeSetEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with the given action, in insertion order
    pub fn by_action(&self, action: Action) -> impl Iterator<Item = &ChangeSetEntry> {
        self.entries.iter().filter(move |e| e.action == action)
    }

    /// True if any object would be created or configured
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(ChangeSetEntry::is_change)
    }

    /// One-line summary, e.g. "1 created, 2 configured"
    pub fn summary(&self) -> String {
        let parts: Vec<String> = [Action::Created, Action::Configured, Action::Unchanged]
            .into_iter()
            .filter_map(|action| {
                let count = self.by_action(action).count();
                (count > 0).then(|| format!("{} {}", count, action))
            })
            .collect();

        if parts.is_empty() || !self.has_changes() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl FromIterator<ChangeSetEntry> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ChangeSetEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeSetEntry;
    type IntoIter = std::slice::Iter<'a, ChangeSetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
