//! Sync pass outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts produced by one sync pass plus its per-item errors
///
/// `added + updated + removed` is not the item count: unchanged items are
/// not counted. Every message in `errors` belongs to an item that was
/// neither added, updated nor removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub added: u32,
    pub updated: u32,
    pub removed: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SyncOutcome {
    pub fn new(added: u32, updated: u32, removed: u32) -> Self {
        Self {
            added,
            updated,
            removed,
            errors: Vec::new(),
        }
    }

    /// Append a per-item error message
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn total_changes(&self) -> u32 {
        self.added + self.updated + self.removed
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Nothing changed and nothing failed
    pub fn is_noop(&self) -> bool {
        self.total_changes() == 0 && !self.has_errors()
    }

    /// Fold another pass into this one, keeping error order
    pub fn absorb(&mut self, other: SyncOutcome) {
        self.added += other.added;
        self.updated += other.updated;
        self.removed += other.removed;
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{} ({} errors)",
            self.added,
            self.updated,
            self.removed,
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_sums_counts_and_keeps_error_order() {
        let mut total = SyncOutcome::new(2, 0, 1);
        total.push_error("a: missing name");

        let mut other = SyncOutcome::new(1, 3, 0);
        other.push_error("b: wrong kind");
        total.absorb(other);

        assert_eq!(total.added, 3);
        assert_eq!(total.updated, 3);
        assert_eq!(total.removed, 1);
        assert_eq!(total.total_changes(), 7);
        assert_eq!(total.errors, vec!["a: missing name", "b: wrong kind"]);
    }

    #[test]
    fn test_noop() {
        assert!(SyncOutcome::default().is_noop());
        let mut failed = SyncOutcome::default();
        failed.push_error("x");
        assert!(!failed.is_noop());
        assert_eq!(failed.to_string(), "+0 ~0 -0 (1 errors)");
    }
}
