//! The revision log a document sits on. Revision `r` is the state after `r`
//! changes; the change stored at index `i` is based on revision `i` and
//! produces revision `i + 1`.

use crate::delta::{change::Change, compose::flatten_two};
use crate::shared_string::SharedString;

/// Branch label under which already-stored changes are replayed during a
/// merge. Sorts before user branches, so the server side wins same-position
/// insert ties.
pub const SERVER_BRANCH: &str = "$server$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Revision after the merge.
    pub rev: usize,
    /// The incoming changes, rebased over the concurrent tail.
    pub changes: Vec<Change>,
}

/// The revision log contract a `Document` orchestrates against.
pub trait History {
    /// Appends changes based on the current revision; returns the new one.
    fn append(&mut self, changes: Vec<Change>) -> usize;

    /// Merges changes a client authored against `base_rev` while other
    /// changes were being stored: the incoming changes are rebased over the
    /// concurrent tail and appended.
    fn merge(&mut self, base_rev: usize, branch: &str, changes: Vec<Change>) -> MergeResult;

    fn get_content(&self) -> Change;

    fn get_content_at(&self, rev: usize) -> Change;

    /// The change that produced `rev`, if any.
    fn get_change(&self, rev: usize) -> Option<Change>;

    /// Changes based on revisions `rev..`.
    fn get_changes_from(&self, rev: usize) -> Vec<Change>;

    /// Changes based on revisions `from..=to`.
    fn get_changes_from_to(&self, from: usize, to: usize) -> Vec<Change>;

    fn current_rev(&self) -> usize;
}

/// The in-memory reference history: an initial content plus an append-only
/// change log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryHistory {
    name: String,
    initial: Change,
    changes: Vec<Change>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new(name: &str, initial: Change) -> Self {
        MemoryHistory {
            name: name.to_owned(),
            initial,
            changes: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }
}

impl History for MemoryHistory {
    fn append(&mut self, changes: Vec<Change>) -> usize {
        self.changes.extend(changes);
        self.current_rev()
    }

    fn merge(&mut self, base_rev: usize, branch: &str, changes: Vec<Change>) -> MergeResult {
        debug_assert!(base_rev <= self.current_rev(), "merge base {base_rev} ahead");

        let mut ss = SharedString::from_content(&self.get_content_at(base_rev));
        for stored in &self.changes[base_rev..] {
            ss.apply_change(stored, SERVER_BRANCH);
        }

        let rebased: Vec<Change> = changes
            .iter()
            .map(|change| ss.apply_change(change, branch))
            .collect();
        self.changes.extend(rebased.clone());

        MergeResult {
            rev: self.current_rev(),
            changes: rebased,
        }
    }

    fn get_content(&self) -> Change { self.get_content_at(self.current_rev()) }

    fn get_content_at(&self, rev: usize) -> Change {
        debug_assert!(rev <= self.current_rev(), "unknown revision {rev}");

        self.changes[..rev.min(self.changes.len())]
            .iter()
            .fold(self.initial.clone(), |content, change| {
                flatten_two(&content, change)
            })
    }

    fn get_change(&self, rev: usize) -> Option<Change> {
        rev.checked_sub(1)
            .and_then(|index| self.changes.get(index))
            .cloned()
    }

    fn get_changes_from(&self, rev: usize) -> Vec<Change> {
        self.changes
            .get(rev.min(self.changes.len())..)
            .map_or_else(Vec::new, <[Change]>::to_vec)
    }

    fn get_changes_from_to(&self, from: usize, to: usize) -> Vec<Change> {
        let end = (to + 1).min(self.changes.len());
        let start = from.min(end);
        self.changes[start..end].to_vec()
    }

    fn current_rev(&self) -> usize { self.changes.len() }
}
