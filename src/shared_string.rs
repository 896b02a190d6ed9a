//! A branch-aware string of fragments. Concurrent branches apply their
//! changes against the content *they* saw; the string keeps tombstones and
//! unseen inserts around so that every change can be rebased onto the
//! current live content, in any arrival order, with a convergent result.

pub mod fragment;

use crate::delta::{
    attributes::apply_attributes,
    change::Change,
    normalize::normalize_ops,
    op::Op,
};

pub use fragment::{Branch, Fragment};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedString {
    fragments: Vec<Fragment>,
}

impl SharedString {
    #[must_use]
    pub fn from_string(text: &str) -> Self {
        if text.is_empty() {
            SharedString::default()
        } else {
            SharedString {
                fragments: vec![Fragment::initial(text, None)],
            }
        }
    }

    /// Builds the string from a content; every insert becomes an initial
    /// fragment.
    #[must_use]
    pub fn from_content(content: &Change) -> Self {
        SharedString {
            fragments: content
                .ops
                .iter()
                .filter_map(|op| match op {
                    Op::Insert { value, attributes } => {
                        Some(Fragment::initial(value.clone(), attributes.clone()))
                    }
                    Op::Retain { .. } | Op::Delete { .. } => None,
                })
                .collect(),
        }
    }

    /// Applies a change expressed against `branch`'s view of the string and
    /// returns the same change rebased onto the current live content.
    ///
    /// The offsets of `change` count only fragments visible to `branch`:
    /// its own inserts, the initial content, and anything it has not itself
    /// deleted. Fragments invisible to the branch are skipped over, but
    /// still occupy live-content coordinates, which is where the rebased
    /// retains come from. Deleting an already-dead fragment is absorbed.
    pub fn apply_change(&mut self, change: &Change, branch: &str) -> Change {
        let mut walker = Walker::new(std::mem::take(&mut self.fragments), branch);

        for op in &change.ops {
            match op {
                Op::Retain { length, attributes } => {
                    let mut remaining = *length;
                    while remaining > 0 {
                        let Some(visible_len) = walker.skip_invisible() else {
                            walker.rebased.push(Op::retain(remaining));
                            break;
                        };

                        let taken = walker.take(remaining.min(visible_len));
                        let alive = taken.is_alive();
                        let length = taken.len();
                        remaining -= length;

                        let mut kept = taken;
                        if let Some(attributes) = attributes {
                            kept.attributes =
                                apply_attributes(kept.attributes.as_ref(), attributes);
                        }
                        walker.kept.push(kept);

                        if alive {
                            walker.rebased.push(match attributes {
                                Some(attributes) => Op::retain_attr(length, attributes.clone()),
                                None => Op::retain(length),
                            });
                        }
                    }
                }

                Op::Delete { length } => {
                    let mut remaining = *length;
                    while remaining > 0 {
                        let Some(visible_len) = walker.skip_invisible() else {
                            break;
                        };

                        let mut taken = walker.take(remaining.min(visible_len));
                        let was_alive = taken.is_alive();
                        let length = taken.len();
                        remaining -= length;

                        taken.deleted_by.insert(branch.to_owned());
                        walker.kept.push(taken);

                        if was_alive {
                            walker.rebased.push(Op::delete(length));
                        }
                    }
                }

                Op::Insert { value, attributes } => {
                    // same-position inserts of different branches are kept
                    // in branch-label order, whichever arrives first
                    walker.skip_foreign_before(branch);
                    walker.kept.push(Fragment {
                        value: value.clone(),
                        attributes: attributes.clone(),
                        inserted_by: Some(branch.to_owned()),
                        deleted_by: Default::default(),
                    });
                    walker.rebased.push(op.clone());
                }
            }
        }

        let (fragments, rebased) = walker.finish();
        self.fragments = fragments;

        Change {
            ops: normalize_ops(rebased),
            source: change.source.clone(),
        }
    }

    /// The live content, normalized.
    #[must_use]
    pub fn to_delta(&self) -> Change {
        Change {
            ops: normalize_ops(
                self.fragments
                    .iter()
                    .filter(|fragment| fragment.is_alive() && !fragment.is_empty())
                    .map(Fragment::to_op)
                    .collect(),
            ),
            source: None,
        }
    }

    /// Every fragment projected as an insert, tombstones included.
    #[must_use]
    pub fn to_flattened_delta(&self) -> Change {
        Change {
            ops: self.fragments.iter().map(Fragment::to_op).collect(),
            source: None,
        }
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        self.fragments
            .iter()
            .filter(|fragment| fragment.is_alive())
            .map(Fragment::to_text)
            .collect()
    }

    #[must_use]
    pub fn fragments(&self) -> &[Fragment] { &self.fragments }
}

/// Cursor over the old fragment list: hands out visible slices for the
/// branch, passes invisible fragments through, and collects the new
/// fragment list and the rebased op stream.
struct Walker<'a> {
    old: Vec<Fragment>,
    index: usize,
    offset: usize,
    branch: &'a str,
    kept: Vec<Fragment>,
    rebased: Vec<Op>,
}

impl<'a> Walker<'a> {
    fn new(old: Vec<Fragment>, branch: &'a str) -> Self {
        Walker {
            old,
            index: 0,
            offset: 0,
            branch,
            kept: Vec::new(),
            rebased: Vec::new(),
        }
    }

    /// Passes through fragments invisible to the branch (emitting retains
    /// for the ones that still occupy live content) and returns the
    /// remaining visible length under the cursor, or `None` when exhausted.
    fn skip_invisible(&mut self) -> Option<usize> {
        while let Some(fragment) = self.old.get(self.index) {
            if fragment.is_visible_to(self.branch) {
                return Some(fragment.len() - self.offset);
            }
            self.pass_through();
        }
        None
    }

    /// Passes through invisible fragments inserted by branches that sort
    /// before this one, so that concurrent same-position inserts converge.
    fn skip_foreign_before(&mut self, branch: &str) {
        while let Some(fragment) = self.old.get(self.index) {
            let skip = !fragment.is_visible_to(self.branch)
                && fragment.is_foreign_to(branch)
                && fragment.inserted_by.as_deref() < Some(branch);
            if !skip {
                break;
            }
            self.pass_through();
        }
    }

    /// Moves the whole fragment under the cursor (from the current offset)
    /// into the new list unchanged, retaining over it if it is live.
    fn pass_through(&mut self) {
        let fragment = &self.old[self.index];
        let piece = if self.offset == 0 {
            fragment.clone()
        } else {
            fragment.slice(self.offset, fragment.len())
        };

        if piece.is_alive() {
            self.rebased.push(Op::retain(piece.len()));
        }
        self.kept.push(piece);
        self.index += 1;
        self.offset = 0;
    }

    /// Takes up to `length` characters of the visible fragment under the
    /// cursor. Must only be called right after `skip_invisible` returned a
    /// length.
    fn take(&mut self, length: usize) -> Fragment {
        let fragment = &self.old[self.index];
        let available = fragment.len() - self.offset;
        let taken = length.min(available);
        let piece = fragment.slice(self.offset, self.offset + taken);

        if taken == available {
            self.index += 1;
            self.offset = 0;
        } else {
            self.offset += taken;
        }

        piece
    }

    fn finish(mut self) -> (Vec<Fragment>, Vec<Op>) {
        while self.index < self.old.len() {
            let fragment = &self.old[self.index];
            let piece = if self.offset == 0 {
                fragment.clone()
            } else {
                fragment.slice(self.offset, fragment.len())
            };
            self.kept.push(piece);
            self.index += 1;
            self.offset = 0;
        }

        (self.kept, self.rebased)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_single_branch_editing() {
        let mut ss = SharedString::from_string("hello world");

        let rebased = ss.apply_change(&Change::new().retain(6).delete(5).insert("there"), "a");

        assert_eq!(ss.to_text(), "hello there");
        assert_eq!(
            rebased,
            Change::from_ops(vec![Op::retain(6), Op::insert("there"), Op::delete(5)])
        );
    }

    #[test]
    fn test_deletes_of_concurrent_branches_are_absorbed() {
        let mut ss = SharedString::from_string("abc");

        assert_eq!(
            ss.apply_change(&Change::new().retain(1).delete(1), "a"),
            Change::new().retain(1).delete(1)
        );
        // b never saw a's deletion, so its offsets still count the tombstone
        assert_eq!(
            ss.apply_change(&Change::new().retain(1).delete(1), "b"),
            Change::new()
        );
        assert_eq!(ss.to_text(), "ac");
    }

    #[test]
    fn test_unseen_inserts_are_retained_over() {
        let mut ss = SharedString::from_string("ac");

        ss.apply_change(&Change::new().retain(1).insert("b"), "a");
        // b's delete of "c" addresses position 1 in its own view
        assert_eq!(
            ss.apply_change(&Change::new().retain(1).delete(1), "b"),
            Change::new().retain(2).delete(1)
        );
        assert_eq!(ss.to_text(), "ab");
    }

    #[test]
    fn test_same_position_inserts_order_by_branch() {
        let mut forward = SharedString::from_string("xy");
        forward.apply_change(&Change::new().retain(1).insert("a"), "a");
        forward.apply_change(&Change::new().retain(1).insert("b"), "b");

        let mut backward = SharedString::from_string("xy");
        backward.apply_change(&Change::new().retain(1).insert("b"), "b");
        backward.apply_change(&Change::new().retain(1).insert("a"), "a");

        assert_eq!(forward.to_text(), "xaby");
        assert_eq!(forward.to_text(), backward.to_text());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_to_delta_skips_tombstones() {
        let mut ss = SharedString::from_string("abc");
        ss.apply_change(&Change::new().delete(1), "a");

        assert_eq!(ss.to_delta(), Change::new().insert("bc"));
        // the raw projection keeps the fragment boundaries, one op each
        assert_eq!(
            ss.to_flattened_delta(),
            Change::from_ops(vec![Op::insert("a"), Op::insert("bc")])
        );
        assert_eq!(ss.fragments().len(), 2);
    }
}
