use core::fmt::{Debug, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::delta::{
    change::Change,
    normalize::normalize_ops,
    op::Op,
    transform::transform_position,
};

/// A half-open span `[start, end)` of a document, tracked across edits.
///
/// Both boundaries are exclusive for concurrent inserts: text inserted
/// exactly at `start` lands in front of the range, text inserted exactly at
/// `end` lands after it. Only inserts strictly inside grow the range.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "invalid range [{start}, {end})");
        Range { start, end }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.end - self.start }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.start == self.end }

    /// Where the range sits after the change.
    #[must_use]
    pub fn apply_change(&self, change: &Change) -> Range {
        Range {
            start: transform_position(change, self.start, false),
            end: transform_position(change, self.end, true),
        }
    }

    #[must_use]
    pub fn apply_changes<'a>(&self, changes: impl IntoIterator<Item = &'a Change>) -> Range {
        changes
            .into_iter()
            .fold(*self, |range, change| range.apply_change(change))
    }

    /// The range after each change, one entry per change.
    #[must_use]
    pub fn map_changes<'a>(&self, changes: impl IntoIterator<Item = &'a Change>) -> Vec<Range> {
        let mut range = *self;
        changes
            .into_iter()
            .map(|change| {
                range = range.apply_change(change);
                range
            })
            .collect()
    }

    /// Restricts a change to the part that touches this range, re-expressed
    /// in range-local coordinates. Retains and deletes are clipped to the
    /// overlap; inserts survive only strictly inside the range.
    #[must_use]
    pub fn crop_change(&self, change: &Change) -> Change {
        let mut position = 0;
        let mut ops: Vec<Op> = Vec::new();

        for op in &change.ops {
            match op {
                Op::Insert { .. } => {
                    if self.start < position && position < self.end {
                        ops.push(op.clone());
                    }
                }
                Op::Retain { .. } | Op::Delete { .. } => {
                    let from = position.max(self.start);
                    let to = (position + op.len()).min(self.end);
                    if to > from {
                        ops.push(op.slice(from - position, to - position));
                    }
                    position += op.len();
                }
            }
        }

        Change {
            ops: normalize_ops(ops),
            source: change.source.clone(),
        }
    }

    /// Crops each change against the range as it evolves, one output per
    /// input.
    #[must_use]
    pub fn crop_changes<'a>(&self, changes: impl IntoIterator<Item = &'a Change>) -> Vec<Change> {
        let mut range = *self;
        changes
            .into_iter()
            .map(|change| {
                let cropped = range.crop_change(change);
                range = range.apply_change(change);
                cropped
            })
            .collect()
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl Debug for Range {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result { write!(f, "{self}") }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(Change::new().insert("ab"), Range::new(4, 7); "insert before shifts")]
    #[test_case(Change::new().retain(2).insert("ab"), Range::new(4, 7); "insert at start shifts")]
    #[test_case(Change::new().retain(3).insert("ab"), Range::new(2, 7); "insert inside grows")]
    #[test_case(Change::new().retain(5).insert("ab"), Range::new(2, 5); "insert at end stays out")]
    #[test_case(Change::new().delete(1), Range::new(1, 4); "delete before pulls")]
    #[test_case(Change::new().retain(2).delete(2), Range::new(2, 3); "delete inside narrows")]
    #[test_case(Change::new().delete(7), Range::new(0, 0); "delete across collapses")]
    fn test_apply_change(change: Change, expected: Range) {
        assert_eq!(Range::new(2, 5).apply_change(&change), expected);
    }

    #[test]
    fn test_crop_insert_inside() {
        let range = Range::new(2, 5);
        let change = Change::new().retain(3).insert("x");

        assert_eq!(
            range.crop_change(&change),
            Change::new().retain(1).insert("x")
        );
    }

    #[test]
    fn test_crop_insert_at_boundaries_is_dropped() {
        let range = Range::new(2, 5);

        assert_eq!(
            range.crop_change(&Change::new().retain(2).insert("x")),
            Change::new()
        );
        assert_eq!(
            range.crop_change(&Change::new().retain(5).insert("x")),
            Change::new()
        );
    }

    #[test]
    fn test_crop_delete_clipped_to_overlap() {
        let range = Range::new(2, 5);
        let change = Change::new().retain(1).delete(3);

        assert_eq!(range.crop_change(&change), Change::new().delete(2));
    }

    #[test]
    fn test_crop_changes_follows_the_range() {
        let range = Range::new(2, 5);
        let changes = vec![
            Change::new().insert("ab"),           // range becomes [4, 7)
            Change::new().retain(5).insert("x"),  // inside the shifted range
        ];

        assert_eq!(
            range.crop_changes(&changes),
            vec![Change::new(), Change::new().retain(1).insert("x")]
        );
        assert_eq!(range.apply_changes(&changes), Range::new(4, 8));
    }
}
