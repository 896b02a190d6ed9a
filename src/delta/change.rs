use core::fmt::{Debug, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::delta::{
    attributes::AttributeMap,
    op::{InsertValue, Op},
};

/// Attribution of a change to the document revision it was derived from,
/// used by the excerpt subsystem to tag replayed sync changes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRev {
    pub uri: String,
    pub rev: usize,
}

/// An edit script: an ordered sequence of ops plus optional provenance.
///
/// A change whose ops are all inserts is a *content*: the materialized text
/// of a document at some revision. Everything in this crate either turns
/// changes into contents (compose) or rewrites changes against each other
/// (transform, invert, crop).
///
/// The chaining builder reproduces quill-delta's canonical op order: an
/// insert pushed right after a delete swaps in front of it, and adjacent
/// compatible ops merge.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Change {
    pub ops: Vec<Op>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub source: Option<Vec<SourceRev>>,
}

impl Change {
    #[must_use]
    pub fn new() -> Self { Change::default() }

    #[must_use]
    pub fn from_ops(ops: Vec<Op>) -> Self { Change { ops, source: None } }

    /// Materializes a plain string as a content. The empty string becomes an
    /// empty op list, not a zero-length insert.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            Change::new()
        } else {
            Change::from_ops(vec![Op::insert(text)])
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Vec<SourceRev>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn insert(mut self, value: impl Into<InsertValue>) -> Self {
        self.push(Op::insert(value));
        self
    }

    #[must_use]
    pub fn insert_attr(mut self, value: impl Into<InsertValue>, attributes: AttributeMap) -> Self {
        self.push(Op::insert_attr(value, attributes));
        self
    }

    #[must_use]
    pub fn retain(mut self, length: usize) -> Self {
        self.push(Op::retain(length));
        self
    }

    #[must_use]
    pub fn retain_attr(mut self, length: usize, attributes: AttributeMap) -> Self {
        self.push(Op::retain_attr(length, attributes));
        self
    }

    #[must_use]
    pub fn delete(mut self, length: usize) -> Self {
        self.push(Op::delete(length));
        self
    }

    /// Appends an op in canonical position. Zero-length ops are dropped, an
    /// insert arriving after a delete is placed before it (inserts sort
    /// before deletes at the same position), and adjacent compatible ops
    /// are merged.
    pub fn push(&mut self, new_op: Op) {
        if new_op.is_empty() {
            return;
        }

        let mut index = self.ops.len();
        if matches!(self.ops.last(), Some(Op::Delete { .. }))
            && matches!(new_op, Op::Insert { .. })
        {
            index -= 1;
        }

        if index > 0 {
            if let Some(merged) = merge_adjacent(&self.ops[index - 1], &new_op) {
                self.ops[index - 1] = merged;
                return;
            }
        }

        self.ops.insert(index, new_op);
    }
}

/// Merges two ops into one when they are compatible: two deletes, two text
/// inserts with identical attributes, or two retains with identical
/// attributes.
#[must_use]
pub(crate) fn merge_adjacent(first: &Op, second: &Op) -> Option<Op> {
    match (first, second) {
        (Op::Delete { length: a }, Op::Delete { length: b }) => Some(Op::delete(a + b)),
        (
            Op::Insert {
                value: InsertValue::Text(a),
                attributes: attrs_a,
            },
            Op::Insert {
                value: InsertValue::Text(b),
                attributes: attrs_b,
            },
        ) if attrs_a == attrs_b => Some(Op::Insert {
            value: InsertValue::Text(format!("{a}{b}")),
            attributes: attrs_a.clone(),
        }),
        (
            Op::Retain {
                length: a,
                attributes: attrs_a,
            },
            Op::Retain {
                length: b,
                attributes: attrs_b,
            },
        ) if attrs_a == attrs_b => Some(Op::Retain {
            length: a + b,
            attributes: attrs_a.clone(),
        }),
        _ => None,
    }
}

/// Total length of a change in its own coordinate space: inserts, retains
/// and deletes all count.
#[must_use]
pub fn delta_length(change: &Change) -> usize { change.ops.iter().map(Op::len).sum() }

/// Length of a content. The argument must consist of inserts only.
#[must_use]
pub fn content_length(content: &Change) -> usize {
    debug_assert!(
        content
            .ops
            .iter()
            .all(|op| matches!(op, Op::Insert { .. })),
        "content should only consist of inserts: {content:?}"
    );

    content
        .ops
        .iter()
        .map(|op| match op {
            Op::Insert { value, .. } => value.len(),
            Op::Retain { .. } | Op::Delete { .. } => 0,
        })
        .sum()
}

/// The minimum base-content length the change can be applied to: the sum of
/// its retains and deletes.
#[must_use]
pub fn min_content_length_for_change(change: &Change) -> usize {
    change
        .ops
        .iter()
        .map(|op| match op {
            Op::Insert { .. } => 0,
            Op::Retain { length, .. } | Op::Delete { length } => *length,
        })
        .sum()
}

/// The content length after applying `change` to a base of `initial_length`
/// characters.
#[must_use]
pub fn content_length_increased(initial_length: usize, change: &Change) -> usize {
    let mut length = initial_length as i64;
    for op in &change.ops {
        match op {
            Op::Insert { value, .. } => length += value.len() as i64,
            Op::Delete { length: deleted } => length -= *deleted as i64,
            Op::Retain { .. } => {}
        }
    }

    debug_assert!(length >= 0, "change deletes more than the base holds");
    length.max(0) as usize
}

/// Renders a content as plain text; embeds render as a single placeholder
/// character.
#[must_use]
pub fn content_text(content: &Change) -> String {
    let mut text = String::new();
    for op in &content.ops {
        match op {
            Op::Insert {
                value: InsertValue::Text(run),
                ..
            } => text.push_str(run),
            Op::Insert {
                value: InsertValue::Embed(_),
                ..
            } => text.push('\u{fffc}'),
            Op::Retain { .. } | Op::Delete { .. } => {}
        }
    }
    text
}

impl Display for Change {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[")?;
        for (index, op) in self.ops.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, "]")
    }
}

impl Debug for Change {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{self} from {source:?}"),
            None => write!(f, "{self}"),
        }
    }
}
