use std::collections::BTreeSet;

use crate::delta::{
    attributes::AttributeMap,
    op::{InsertValue, Op},
};

/// The label of an editing branch. Concurrent branches see each other's
/// edits only after merging; the label is what ties tombstones and inserts
/// to their author.
pub type Branch = String;

/// A run of text (or a single embed) with its edit history: who inserted
/// it, and who has deleted it since. Deleted fragments stay in the string
/// as tombstones so that offsets of branches that have not seen the
/// deletion keep working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub value: InsertValue,
    pub attributes: Option<AttributeMap>,
    pub inserted_by: Option<Branch>,
    pub deleted_by: BTreeSet<Branch>,
}

impl Fragment {
    /// A fragment of the initial content, before any tracked change.
    #[must_use]
    pub fn initial(value: impl Into<InsertValue>, attributes: Option<AttributeMap>) -> Self {
        Fragment {
            value: value.into(),
            attributes,
            inserted_by: None,
            deleted_by: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn inserted(
        value: impl Into<InsertValue>,
        attributes: Option<AttributeMap>,
        branch: &str,
    ) -> Self {
        Fragment {
            value: value.into(),
            attributes,
            inserted_by: Some(branch.to_owned()),
            deleted_by: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.value.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.value.is_empty() }

    /// Part of the materialized content: nobody has deleted it.
    #[must_use]
    pub fn is_alive(&self) -> bool { self.deleted_by.is_empty() }

    /// Counts towards `branch`'s offsets: the branch inserted it (or it is
    /// initial content) and the branch has not deleted it. Other branches'
    /// tombstones stay visible so that stale offsets resolve.
    #[must_use]
    pub fn is_visible_to(&self, branch: &str) -> bool {
        self.inserted_by.as_deref().is_none_or(|by| by == branch)
            && !self.deleted_by.contains(branch)
    }

    /// An insert op of another branch that `branch` has never seen; `branch`'s
    /// own offsets skip over it.
    #[must_use]
    pub fn is_foreign_to(&self, branch: &str) -> bool {
        self.inserted_by.as_deref().is_some_and(|by| by != branch)
    }

    /// Returns the sub-fragment over `[start, end)`. Slicing an embed from a
    /// non-zero start yields an empty text fragment, like string slicing
    /// past the first character.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Fragment {
        let value = match &self.value {
            InsertValue::Text(text) => InsertValue::Text(
                text.chars()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .collect(),
            ),
            InsertValue::Embed(embed) => {
                if start > 0 {
                    InsertValue::Text(String::new())
                } else {
                    InsertValue::Embed(embed.clone())
                }
            }
        };

        Fragment {
            value,
            attributes: self.attributes.clone(),
            inserted_by: self.inserted_by.clone(),
            deleted_by: self.deleted_by.clone(),
        }
    }

    #[must_use]
    pub fn to_op(&self) -> Op {
        Op::Insert {
            value: self.value.clone(),
            attributes: self.attributes.clone(),
        }
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        match &self.value {
            InsertValue::Text(text) => text.clone(),
            InsertValue::Embed(_) => "\u{fffc}".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility() {
        let initial = Fragment::initial("ab", None);
        assert!(initial.is_visible_to("a"));
        assert!(initial.is_visible_to("b"));

        let by_a = Fragment::inserted("ab", None, "a");
        assert!(by_a.is_visible_to("a"));
        assert!(!by_a.is_visible_to("b"));
        assert!(by_a.is_foreign_to("b"));

        let mut deleted_by_b = Fragment::initial("ab", None);
        deleted_by_b.deleted_by.insert("b".to_owned());
        assert!(deleted_by_b.is_visible_to("a"));
        assert!(!deleted_by_b.is_visible_to("b"));
        assert!(!deleted_by_b.is_alive());
    }

    #[test]
    fn test_slice() {
        let fragment = Fragment::inserted("hello", None, "a");
        let sliced = fragment.slice(1, 3);

        assert_eq!(sliced.value, "el".into());
        assert_eq!(sliced.inserted_by.as_deref(), Some("a"));
    }

    #[test]
    fn test_slice_embed() {
        use crate::delta::op::EmbedValue;

        let embed = Fragment::initial(
            EmbedValue {
                excerpted: "doc1?rev=1&start=0&end=2".to_owned(),
            },
            None,
        );

        assert_eq!(embed.slice(0, 1), embed);
        assert_eq!(embed.slice(1, 1).len(), 0);
    }
}
