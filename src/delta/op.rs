use core::fmt::{Debug, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::delta::attributes::AttributeMap;

/// The payload of an insert: a run of text, or a single embedded object.
/// Embeds always have length 1. The only embed this system produces is the
/// excerpt marker, whose wire shape is `{"excerpted": "<uri>?rev=..."}`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertValue {
    Text(String),
    Embed(EmbedValue),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedValue {
    pub excerpted: String,
}

impl InsertValue {
    /// Length in characters; embeds count as 1.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            InsertValue::Text(text) => text.chars().count(),
            InsertValue::Embed(_) => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl From<&str> for InsertValue {
    fn from(value: &str) -> Self { InsertValue::Text(value.to_owned()) }
}

impl From<String> for InsertValue {
    fn from(value: String) -> Self { InsertValue::Text(value) }
}

impl From<EmbedValue> for InsertValue {
    fn from(value: EmbedValue) -> Self { InsertValue::Embed(value) }
}

/// An atomic edit primitive. A change is a left-to-right scan over some base
/// content: retains and deletes consume base length, inserts add new length.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Clone, PartialEq, Eq)]
pub enum Op {
    Insert {
        #[cfg_attr(feature = "serde", serde(rename = "insert"))]
        value: InsertValue,
        #[cfg_attr(
            feature = "serde",
            serde(default, skip_serializing_if = "Option::is_none")
        )]
        attributes: Option<AttributeMap>,
    },

    Retain {
        #[cfg_attr(feature = "serde", serde(rename = "retain"))]
        length: usize,
        #[cfg_attr(
            feature = "serde",
            serde(default, skip_serializing_if = "Option::is_none")
        )]
        attributes: Option<AttributeMap>,
    },

    Delete {
        #[cfg_attr(feature = "serde", serde(rename = "delete"))]
        length: usize,
    },
}

impl Op {
    #[must_use]
    pub fn insert(value: impl Into<InsertValue>) -> Self {
        Op::Insert {
            value: value.into(),
            attributes: None,
        }
    }

    #[must_use]
    pub fn insert_attr(value: impl Into<InsertValue>, attributes: AttributeMap) -> Self {
        Op::Insert {
            value: value.into(),
            attributes: Some(attributes),
        }
    }

    #[must_use]
    pub fn retain(length: usize) -> Self {
        Op::Retain {
            length,
            attributes: None,
        }
    }

    #[must_use]
    pub fn retain_attr(length: usize, attributes: AttributeMap) -> Self {
        Op::Retain {
            length,
            attributes: Some(attributes),
        }
    }

    #[must_use]
    pub fn delete(length: usize) -> Self { Op::Delete { length } }

    /// The number of characters the op covers in its own coordinate space.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Op::Insert { value, .. } => value.len(),
            Op::Retain { length, .. } | Op::Delete { length } => *length,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn attributes(&self) -> Option<&AttributeMap> {
        match self {
            Op::Insert { attributes, .. } | Op::Retain { attributes, .. } => attributes.as_ref(),
            Op::Delete { .. } => None,
        }
    }

    /// Returns the sub-op over `[start, end)` of this op's own length.
    /// Slicing an embed from a non-zero start yields an empty text insert,
    /// mirroring how string slicing behaves past the first character.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Op {
        match self {
            Op::Insert {
                value: InsertValue::Text(text),
                attributes,
            } => Op::Insert {
                value: InsertValue::Text(
                    text.chars()
                        .skip(start)
                        .take(end.saturating_sub(start))
                        .collect(),
                ),
                attributes: attributes.clone(),
            },
            Op::Insert {
                value: InsertValue::Embed(embed),
                attributes,
            } => {
                if start > 0 {
                    Op::insert("")
                } else {
                    Op::Insert {
                        value: InsertValue::Embed(embed.clone()),
                        attributes: attributes.clone(),
                    }
                }
            }
            Op::Retain { attributes, .. } => Op::Retain {
                length: end.saturating_sub(start),
                attributes: attributes.clone(),
            },
            Op::Delete { .. } => Op::delete(end.saturating_sub(start)),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Op::Insert {
                value: InsertValue::Text(text),
                attributes,
            } => match attributes {
                Some(attributes) => {
                    write!(f, "<insert '{}' {attributes:?}>", text.replace('\n', "\\n"))
                }
                None => write!(f, "<insert '{}'>", text.replace('\n', "\\n")),
            },
            Op::Insert {
                value: InsertValue::Embed(embed),
                ..
            } => write!(f, "<embed '{}'>", embed.excerpted),
            Op::Retain { length, attributes } => match attributes {
                Some(attributes) => write!(f, "<retain {length} {attributes:?}>"),
                None => write!(f, "<retain {length}>"),
            },
            Op::Delete { length } => write!(f, "<delete {length}>"),
        }
    }
}

impl Debug for Op {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result { write!(f, "{self}") }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_lengths() {
        assert_eq!(Op::insert("Hello").len(), 5);
        assert_eq!(Op::insert("こんにちは").len(), 5);
        assert_eq!(
            Op::insert(EmbedValue {
                excerpted: "doc1?rev=1&start=0&end=2".to_owned()
            })
            .len(),
            1
        );
        assert_eq!(Op::retain(3).len(), 3);
        assert_eq!(Op::delete(4).len(), 4);
    }

    #[test]
    fn test_slice_text() {
        assert_eq!(Op::insert("Hello").slice(1, 3), Op::insert("el"));
        assert_eq!(Op::retain(5).slice(2, 5), Op::retain(3));
        assert_eq!(Op::delete(5).slice(0, 2), Op::delete(2));
    }

    #[test]
    fn test_slice_embed() {
        let embed = Op::insert(EmbedValue {
            excerpted: "doc1?rev=1&start=0&end=2".to_owned(),
        });

        assert_eq!(embed.slice(0, 1), embed);
        assert_eq!(embed.slice(1, 1), Op::insert(""));
    }
}
