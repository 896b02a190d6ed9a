use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single attribute value. `Null` is not the absence of a value: inside a
/// change it is the tombstone meaning "explicitly unset this attribute",
/// which matters when composing and inverting changes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Number(i64),
    Null,
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self { AttrValue::Text(value.to_owned()) }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self { AttrValue::Text(value) }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self { AttrValue::Number(value) }
}

/// Attribute maps are ordered so that equality and serialization are stable.
pub type AttributeMap = BTreeMap<String, AttrValue>;

/// Merges two optional attribute maps with right-hand precedence: every key
/// of `second` wins over the same key of `first`. `Null` values are carried
/// over verbatim, they are not resolved here.
#[must_use]
pub fn merge_attributes(
    first: Option<&AttributeMap>,
    second: Option<&AttributeMap>,
) -> Option<AttributeMap> {
    match (first, second) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(first), Some(second)) => {
            let mut result = first.clone();
            for (key, value) in second {
                result.insert(key.clone(), value.clone());
            }
            Some(result)
        }
    }
}

/// Applies a change's attribute map onto a materialized one: `Null` removes
/// the key, everything else overwrites it. Used when attributes land on
/// live fragments rather than on another change.
#[must_use]
pub fn apply_attributes(
    base: Option<&AttributeMap>,
    applied: &AttributeMap,
) -> Option<AttributeMap> {
    let mut result = base.cloned().unwrap_or_default();
    for (key, value) in applied {
        if *value == AttrValue::Null {
            result.remove(key);
        } else {
            result.insert(key.clone(), value.clone());
        }
    }

    if result.is_empty() { None } else { Some(result) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn attrs(pairs: &[(&str, AttrValue)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn test_right_hand_precedence() {
        let first = attrs(&[("b", 1.into()), ("i", "x".into())]);
        let second = attrs(&[("i", AttrValue::Null)]);

        assert_eq!(
            merge_attributes(Some(&first), Some(&second)),
            Some(attrs(&[("b", 1.into()), ("i", AttrValue::Null)]))
        );
    }

    #[test]
    fn test_merge_with_missing_side() {
        let only = attrs(&[("b", 1.into())]);

        assert_eq!(merge_attributes(None, None), None);
        assert_eq!(merge_attributes(Some(&only), None), Some(only.clone()));
        assert_eq!(merge_attributes(None, Some(&only)), Some(only));
    }

    #[test]
    fn test_apply_removes_on_null() {
        let base = attrs(&[("b", 1.into())]);
        let change = attrs(&[("b", AttrValue::Null), ("i", 1.into())]);

        assert_eq!(
            apply_attributes(Some(&base), &change),
            Some(attrs(&[("i", 1.into())]))
        );
        assert_eq!(
            apply_attributes(Some(&base), &attrs(&[("b", AttrValue::Null)])),
            None
        );
    }
}
