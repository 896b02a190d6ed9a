//! The marker wire codec. A marker is an embed insert
//! `{"excerpted": "<uri>?rev=R&start=S&end=E"}` with string attributes
//! `targetUri`/`targetRev`/`targetStart`/`targetEnd` (decimal), `markedAt`
//! (`"left"` or `"right"`) and, for duplicates left behind by nested
//! excerpt operations, `copied: "true"`. Numeric fields stay decimal
//! strings on the wire.

use crate::delta::{
    attributes::{AttrValue, AttributeMap},
    change::Change,
    op::{EmbedValue, InsertValue, Op},
};
use crate::excerpt::{Excerpt, ExcerptError, ExcerptKey, ExcerptTarget};

pub const ATTR_TARGET_URI: &str = "targetUri";
pub const ATTR_TARGET_REV: &str = "targetRev";
pub const ATTR_TARGET_START: &str = "targetStart";
pub const ATTR_TARGET_END: &str = "targetEnd";
pub const ATTR_MARKED_AT: &str = "markedAt";
pub const ATTR_COPIED: &str = "copied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSide {
    Left,
    Right,
}

impl MarkerSide {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerSide::Left => "left",
            MarkerSide::Right => "right",
        }
    }
}

/// Builds one side of a marker pair.
#[must_use]
pub fn make_marker(side: MarkerSide, source: &ExcerptKey, target: &ExcerptTarget) -> Op {
    let mut attributes = AttributeMap::new();
    attributes.insert(ATTR_TARGET_URI.to_owned(), target.uri.clone().into());
    attributes.insert(ATTR_TARGET_REV.to_owned(), target.rev.to_string().into());
    attributes.insert(
        ATTR_TARGET_START.to_owned(),
        target.start.to_string().into(),
    );
    attributes.insert(ATTR_TARGET_END.to_owned(), target.end.to_string().into());
    attributes.insert(ATTR_MARKED_AT.to_owned(), side.as_str().into());

    Op::insert_attr(
        EmbedValue {
            excerpted: source.to_string(),
        },
        attributes,
    )
}

/// Whether the encoded string is a well-formed excerpt URI,
/// `<uri>?rev=R&start=S&end=E` with decimal fields in exactly that order.
#[must_use]
pub fn is_excerpt_uri(encoded: &str) -> bool { split_source_uri(encoded).is_ok() }

/// Parses an encoded excerpt URI into its structured key.
pub fn split_source_uri(encoded: &str) -> Result<ExcerptKey, ExcerptError> {
    let bad = || ExcerptError::BadUri {
        uri: encoded.to_owned(),
    };

    let (uri, query) = encoded.split_once('?').ok_or_else(bad)?;
    if uri.contains('?') || query.contains('?') {
        return Err(bad());
    }

    let rest = query.strip_prefix("rev=").ok_or_else(bad)?;
    let (rev, rest) = take_decimal(rest).ok_or_else(bad)?;
    let rest = rest.strip_prefix("&start=").ok_or_else(bad)?;
    let (start, rest) = take_decimal(rest).ok_or_else(bad)?;
    let rest = rest.strip_prefix("&end=").ok_or_else(bad)?;
    let (end, rest) = take_decimal(rest).ok_or_else(bad)?;
    if !rest.is_empty() {
        return Err(bad());
    }

    Ok(ExcerptKey::new(uri, rev, start, end))
}

fn take_decimal(input: &str) -> Option<(usize, &str)> {
    let digits = input.len() - input.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let (number, rest) = input.split_at(digits);
    number.parse().ok().map(|number| (number, rest))
}

fn marker_attributes(op: &Op) -> Option<(&str, &AttributeMap)> {
    match op {
        Op::Insert {
            value: InsertValue::Embed(EmbedValue { excerpted }),
            attributes: Some(attributes),
        } => Some((excerpted, attributes)),
        _ => None,
    }
}

fn text_attr<'a>(attributes: &'a AttributeMap, key: &str) -> Option<&'a str> {
    match attributes.get(key) {
        Some(AttrValue::Text(text)) => Some(text),
        _ => None,
    }
}

/// Whether the op is a well-formed excerpt marker. `copied` duplicates are
/// excluded unless asked for.
#[must_use]
pub fn is_excerpt_marker(op: &Op, include_copied: bool) -> bool {
    let Some((excerpted, attributes)) = marker_attributes(op) else {
        return false;
    };

    if !include_copied && attributes.contains_key(ATTR_COPIED) {
        return false;
    }

    is_excerpt_uri(excerpted)
        && text_attr(attributes, ATTR_TARGET_URI).is_some()
        && text_attr(attributes, ATTR_TARGET_REV).is_some()
        && text_attr(attributes, ATTR_TARGET_START).is_some()
        && text_attr(attributes, ATTR_TARGET_END).is_some()
}

#[must_use]
pub fn marker_side(op: &Op) -> Option<MarkerSide> {
    let (_, attributes) = marker_attributes(op)?;
    match text_attr(attributes, ATTR_MARKED_AT) {
        Some("left") => Some(MarkerSide::Left),
        Some("right") => Some(MarkerSide::Right),
        _ => None,
    }
}

#[must_use]
pub fn is_left_marker(op: &Op, include_copied: bool) -> bool {
    is_excerpt_marker(op, include_copied) && marker_side(op) == Some(MarkerSide::Left)
}

#[must_use]
pub fn is_right_marker(op: &Op, include_copied: bool) -> bool {
    is_excerpt_marker(op, include_copied) && marker_side(op) == Some(MarkerSide::Right)
}

/// Tags every marker in the op list as `copied`, so later scans over pasted
/// content do not mistake the duplicates for live markers.
#[must_use]
pub fn mark_copied(ops: &[Op]) -> Vec<Op> {
    ops.iter()
        .map(|op| {
            if !is_excerpt_marker(op, false) {
                return op.clone();
            }
            match op {
                Op::Insert {
                    value,
                    attributes: Some(attributes),
                } => {
                    let mut attributes = attributes.clone();
                    attributes.insert(ATTR_COPIED.to_owned(), "true".into());
                    Op::Insert {
                        value: value.clone(),
                        attributes: Some(attributes),
                    }
                }
                _ => op.clone(),
            }
        })
        .collect()
}

/// Decodes a marker back into its source/target pairing.
pub fn decompose_marker(op: &Op) -> Result<Excerpt, ExcerptError> {
    if !is_excerpt_marker(op, true) {
        return Err(ExcerptError::NotAMarker { op: op.clone() });
    }

    let (excerpted, attributes) = marker_attributes(op).ok_or_else(|| ExcerptError::NotAMarker {
        op: op.clone(),
    })?;
    let source = split_source_uri(excerpted)?;

    let number = |key: &str| -> Result<usize, ExcerptError> {
        text_attr(attributes, key)
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| ExcerptError::NotAMarker { op: op.clone() })
    };

    let target = ExcerptTarget {
        uri: text_attr(attributes, ATTR_TARGET_URI)
            .ok_or_else(|| ExcerptError::NotAMarker { op: op.clone() })?
            .to_owned(),
        rev: number(ATTR_TARGET_REV)?,
        start: number(ATTR_TARGET_START)?,
        end: number(ATTR_TARGET_END)?,
    };

    Ok(Excerpt { source, target })
}

/// The change that crops a content of `length` characters down to
/// `[start, end)`.
#[must_use]
pub fn take_change(start: usize, end: usize, length: usize) -> Change {
    let mut change = Change::new().delete(start).retain(end - start);
    if length > end {
        change = change.delete(length - end);
    }
    change
}

/// The pasted ops: left marker, the source content, right marker. The
/// caller prepends the retain to the paste offset.
#[must_use]
pub fn paste_with_markers(
    source: &ExcerptKey,
    content: &Change,
    target: &ExcerptTarget,
) -> Change {
    let mut ops = Vec::with_capacity(content.ops.len() + 2);
    ops.push(make_marker(MarkerSide::Left, source, target));
    ops.extend(content.ops.iter().cloned());
    ops.push(make_marker(MarkerSide::Right, source, target));
    Change::from_ops(ops)
}
