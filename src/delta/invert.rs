use crate::delta::{
    attributes::{AttrValue, AttributeMap},
    change::{Change, content_length},
    compose::flatten_two,
    error::DeltaError,
    normalize::normalize_ops,
    op::Op,
};

/// Extracts `[start, end)` of a content by composing it with a synthesized
/// delete/retain/delete change.
pub fn crop_content(content: &Change, start: usize, end: usize) -> Result<Change, DeltaError> {
    let full_length = content_length(content);
    if full_length < end || end < start {
        return Err(DeltaError::CropOutOfBounds {
            start,
            end,
            length: full_length,
        });
    }

    let mut window = Change::new().delete(start).retain(end - start);
    if full_length > end {
        window = window.delete(full_length - end);
    }

    Ok(flatten_two(content, &window))
}

/// Builds the change that undoes `change` when applied to its result:
/// inserts turn into deletes, deletes re-emit the removed slice of
/// `base_content`, and attribute retains restore the previous values
/// (`Null` where the attribute did not exist before). Provenance is kept.
///
/// `base_content` must be the content `change` was based on.
pub fn invert_change(base_content: &Change, change: &Change) -> Result<Change, DeltaError> {
    let mut offset = 0;
    let mut reversed: Vec<Op> = Vec::with_capacity(change.ops.len());

    for op in &change.ops {
        match op {
            Op::Retain {
                length,
                attributes: Some(attributes),
            } => {
                let cropped = crop_content(base_content, offset, offset + length)?;
                for content_op in &cropped.ops {
                    let restored = restore_attributes(attributes, content_op.attributes());
                    reversed.push(match restored {
                        Some(restored) => Op::retain_attr(content_op.len(), restored),
                        None => Op::retain(content_op.len()),
                    });
                }
                offset += length;
            }

            Op::Retain {
                length,
                attributes: None,
            } => {
                reversed.push(Op::retain(*length));
                offset += length;
            }

            Op::Insert { value, .. } => reversed.push(Op::delete(value.len())),

            Op::Delete { length } => {
                let mut cropped = crop_content(base_content, offset, offset + length)?;
                reversed.append(&mut cropped.ops);
                offset += length;
            }
        }
    }

    Ok(Change {
        ops: normalize_ops(reversed),
        source: change.source.clone(),
    })
}

/// For every key the change touched, the value to put back: the old value
/// where one existed, a `Null` tombstone where the change introduced the
/// key.
fn restore_attributes(
    changed: &AttributeMap,
    previous: Option<&AttributeMap>,
) -> Option<AttributeMap> {
    let mut restored = AttributeMap::new();
    for (key, value) in changed {
        match (value, previous.and_then(|previous| previous.get(key))) {
            (AttrValue::Null, Some(old)) => {
                restored.insert(key.clone(), old.clone());
            }
            (AttrValue::Null, None) => {}
            (_, Some(old)) => {
                restored.insert(key.clone(), old.clone());
            }
            (_, None) => {
                restored.insert(key.clone(), AttrValue::Null);
            }
        }
    }

    if restored.is_empty() {
        None
    } else {
        Some(restored)
    }
}

/// Applies a change to a content, producing the new content.
#[must_use]
pub fn apply_change_to_content(content: &Change, change: &Change) -> Change {
    flatten_two(content, change)
}
