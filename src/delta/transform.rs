use crate::delta::{
    attributes::AttributeMap,
    change::Change,
    compose::{OpCursor, flatten_two},
    normalize::normalize_ops,
    op::Op,
};

/// Rebases `second` over `first`: both changes address the same base
/// content, and the result addresses the content *after* `first`. When both
/// sides insert at the same position, `first_wins` decides whether the
/// reference change's insert ends up in front.
#[must_use]
pub fn transform_deltas(first: &Change, second: &Change, first_wins: bool) -> Change {
    let mut cursor = OpCursor::new(&first.ops);
    let mut ops: Vec<Op> = Vec::with_capacity(second.ops.len());

    for op in &second.ops {
        match op {
            Op::Insert { .. } => {
                if first_wins {
                    while matches!(cursor.peek(), Some(Op::Insert { .. })) {
                        let length = cursor.peek_len();
                        cursor.take(length);
                        ops.push(Op::retain(length));
                    }
                }
                ops.push(op.clone());
            }

            Op::Retain { length, attributes } => {
                let mut remaining = *length;
                while remaining > 0 {
                    match cursor.peek() {
                        None => {
                            ops.push(Op::Retain {
                                length: remaining,
                                attributes: attributes.clone(),
                            });
                            remaining = 0;
                        }
                        Some(Op::Insert { .. }) => {
                            let length = cursor.peek_len();
                            cursor.take(length);
                            ops.push(Op::retain(length));
                        }
                        Some(Op::Retain {
                            attributes: reference_attributes,
                            ..
                        }) => {
                            let reference_attributes = reference_attributes.clone();
                            let taken = cursor.take(remaining).len();
                            remaining -= taken;
                            ops.push(Op::Retain {
                                length: taken,
                                attributes: transform_attributes(
                                    reference_attributes.as_ref(),
                                    attributes.as_ref(),
                                    first_wins,
                                ),
                            });
                        }
                        Some(Op::Delete { .. }) => {
                            // the retained text is gone
                            remaining -= cursor.take(remaining).len();
                        }
                    }
                }
            }

            Op::Delete { length } => {
                let mut remaining = *length;
                while remaining > 0 {
                    match cursor.peek() {
                        None => {
                            ops.push(Op::delete(remaining));
                            remaining = 0;
                        }
                        Some(Op::Insert { .. }) => {
                            let length = cursor.peek_len();
                            cursor.take(length);
                            ops.push(Op::retain(length));
                        }
                        Some(Op::Retain { .. }) => {
                            let taken = cursor.take(remaining).len();
                            remaining -= taken;
                            ops.push(Op::delete(taken));
                        }
                        Some(Op::Delete { .. }) => {
                            // both sides deleted it, nothing left to delete
                            remaining -= cursor.take(remaining).len();
                        }
                    }
                }
            }
        }
    }

    Change {
        ops: normalize_ops(ops),
        source: second.source.clone(),
    }
}

/// Composes `first` with the rebased `second` in one step.
#[must_use]
pub fn flatten_transformed_delta(first: &Change, second: &Change, first_wins: bool) -> Change {
    flatten_two(first, &transform_deltas(first, second, first_wins))
}

/// Attribute conflict rule on overlapping retains: when the reference change
/// wins, its keys are stripped from the incoming retain; otherwise the
/// incoming attributes survive unchanged.
#[must_use]
fn transform_attributes(
    reference: Option<&AttributeMap>,
    incoming: Option<&AttributeMap>,
    first_wins: bool,
) -> Option<AttributeMap> {
    match (reference, incoming) {
        (Some(reference), Some(incoming)) if first_wins => {
            let surviving: AttributeMap = incoming
                .iter()
                .filter(|(key, _)| !reference.contains_key(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            if surviving.is_empty() {
                None
            } else {
                Some(surviving)
            }
        }
        (_, incoming) => incoming.cloned(),
    }
}

/// Maps a caret position through a change: deletes before the position pull
/// it left, inserts at or before it push it right. With `after_inserts` an
/// insert exactly at the position leaves the caret in front of the new text.
#[must_use]
pub fn transform_position(change: &Change, position: usize, after_inserts: bool) -> usize {
    let mut position = position;
    let mut offset = 0;
    for op in &change.ops {
        if offset > position {
            break;
        }

        match op {
            Op::Delete { length } => {
                position -= (*length).min(position - offset);
                continue;
            }
            Op::Insert { value, .. } => {
                if offset < position || !after_inserts {
                    position += value.len();
                }
                offset += value.len();
            }
            Op::Retain { length, .. } => offset += length,
        }
    }

    position
}
