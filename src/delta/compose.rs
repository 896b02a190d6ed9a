use crate::delta::{
    attributes::{apply_attributes, merge_attributes},
    change::Change,
    normalize::normalize_ops,
    op::Op,
};

/// A read cursor over an op list that hands out sub-op slices. Both the
/// composer and the transformer walk their reference change through one of
/// these.
#[derive(Debug)]
pub(crate) struct OpCursor<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpCursor<'a> {
    pub(crate) fn new(ops: &'a [Op]) -> Self {
        OpCursor {
            ops,
            index: 0,
            offset: 0,
        }
    }

    pub(crate) fn peek(&self) -> Option<&'a Op> { self.ops.get(self.index) }

    /// Remaining length of the op under the cursor.
    pub(crate) fn peek_len(&self) -> usize {
        self.ops
            .get(self.index)
            .map_or(0, |op| op.len() - self.offset)
    }

    /// Takes up to `length` units from the op under the cursor and advances.
    /// Must not be called when exhausted.
    pub(crate) fn take(&mut self, length: usize) -> Op {
        let op = &self.ops[self.index];
        let available = op.len() - self.offset;
        let taken = length.min(available);
        let slice = op.slice(self.offset, self.offset + taken);

        if taken == available {
            self.index += 1;
            self.offset = 0;
        } else {
            self.offset += taken;
        }

        slice
    }

    /// Everything not yet consumed, first op sliced to its remainder.
    pub(crate) fn rest(&mut self) -> Vec<Op> {
        let mut rest = Vec::new();
        while self.peek().is_some() {
            let length = self.peek_len();
            rest.push(self.take(length));
        }
        rest
    }
}

/// Composes `second` onto `first`: the result applied to a base is
/// equivalent to applying `first` then `second`. Provenance does not
/// survive composition.
///
/// `second`'s coordinates address the *output* of `first`, so its retains
/// and deletes consume `first`'s inserts and retains; `first`'s deletes
/// address content `second` never saw and pass through in place.
#[must_use]
pub fn flatten_two(first: &Change, second: &Change) -> Change {
    let mut cursor = OpCursor::new(&first.ops);
    let mut ops: Vec<Op> = Vec::with_capacity(first.ops.len() + second.ops.len());

    for op in &second.ops {
        match op {
            Op::Insert { .. } => ops.push(op.clone()),

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
                        Some(Op::Delete { .. }) => {
                            let length = cursor.peek_len();
                            ops.push(cursor.take(length));
                        }
                        Some(base_op) => {
                            let base_attributes = base_op.attributes().cloned();
                            let taken = cursor.take(remaining);
                            remaining -= taken.len();
                            ops.push(match taken {
                                // an insert is materialized content, so a
                                // Null here unsets the key instead of
                                // surviving as a tombstone
                                Op::Insert { value, .. } => Op::Insert {
                                    value,
                                    attributes: match attributes {
                                        Some(attributes) => apply_attributes(
                                            base_attributes.as_ref(),
                                            attributes,
                                        ),
                                        None => base_attributes,
                                    },
                                },
                                Op::Retain { length, .. } => Op::Retain {
                                    length,
                                    attributes: merge_attributes(
                                        base_attributes.as_ref(),
                                        attributes.as_ref(),
                                    ),
                                },
                                Op::Delete { .. } => unreachable!("deletes are handled above"),
                            });
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
                        Some(Op::Delete { .. }) => {
                            let length = cursor.peek_len();
                            ops.push(cursor.take(length));
                        }
                        Some(Op::Insert { .. }) => {
                            // deleting text `first` inserted: both vanish
                            remaining -= cursor.take(remaining).len();
                        }
                        Some(Op::Retain { .. }) => {
                            let taken = cursor.take(remaining).len();
                            remaining -= taken;
                            ops.push(Op::delete(taken));
                        }
                    }
                }
            }
        }
    }

    ops.append(&mut cursor.rest());

    Change {
        ops: normalize_ops(ops),
        source: None,
    }
}

/// Folds a batch of consecutive changes into one.
#[must_use]
pub fn flatten_deltas(changes: &[Change]) -> Change {
    changes
        .iter()
        .fold(Change::new(), |flattened, change| {
            flatten_two(&flattened, change)
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::delta::attributes::{AttrValue, AttributeMap};

    fn attrs(pairs: &[(&str, AttrValue)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn test_insert_then_retain_with_attributes() {
        let first = Change::new().insert("Hello");
        let second = Change::new().retain_attr(5, attrs(&[("b", 1.into())]));

        assert_eq!(
            flatten_two(&first, &second),
            Change::from_ops(vec![Op::insert_attr("Hello", attrs(&[("b", 1.into())]))])
        );
    }

    #[test]
    fn test_delete_cancels_insert() {
        let first = Change::new().retain(2).insert("Hello");
        let second = Change::new().retain(2).delete(5);

        assert_eq!(flatten_two(&first, &second), Change::new());
    }

    #[test]
    fn test_delete_against_retain_survives() {
        let first = Change::new().retain(3).insert("ab");
        let second = Change::new().delete(3);

        assert_eq!(
            flatten_two(&first, &second),
            Change::from_ops(vec![Op::delete(3), Op::insert("ab")])
        );
    }

    #[test]
    fn test_base_deletes_pass_through_in_place() {
        let first = Change::new().retain(1).delete(2).retain(3);
        let second = Change::new().retain(2).insert("x");

        assert_eq!(
            flatten_two(&first, &second),
            Change::new().retain(1).delete(2).retain(1).insert("x")
        );
    }

    #[test]
    fn test_retain_past_end_is_kept_then_normalized() {
        let first = Change::new().insert("ab");
        let second = Change::new().retain(5);

        assert_eq!(flatten_two(&first, &second), Change::new().insert("ab"));
    }

    #[test]
    fn test_null_attribute_kept_on_retain() {
        let first = Change::new().retain_attr(2, attrs(&[("b", 1.into())]));
        let second = Change::new().retain_attr(2, attrs(&[("b", AttrValue::Null)]));

        assert_eq!(
            flatten_two(&first, &second),
            Change::new().retain_attr(2, attrs(&[("b", AttrValue::Null)]))
        );
    }

    #[test]
    fn test_null_attribute_unsets_on_insert() {
        let plain = Change::new().insert("ab");
        let unset = Change::new().retain_attr(2, attrs(&[("b", AttrValue::Null)]));

        assert_eq!(flatten_two(&plain, &unset), plain);

        let styled = Change::new().insert_attr("ab", attrs(&[("b", 1.into())]));
        let restyle =
            Change::new().retain_attr(2, attrs(&[("b", AttrValue::Null), ("i", 1.into())]));

        assert_eq!(
            flatten_two(&styled, &restyle),
            Change::new().insert_attr("ab", attrs(&[("i", 1.into())]))
        );
    }

    #[test]
    fn test_flatten_batch() {
        let changes = vec![
            Change::new().insert("Hello world"),
            Change::new().retain(6).delete(5).insert("there"),
            Change::new().retain(5).insert(","),
        ];

        assert_eq!(
            flatten_deltas(&changes),
            Change::new().insert("Hello, there")
        );
    }

    #[test]
    fn test_provenance_is_dropped() {
        use crate::delta::change::SourceRev;

        let first = Change::new().insert("a").with_source(vec![SourceRev {
            uri: "doc1".to_owned(),
            rev: 1,
        }]);
        let second = Change::new().retain(1).insert("b");

        assert_eq!(flatten_two(&first, &second).source, None);
    }
}
