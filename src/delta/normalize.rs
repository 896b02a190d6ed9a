use crate::delta::{
    change::{Change, merge_adjacent},
    op::Op,
};

/// Canonicalizes an op list: zero-length ops are dropped, adjacent
/// compatible ops are merged, and trailing attribute-less retains are
/// stripped (they only pad the change to the base length and carry no
/// information). Idempotent.
#[must_use]
pub fn normalize_ops(ops: Vec<Op>) -> Vec<Op> {
    let mut result: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops {
        if op.is_empty() {
            continue;
        }

        match result.last() {
            Some(last) => match merge_adjacent(last, &op) {
                Some(merged) => {
                    let index = result.len() - 1;
                    result[index] = merged;
                }
                None => result.push(op),
            },
            None => result.push(op),
        }
    }

    while matches!(
        result.last(),
        Some(Op::Retain {
            attributes: None,
            ..
        })
    ) {
        result.pop();
    }

    result
}

/// True when applying the change cannot alter any content: every op is an
/// attribute-less retain (or the change is empty).
#[must_use]
pub fn has_no_effect(change: &Change) -> bool {
    change.ops.iter().all(|op| {
        matches!(
            op,
            Op::Retain {
                attributes: None,
                ..
            }
        )
    })
}

#[must_use]
pub fn normalize_change(change: Change) -> Change {
    Change {
        ops: normalize_ops(change.ops),
        source: change.source,
    }
}

/// Normalizes a batch, dropping changes that have no effect at all.
#[must_use]
pub fn normalize_changes(changes: Vec<Change>) -> Vec<Change> {
    changes
        .into_iter()
        .filter(|change| !has_no_effect(change))
        .map(normalize_change)
        .collect()
}
