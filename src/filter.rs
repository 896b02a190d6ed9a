//! Removing changes from the middle of a history without touching what the
//! kept changes did: each rejected change is neutralized by applying it and
//! immediately undoing it, and every later change is rebased over that
//! do-then-undo pair.

use crate::delta::{
    change::{Change, content_length, min_content_length_for_change},
    error::DeltaError,
    invert::invert_change,
};
use crate::shared_string::SharedString;

// internal branch labels for the do/undo pair
const KEPT: &str = "O";
const UNDONE: &str = "X";

/// Returns the kept changes, rebased so that applying them to
/// `base_content` yields the same text as applying all of `changes` minus
/// the rejected ones. Quadratic in the number of changes; meant for bounded
/// history windows.
pub fn filter_changes(
    base_content: &Change,
    changes: &[Change],
    mut keep: impl FnMut(usize, &Change) -> bool,
) -> Result<Vec<Change>, DeltaError> {
    if changes.is_empty() {
        return Ok(Vec::new());
    }

    let length = content_length(base_content);
    let needed = min_content_length_for_change(&changes[0]);
    if length < needed {
        return Err(DeltaError::ContentTooShort { length, needed });
    }

    let mut filtered = Vec::new();
    let mut altered = changes.to_vec();
    let mut ss = SharedString::from_content(base_content);

    for index in 0..altered.len() {
        if keep(index, &altered[index]) {
            let kept = altered[index].clone();
            ss.apply_change(&kept, KEPT);
            filtered.push(kept);
            continue;
        }

        let target = altered[index].clone();
        let undo = invert_change(&ss.to_delta(), &target)?;

        let mut speculative = ss.clone();
        speculative.apply_change(&target, KEPT);
        let mut speculative = SharedString::from_content(&speculative.to_delta());
        speculative.apply_change(&undo, UNDONE);

        for later in altered.iter_mut().skip(index + 1) {
            *later = speculative.apply_change(later, KEPT);
        }
    }

    Ok(filtered)
}

/// Filters out the changes at the given indices.
pub fn filter_out_changes_by_indices(
    base_content: &Change,
    changes: &[Change],
    indices_to_remove: &[usize],
) -> Result<Vec<Change>, DeltaError> {
    filter_changes(base_content, changes, |index, _| {
        !indices_to_remove.contains(&index)
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::delta::compose::flatten_deltas;
    use crate::delta::compose::flatten_two;

    fn apply_all(base: &Change, changes: &[Change]) -> Change {
        changes
            .iter()
            .fold(base.clone(), |content, change| {
                flatten_two(&content, change)
            })
    }

    #[test]
    fn test_keep_everything_is_identity() {
        let base = Change::new().insert("hello");
        let changes = vec![
            Change::new().retain(5).insert(" world"),
            Change::new().delete(1).insert("H"),
        ];

        assert_eq!(
            filter_changes(&base, &changes, |_, _| true),
            Ok(changes.clone())
        );
    }

    #[test]
    fn test_removed_change_leaves_no_trace() {
        let base = Change::new().insert("hello world");
        let changes = vec![
            Change::new().retain(5).insert(","),             // "hello, world"
            Change::new().retain(7).delete(5).insert("you"), // "hello, you"
            Change::new().retain(5).insert("!"),             // "hello!, you"
        ];

        let kept = filter_out_changes_by_indices(&base, &changes, &[1]).unwrap();

        assert_eq!(kept.len(), 2);
        assert_eq!(
            apply_all(&base, &kept),
            Change::new().insert("hello!, world")
        );
    }

    #[test]
    fn test_removing_the_only_change() {
        let base = Change::new().insert("abc");
        let changes = vec![Change::new().retain(3).insert("d")];

        let kept = filter_out_changes_by_indices(&base, &changes, &[0]).unwrap();

        assert_eq!(kept, Vec::<Change>::new());
        assert_eq!(apply_all(&base, &kept), base);
    }

    #[test]
    fn test_base_too_short() {
        let base = Change::new().insert("ab");
        let changes = vec![Change::new().retain(5).insert("x")];

        assert_eq!(
            filter_changes(&base, &changes, |_, _| true),
            Err(DeltaError::ContentTooShort {
                length: 2,
                needed: 5,
            })
        );
    }

    #[test]
    fn test_flatten_matches_filtered_flatten() {
        let base = Change::new().insert("The quick brown fox");
        let changes = vec![
            Change::new().retain(4).delete(5).insert("slow"),
            Change::new().retain(9).delete(5).insert("red"),
            Change::new().retain(16).insert(" jumps"),
        ];

        let all = flatten_deltas(
            &std::iter::once(base.clone())
                .chain(changes.iter().cloned())
                .collect::<Vec<_>>(),
        );
        assert_eq!(all, Change::new().insert("The slow red fox jumps"));

        let kept = filter_out_changes_by_indices(&base, &changes, &[0]).unwrap();
        assert_eq!(
            apply_all(&base, &kept),
            Change::new().insert("The quick red fox jumps")
        );
    }
}
