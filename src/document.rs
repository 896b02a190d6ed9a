//! The orchestrator: a named document on top of a [`History`] log, plus the
//! excerpt lifecycle (take, paste, scan, marker update, sync).

use thiserror::Error;

use crate::delta::{
    change::{Change, SourceRev, content_length},
    error::DeltaError,
    invert::{crop_content, invert_change},
    op::Op,
};
use crate::excerpt::{
    Excerpt, ExcerptError, ExcerptKey, ExcerptSource, ExcerptSync, ExcerptTarget,
    marker::{
        self, MarkerSide, decompose_marker, is_excerpt_marker, make_marker, mark_copied,
        marker_side,
    },
};
use crate::history::{History, MemoryHistory, MergeResult};
use crate::range::Range;

/// Branch label for changes merged into a document from outside (syncs,
/// undo). Sorts after [`crate::history::SERVER_BRANCH`], so stored changes
/// win same-position insert ties.
const MERGE_BRANCH: &str = "$simulate$";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("invalid revision {rev}")]
    InvalidRevision { rev: usize },

    #[error("content holds a non-insert op: {op}")]
    InvalidContent { op: Op },

    #[error("{side} marker missing or stale at position {position} of revision {rev}")]
    MarkerCheckFailed {
        side: &'static str,
        position: usize,
        rev: usize,
    },

    #[error("both excerpt markers are lost")]
    MarkerNotFound,

    #[error("excerpt source mismatch: expected {expected}, found {actual}")]
    SourceMismatch { expected: String, actual: String },

    #[error("number of full excerpts changed from {before} to {after}")]
    ExcerptCountChanged { before: usize, after: usize },

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error(transparent)]
    Excerpt(#[from] ExcerptError),
}

/// A marker whose pair is missing, found by [`Document::get_partial_excerpts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMarker {
    pub offset: usize,
    pub side: MarkerSide,
    pub excerpt: Excerpt,
}

#[derive(Debug, Clone)]
pub struct Document<H: History = MemoryHistory> {
    name: String,
    history: H,
}

impl Document<MemoryHistory> {
    #[must_use]
    pub fn new(name: &str, content: Change) -> Self {
        Document {
            name: name.to_owned(),
            history: MemoryHistory::new(name, content),
        }
    }

    #[must_use]
    pub fn from_text(name: &str, text: &str) -> Self {
        Document::new(name, Change::from_text(text))
    }
}

impl<H: History> Document<H> {
    #[must_use]
    pub fn with_history(name: &str, history: H) -> Self {
        Document {
            name: name.to_owned(),
            history,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub fn current_rev(&self) -> usize { self.history.current_rev() }

    #[must_use]
    pub fn get_content(&self) -> Change { self.history.get_content() }

    #[must_use]
    pub fn get_content_at(&self, rev: usize) -> Change { self.history.get_content_at(rev) }

    pub fn append(&mut self, changes: Vec<Change>) -> usize { self.history.append(changes) }

    pub fn merge(&mut self, base_rev: usize, changes: Vec<Change>) -> MergeResult {
        self.history.merge(base_rev, MERGE_BRANCH, changes)
    }

    #[must_use]
    pub fn get_change(&self, rev: usize) -> Option<Change> { self.history.get_change(rev) }

    #[must_use]
    pub fn get_changes_from(&self, rev: usize) -> Vec<Change> {
        self.history.get_changes_from(rev)
    }

    #[must_use]
    pub fn get_changes_from_to(&self, from: usize, to: usize) -> Vec<Change> {
        self.history.get_changes_from_to(from, to)
    }

    pub fn take(&self, start: usize, end: usize) -> Result<Change, DocumentError> {
        Ok(crop_content(&self.get_content(), start, end)?)
    }

    pub fn take_at(&self, rev: usize, start: usize, end: usize) -> Result<Change, DocumentError> {
        Ok(crop_content(&self.get_content_at(rev), start, end)?)
    }

    /// Crops `[start, end)` of the current content into a portable source.
    /// Markers caught inside the span are tagged `copied` so the pasted
    /// duplicate never collides with the original in later scans.
    pub fn take_excerpt(&self, start: usize, end: usize) -> Result<ExcerptSource, DocumentError> {
        self.take_excerpt_at(self.current_rev(), start, end)
    }

    pub fn take_excerpt_at(
        &self,
        rev: usize,
        start: usize,
        end: usize,
    ) -> Result<ExcerptSource, DocumentError> {
        let cropped = self.take_at(rev, start, end)?;
        Ok(ExcerptSource {
            uri: self.name.clone(),
            rev,
            start,
            end,
            content: Change::from_ops(mark_copied(&cropped.ops)),
        })
    }

    /// Pastes a source at `offset`: one appended change inserting the left
    /// marker, the source content and the right marker. The returned
    /// excerpt's target covers `[offset, offset + len + 1)`, with the right
    /// marker sitting at the target's `end`.
    pub fn paste_excerpt(
        &mut self,
        offset: usize,
        source: &ExcerptSource,
        check: bool,
    ) -> Result<Excerpt, DocumentError> {
        let rev = self.current_rev() + 1;
        let target = ExcerptTarget::new(
            &self.name,
            rev,
            offset,
            offset + content_length(&source.content) + 1,
        );

        let pasted = marker::paste_with_markers(&source.key(), &source.content, &target);
        let mut ops = Vec::with_capacity(pasted.ops.len() + 1);
        if offset > 0 {
            ops.push(Op::retain(offset));
        }
        ops.extend(pasted.ops);
        self.history.append(vec![Change::from_ops(ops)]);

        if check {
            self.expect_marker(&self.get_content(), target.start, MarkerSide::Left, &target)?;
            self.expect_marker(&self.get_content(), target.end, MarkerSide::Right, &target)?;
        }

        Ok(Excerpt {
            source: source.key(),
            target,
        })
    }

    /// All matched left/right marker pairs in the current content, with the
    /// offset of each pair's right marker. Copied markers are ignored.
    pub fn get_full_excerpts(&self) -> Result<Vec<(usize, Excerpt)>, DocumentError> {
        let mut excerpts = Vec::new();
        self.scan_markers(|full, _, offset, op| {
            if full {
                excerpts.push((offset, decompose_marker(op)?));
            }
            Ok(())
        })?;
        Ok(excerpts)
    }

    /// Markers whose pair is missing: the symmetric difference of the left
    /// and right marker sets.
    pub fn get_partial_excerpts(&self) -> Result<Vec<PartialMarker>, DocumentError> {
        let mut partial: Vec<PartialMarker> = Vec::new();
        self.scan_markers(|full, side, offset, op| {
            let key = decompose_marker(op)?;
            if full {
                partial.retain(|candidate| candidate.excerpt != key);
            } else {
                partial.retain(|candidate| candidate.excerpt != key);
                partial.push(PartialMarker {
                    offset,
                    side,
                    excerpt: key,
                });
            }
            Ok(())
        })?;
        Ok(partial)
    }

    /// The changes of this (source) document since the excerpt was taken,
    /// cropped to the excerpted range as it moves, tagged with provenance,
    /// and paired with the range after each step.
    #[must_use]
    pub fn get_sync_since_excerpted(&self, source: &ExcerptKey) -> Vec<ExcerptSync> {
        let changes = self.get_changes_from(source.rev);
        self.compose_syncs(source, self.current_rev(), &changes)
    }

    /// Like [`Self::get_sync_since_excerpted`], for the single change based
    /// on the source's revision.
    #[must_use]
    pub fn get_single_sync_since_excerpted(&self, source: &ExcerptKey) -> Vec<ExcerptSync> {
        let changes = self.get_changes_from_to(source.rev, source.rev);
        self.compose_syncs(source, source.rev + 1, &changes)
    }

    fn compose_syncs(
        &self,
        source: &ExcerptKey,
        last_rev: usize,
        changes: &[Change],
    ) -> Vec<ExcerptSync> {
        let range = source.range();
        let cropped = range.crop_changes(changes);
        let ranges = range.map_changes(changes);
        let first_rev = last_rev + 1 - changes.len();

        cropped
            .into_iter()
            .zip(ranges)
            .enumerate()
            .map(|(index, (change, range))| ExcerptSync {
                uri: source.uri.clone(),
                rev: first_rev + index,
                change: Change {
                    ops: mark_copied(&change.ops),
                    source: Some(vec![SourceRev {
                        uri: source.uri.clone(),
                        rev: source.rev + index,
                    }]),
                },
                range,
            })
            .collect()
    }

    /// Re-locates a target whose markers were valid at `target.rev` in the
    /// current revision and appends a change replacing the stale markers
    /// with fresh ones (optionally carrying a new source identity). All
    /// validation happens before anything is appended; with `revive`, one
    /// missing side is reconstructed, both missing is unrecoverable.
    pub fn update_excerpt_markers(
        &mut self,
        target: &ExcerptTarget,
        new_source: Option<&ExcerptKey>,
        check: bool,
        revive: bool,
    ) -> Result<ExcerptTarget, DocumentError> {
        let full_before = if check {
            self.get_full_excerpts()?.len()
        } else {
            0
        };

        if check {
            let old_content = self.get_content_at(target.rev);
            self.expect_marker(&old_content, target.start, MarkerSide::Left, target)?;
            self.expect_marker(&old_content, target.end, MarkerSide::Right, target)?;
        }

        if target.rev == self.current_rev() {
            return Ok(target.clone());
        }

        // the +1/-1 pulls the right marker itself inside the tracked span
        let changes = self.get_changes_from(target.rev);
        let tracked = Range::new(target.start, target.end + 1).apply_changes(&changes);
        let new_range = Range::new(tracked.start, tracked.end - 1);

        let content = self.get_content();
        let left = self.marker_matching(&content, new_range.start, MarkerSide::Left, target);
        let right = self.marker_matching(&content, new_range.end, MarkerSide::Right, target);

        let (mut revive_left, mut revive_right) = (false, false);
        if check || revive {
            if left.is_none() {
                if revive {
                    revive_left = true;
                } else {
                    return Err(DocumentError::MarkerCheckFailed {
                        side: MarkerSide::Left.as_str(),
                        position: new_range.start,
                        rev: self.current_rev(),
                    });
                }
            }
            if right.is_none() {
                if revive {
                    revive_right = true;
                } else {
                    return Err(DocumentError::MarkerCheckFailed {
                        side: MarkerSide::Right.as_str(),
                        position: new_range.end,
                        rev: self.current_rev(),
                    });
                }
            }
            if revive_left && revive_right {
                return Err(DocumentError::MarkerNotFound);
            }
        }

        let new_source = match (&left, new_source) {
            (Some(op), Some(key)) => {
                let decoded = decompose_marker(op)?.source;
                if decoded.uri != key.uri {
                    return Err(DocumentError::SourceMismatch {
                        expected: key.uri.clone(),
                        actual: decoded.uri,
                    });
                }
                key.clone()
            }
            (Some(op), None) => decompose_marker(op)?.source,
            (None, Some(key)) => key.clone(),
            (None, None) => return Err(DocumentError::MarkerNotFound),
        };

        let new_target = ExcerptTarget::new(
            &target.uri,
            self.current_rev() + 1,
            new_range.start,
            new_range.end,
        );

        let mut ops = vec![Op::retain(new_target.start)];
        if !revive_left {
            ops.push(Op::delete(1));
        }
        ops.push(make_marker(MarkerSide::Left, &new_source, &new_target));
        ops.push(Op::retain(new_target.end - new_target.start - 1));
        if !revive_right {
            ops.push(Op::delete(1));
        }
        ops.push(make_marker(MarkerSide::Right, &new_source, &new_target));
        self.history.append(vec![Change::from_ops(ops)]);

        if check {
            let content = self.get_content();
            self.expect_marker(&content, new_target.start, MarkerSide::Left, &new_target)?;
            self.expect_marker(&content, new_target.end, MarkerSide::Right, &new_target)?;

            let full_after = self.get_full_excerpts()?.len();
            if full_after != full_before {
                return Err(DocumentError::ExcerptCountChanged {
                    before: full_before,
                    after: full_after,
                });
            }
        }

        Ok(new_target)
    }

    /// Replays source-side syncs into this (target) document: shifts each
    /// change into the pasted span, merges at the target's base revision,
    /// then refreshes the markers with the synced source identity.
    pub fn sync_excerpt(
        &mut self,
        syncs: &[ExcerptSync],
        initial_target: &ExcerptTarget,
        check: bool,
    ) -> Result<ExcerptTarget, DocumentError> {
        let shifted = syncs
            .iter()
            .map(|sync| Change {
                source: Some(vec![SourceRev {
                    uri: sync.uri.clone(),
                    rev: sync.rev,
                }]),
                ..change_shifted(&sync.change, initial_target.start + 1)
            })
            .collect();
        self.merge(initial_target.rev, shifted);

        let new_source = syncs.last().map(|last| {
            ExcerptKey::new(&last.uri, last.rev, last.range.start, last.range.end)
        });
        let target =
            self.update_excerpt_markers(initial_target, new_source.as_ref(), true, false)?;

        if check {
            let content = self.get_content();
            let left = self
                .marker_at(&content, target.start)
                .filter(|op| marker_side(op) == Some(MarkerSide::Left))
                .ok_or(DocumentError::MarkerCheckFailed {
                    side: MarkerSide::Left.as_str(),
                    position: target.start,
                    rev: self.current_rev(),
                })?;
            let right = self
                .marker_at(&content, target.end)
                .filter(|op| marker_side(op) == Some(MarkerSide::Right))
                .ok_or(DocumentError::MarkerCheckFailed {
                    side: MarkerSide::Right.as_str(),
                    position: target.end,
                    rev: self.current_rev(),
                })?;
            let (left, right) = (decompose_marker(&left)?, decompose_marker(&right)?);
            if left != right {
                return Err(DocumentError::MarkerNotFound);
            }
        }

        Ok(ExcerptTarget::new(
            &self.name,
            self.current_rev(),
            target.start,
            target.end,
        ))
    }

    /// Appends the inverse of the change that produced `rev`, rebased over
    /// everything that came after it. Undo never rewrites history.
    pub fn undo_at(&mut self, rev: usize) -> Result<(), DocumentError> {
        if rev == 0 || rev > self.current_rev() {
            return Err(DocumentError::InvalidRevision { rev });
        }

        let base = self.get_content_at(rev - 1);
        let change = self
            .get_change(rev)
            .ok_or(DocumentError::InvalidRevision { rev })?;
        let undo = invert_change(&base, &change)?;
        self.history.merge(rev, MERGE_BRANCH, vec![undo]);
        Ok(())
    }

    /// Walks the current content, invoking the callback for every live
    /// marker with whether it closes a matched pair, its side and offset.
    fn scan_markers(
        &self,
        mut visit: impl FnMut(bool, MarkerSide, usize, &Op) -> Result<(), DocumentError>,
    ) -> Result<(), DocumentError> {
        let content = self.get_content();
        let mut open: Vec<(String, Op)> = Vec::new();
        let mut offset = 0;

        for op in &content.ops {
            let Op::Insert { value, .. } = op else {
                return Err(DocumentError::InvalidContent { op: op.clone() });
            };

            if is_excerpt_marker(op, false) {
                let identity = pair_identity(op);
                match marker_side(op) {
                    Some(MarkerSide::Left) => {
                        open.retain(|(key, _)| *key != identity);
                        open.push((identity, op.clone()));
                        visit(false, MarkerSide::Left, offset, op)?;
                    }
                    Some(MarkerSide::Right) => {
                        let matched = open.iter().any(|(key, _)| *key == identity);
                        open.retain(|(key, _)| *key != identity);
                        visit(matched, MarkerSide::Right, offset, op)?;
                    }
                    None => {}
                }
            }

            offset += value.len();
        }

        Ok(())
    }

    /// The op sitting exactly at `position` of the content, if the position
    /// is op-aligned.
    fn marker_at(&self, content: &Change, position: usize) -> Option<Op> {
        let mut offset = 0;
        for op in &content.ops {
            if offset == position {
                return is_excerpt_marker(op, false).then(|| op.clone());
            }
            if offset > position {
                break;
            }
            offset += op.len();
        }
        None
    }

    /// The marker at `position` if it is the given side of the given target.
    fn marker_matching(
        &self,
        content: &Change,
        position: usize,
        side: MarkerSide,
        target: &ExcerptTarget,
    ) -> Option<Op> {
        self.marker_at(content, position)
            .filter(|op| marker_side(op) == Some(side))
            .filter(|op| {
                decompose_marker(op).is_ok_and(|excerpt| excerpt.target == *target)
            })
    }

    fn expect_marker(
        &self,
        content: &Change,
        position: usize,
        side: MarkerSide,
        target: &ExcerptTarget,
    ) -> Result<(), DocumentError> {
        self.marker_matching(content, position, side, target)
            .map(|_| ())
            .ok_or(DocumentError::MarkerCheckFailed {
                side: side.as_str(),
                position,
                rev: self.current_rev(),
            })
    }
}

/// Left and right markers of one pair share the encoded source and the
/// target identity.
fn pair_identity(op: &Op) -> String {
    match decompose_marker(op) {
        Ok(excerpt) => format!(
            "{}/{}@{}",
            excerpt.source, excerpt.target.uri, excerpt.target.rev
        ),
        Err(_) => String::new(),
    }
}

/// Shifts a change right by `offset`, folding the shift into a leading
/// retain when there is one.
fn change_shifted(change: &Change, offset: usize) -> Change {
    let mut ops = change.ops.clone();
    match ops.first_mut() {
        Some(Op::Retain { length, .. }) => *length += offset,
        _ => ops.insert(0, Op::retain(offset)),
    }
    Change {
        ops,
        source: change.source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_change_shifted() {
        assert_eq!(
            change_shifted(&Change::new().retain(2).insert("x"), 5),
            Change::new().retain(7).insert("x")
        );
        assert_eq!(
            change_shifted(&Change::new().insert("x"), 5),
            Change::new().retain(5).insert("x")
        );
        assert_eq!(
            change_shifted(&Change::new().delete(1), 5),
            Change::new().retain(5).delete(1)
        );
    }

    #[test]
    fn test_undo_at_bounds() {
        let mut doc = Document::from_text("doc", "hello");

        assert_eq!(
            doc.undo_at(0),
            Err(DocumentError::InvalidRevision { rev: 0 })
        );
        assert_eq!(
            doc.undo_at(1),
            Err(DocumentError::InvalidRevision { rev: 1 })
        );
    }

    #[test]
    fn test_undo_at_is_additive() {
        let mut doc = Document::from_text("doc", "hello");
        doc.append(vec![Change::new().retain(5).insert(" world")]);
        doc.append(vec![Change::new().retain(11).insert("!")]);

        doc.undo_at(1).unwrap();

        assert_eq!(doc.current_rev(), 3);
        assert_eq!(doc.get_content(), Change::new().insert("hello!"));
    }
}
