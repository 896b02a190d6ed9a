use thiserror::Error;

use crate::delta::{change::Change, op::Op};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    #[error("cannot crop [{start}, {end}) out of content of length {length}")]
    CropOutOfBounds {
        start: usize,
        end: usize,
        length: usize,
    },

    #[error("expected a content made of inserts, found {op}")]
    NotContent { op: Op },

    #[error("content of length {length} is too short for a change needing {needed}")]
    ContentTooShort { length: usize, needed: usize },
}

/// Checks that a change qualifies as a content, i.e. consists of inserts
/// only.
pub fn ensure_content(content: &Change) -> Result<(), DeltaError> {
    match content
        .ops
        .iter()
        .find(|op| !matches!(op, Op::Insert { .. }))
    {
        Some(op) => Err(DeltaError::NotContent { op: op.clone() }),
        None => Ok(()),
    }
}
