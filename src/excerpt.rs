//! Cross-document quoting. An excerpt is a span of a source document pasted
//! into a target document, bracketed by a pair of zero-width marker embeds
//! that keep enough identity to locate, re-validate and re-synchronize the
//! quote after both sides have been edited.

pub mod marker;

use core::fmt::Display;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::delta::{change::Change, op::Op};
use crate::range::Range;

pub use marker::MarkerSide;

/// The decoded identity of an excerpted span: which document, at which
/// revision, over which range. This is the structured form of the encoded
/// `uri?rev=R&start=S&end=E` string carried inside marker embeds; the raw
/// string never travels past the codec.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptKey {
    pub uri: String,
    pub rev: usize,
    pub start: usize,
    pub end: usize,
}

impl ExcerptKey {
    #[must_use]
    pub fn new(uri: &str, rev: usize, start: usize, end: usize) -> Self {
        ExcerptKey {
            uri: uri.to_owned(),
            rev,
            start,
            end,
        }
    }

    #[must_use]
    pub fn range(&self) -> Range { Range::new(self.start, self.end) }
}

impl Display for ExcerptKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}?rev={}&start={}&end={}",
            self.uri, self.rev, self.start, self.end
        )
    }
}

/// A taken excerpt: its identity plus the materialized content of the span.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptSource {
    pub uri: String,
    pub rev: usize,
    pub start: usize,
    pub end: usize,
    pub content: Change,
}

impl ExcerptSource {
    #[must_use]
    pub fn key(&self) -> ExcerptKey { ExcerptKey::new(&self.uri, self.rev, self.start, self.end) }
}

/// Where a paste landed: `[start, end)` covers the left marker and the
/// content; the right marker sits at `end`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptTarget {
    pub uri: String,
    pub rev: usize,
    pub start: usize,
    pub end: usize,
}

impl ExcerptTarget {
    #[must_use]
    pub fn new(uri: &str, rev: usize, start: usize, end: usize) -> Self {
        ExcerptTarget {
            uri: uri.to_owned(),
            rev,
            start,
            end,
        }
    }
}

/// A source/target pairing, as decoded from a marker.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    pub source: ExcerptKey,
    pub target: ExcerptTarget,
}

/// One replayable slice of source-document history: the change cropped to
/// the excerpted range, the source revision it produces, and where the
/// range sits after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptSync {
    pub uri: String,
    pub rev: usize,
    pub change: Change,
    pub range: Range,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExcerptError {
    #[error("op is not an excerpt marker: {op}")]
    NotAMarker { op: Op },

    #[error("malformed excerpt uri: {uri}")]
    BadUri { uri: String },
}
