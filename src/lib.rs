//! An operational-transformation core for collaborative text editing.
//!
//! Text lives as quill-style deltas: a [`Change`] is a sequence of
//! insert/retain/delete [`Op`]s, and a content is a change made of inserts
//! only. On top of the pure change algebra (compose, transform, invert,
//! crop) sit:
//!
//! - [`SharedString`], a branch-aware fragment string that makes concurrent
//!   edits commute and powers [`History::merge`],
//! - [`Document`], a named document over a [`History`] log,
//! - the excerpt subsystem, which quotes a range of one document into
//!   another behind paired zero-width markers and keeps the quote
//!   synchronizable as both sides evolve.

pub mod delta;
pub mod document;
pub mod excerpt;
pub mod filter;
pub mod history;
pub mod range;
pub mod shared_string;

pub use delta::{
    AttrValue, AttributeMap, Change, DeltaError, EmbedValue, InsertValue, Op, SourceRev,
    content_length, crop_content, flatten_deltas, flatten_transformed_delta, flatten_two,
    invert_change, normalize_changes, normalize_ops, transform_deltas, transform_position,
};
pub use document::{Document, DocumentError, PartialMarker};
pub use excerpt::{
    Excerpt, ExcerptError, ExcerptKey, ExcerptSource, ExcerptSync, ExcerptTarget, MarkerSide,
};
pub use filter::{filter_changes, filter_out_changes_by_indices};
pub use history::{History, MemoryHistory, MergeResult, SERVER_BRANCH};
pub use range::Range;
pub use shared_string::{Branch, Fragment, SharedString};
