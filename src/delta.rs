//! The change algebra: quill-style ops and changes, composition,
//! transformation, inversion and cropping. Everything here is pure; the
//! stateful pieces (`SharedString`, `Document`) build on these functions.

pub mod attributes;
pub mod change;
pub mod compose;
pub mod error;
pub mod invert;
pub mod normalize;
pub mod op;
pub mod transform;

pub use attributes::{AttrValue, AttributeMap, apply_attributes, merge_attributes};
pub use change::{
    Change, SourceRev, content_length, content_length_increased, content_text, delta_length,
    min_content_length_for_change,
};
pub use compose::{flatten_deltas, flatten_two};
pub use error::{DeltaError, ensure_content};
pub use invert::{apply_change_to_content, crop_content, invert_change};
pub use normalize::{has_no_effect, normalize_change, normalize_changes, normalize_ops};
pub use op::{EmbedValue, InsertValue, Op};
pub use transform::{flatten_transformed_delta, transform_deltas, transform_position};
