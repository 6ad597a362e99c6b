//! Phrase annotation: types, the merge/render engine, and live derivation

mod live;
mod render;
mod types;

pub use live::{enclosing_token, live_annotation};
pub use render::{is_boundary, render, BOUNDARY_PUNCTUATION};
pub use types::{phrase_key, Annotation, AnnotationSource, Span, SpanKind};
