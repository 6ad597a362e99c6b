//! Annotation and span types

use crate::connotation::{clamp_score, color_of, Color, ConnotationScorer};
use serde::{Deserialize, Serialize};

/// Where an annotation came from.
///
/// Variant order is precedence order: `User` beats `Live` beats `Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationSource {
    Auto,
    Live,
    User,
}

impl AnnotationSource {
    /// Numeric precedence: user=3, live=2, auto=1.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Auto => 1,
            Self::Live => 2,
            Self::User => 3,
        }
    }
}

impl std::fmt::Display for AnnotationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Live => write!(f, "live"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Comparison key for a phrase: trimmed and lowercased.
pub fn phrase_key(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

/// A colored phrase to highlight wherever it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Original-case phrase, trimmed
    pub phrase: String,
    /// Lowercase comparison key
    pub key: String,
    pub color: Color,
    pub source: AnnotationSource,
    /// Connotation score in [-1, 1], when one was computed
    #[serde(default)]
    pub score: Option<f64>,
}

impl Annotation {
    /// Build an annotation whose color derives from `score` (neutral when absent).
    ///
    /// The score is clamped to [-1, 1]; non-finite values become 0.
    pub fn new(phrase: &str, source: AnnotationSource, score: Option<f64>) -> Self {
        let phrase = phrase.trim().to_string();
        let score = score.map(clamp_score);
        Self {
            key: phrase_key(&phrase),
            color: color_of(score.unwrap_or(0.0)),
            phrase,
            source,
            score,
        }
    }

    /// Build an annotation scored by `scorer`.
    pub fn scored(phrase: &str, source: AnnotationSource, scorer: &ConnotationScorer) -> Self {
        Self::new(phrase, source, Some(scorer.score(phrase)))
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

/// What a span of rendered text is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpanKind {
    /// A single whitespace character
    Whitespace,
    /// An unannotated run of non-whitespace characters
    Plain,
    /// A phrase match
    Annotated {
        key: String,
        source: AnnotationSource,
        color: Color,
        score: Option<f64>,
    },
}

/// A contiguous slice of the rendered text.
///
/// `start`/`end` are byte offsets into the input; the spans of one render
/// pass tile the input exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(flatten)]
    pub kind: SpanKind,
}

impl Span {
    pub fn is_annotated(&self) -> bool {
        matches!(self.kind, SpanKind::Annotated { .. })
    }

    /// Source of the annotation covering this span, if any.
    pub fn source(&self) -> Option<AnnotationSource> {
        match &self.kind {
            SpanKind::Annotated { source, .. } => Some(*source),
            _ => None,
        }
    }
}
