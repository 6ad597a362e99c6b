//! Merge/render engine — resolves overlapping annotations into spans
//!
//! Scans left to right. Whitespace characters become standalone spans. At
//! any other position every annotation whose phrase matches
//! case-insensitively *and* sits on a boundary at both ends is eligible; the
//! longest match wins, then the higher-precedence source, then the
//! lexicographically smaller phrase, then the smaller score. With no match
//! the whole non-whitespace run is emitted as plain text. The emitted spans
//! always tile the input exactly.

use super::types::{Annotation, Span, SpanKind};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Punctuation that counts as a phrase boundary, alongside whitespace and
/// the text edges. Apostrophes belong to words and are not listed.
pub const BOUNDARY_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '"', '(', ')', '[', ']', '{', '}', '<', '>', '-', '/', '\\',
    '*', '_', '~', '`', '\u{2013}', '\u{2014}', '\u{2026}', '\u{201C}', '\u{201D}', '\u{00AB}',
    '\u{00BB}',
];

/// Whether `c` separates words for matching purposes.
pub fn is_boundary(c: char) -> bool {
    c.is_whitespace() || BOUNDARY_PUNCTUATION.contains(&c)
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

struct Candidate<'a> {
    annotation: &'a Annotation,
    chars: Vec<char>,
}

impl Candidate<'_> {
    fn len(&self) -> usize {
        self.chars.len()
    }

    /// Ordering where `Greater` means "preferred".
    fn rank(&self, other: &Self) -> Ordering {
        let (a, b) = (self.annotation, other.annotation);
        self.len()
            .cmp(&other.len())
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| b.phrase.cmp(&a.phrase))
            .then_with(|| cmp_score(b.score, a.score))
    }
}

/// Total order on optional scores: a missing score sorts below any present one.
fn cmp_score(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Render `text` against a flat list of annotations from any sources.
pub fn render(text: &str, annotations: &[Annotation]) -> Vec<Span> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let n = chars.len();
    let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(text.len());

    let mut by_first: HashMap<char, Vec<Candidate<'_>>> = HashMap::new();
    for annotation in annotations {
        let phrase: Vec<char> = annotation.phrase.trim().chars().collect();
        let Some(&first) = phrase.first() else {
            continue;
        };
        by_first.entry(fold(first)).or_default().push(Candidate {
            annotation,
            chars: phrase,
        });
    }

    let matches_at = |i: usize, candidate: &Candidate<'_>| -> bool {
        let end = i + candidate.len();
        if end > n {
            return false;
        }
        let boundary_before = i == 0 || is_boundary(chars[i - 1].1);
        let boundary_after = end == n || is_boundary(chars[end].1);
        boundary_before
            && boundary_after
            && candidate
                .chars
                .iter()
                .zip(&chars[i..end])
                .all(|(p, (_, t))| chars_eq(*p, *t))
    };

    let mut spans = Vec::new();
    let mut i = 0;
    while i < n {
        let c = chars[i].1;
        if c.is_whitespace() {
            spans.push(span(text, byte_at(i), byte_at(i + 1), SpanKind::Whitespace));
            i += 1;
            continue;
        }

        let best = by_first
            .get(&fold(c))
            .into_iter()
            .flatten()
            .filter(|candidate| matches_at(i, *candidate))
            .max_by(|a, b| a.rank(b));

        if let Some(candidate) = best {
            let end = i + candidate.len();
            let annotation = candidate.annotation;
            spans.push(span(
                text,
                byte_at(i),
                byte_at(end),
                SpanKind::Annotated {
                    key: annotation.key.clone(),
                    source: annotation.source,
                    color: annotation.color,
                    score: annotation.score,
                },
            ));
            i = end;
            continue;
        }

        let mut end = i + 1;
        while end < n && !chars[end].1.is_whitespace() {
            end += 1;
        }
        spans.push(span(text, byte_at(i), byte_at(end), SpanKind::Plain));
        i = end;
    }
    spans
}

fn span(text: &str, start: usize, end: usize, kind: SpanKind) -> Span {
    Span {
        start,
        end,
        text: text[start..end].to_string(),
        kind,
    }
}
