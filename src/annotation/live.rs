//! Live annotation — the word under the caret, derived on every render

use super::render::BOUNDARY_PUNCTUATION;
use super::types::{phrase_key, Annotation, AnnotationSource};
use crate::connotation::ConnotationScorer;

/// The token enclosing `caret` (a char offset, clamped to the text length).
///
/// Extends left and right over non-whitespace, then trims whitespace and
/// boundary punctuation so `rain.` yields `rain`.
pub fn enclosing_token(text: &str, caret: usize) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let caret = caret.min(chars.len());

    let mut left = caret;
    while left > 0 && !chars[left - 1].is_whitespace() {
        left -= 1;
    }
    let mut right = caret;
    while right < chars.len() && !chars[right].is_whitespace() {
        right += 1;
    }

    let token: String = chars[left..right].iter().collect();
    let token = token.trim_matches(|c: char| c.is_whitespace() || BOUNDARY_PUNCTUATION.contains(&c));
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Build the transient live annotation for the caret position.
///
/// Returns `None` when the caret touches no token or the token is already
/// a user annotation (`is_user_key` receives the lowercase key).
pub fn live_annotation<F>(
    text: &str,
    caret: usize,
    is_user_key: F,
    scorer: &ConnotationScorer,
) -> Option<Annotation>
where
    F: Fn(&str) -> bool,
{
    let token = enclosing_token(text, caret)?;
    if is_user_key(&phrase_key(&token)) {
        return None;
    }
    Some(Annotation::scored(&token, AnnotationSource::Live, scorer))
}
