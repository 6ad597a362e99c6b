//! RAKE-style keyphrase extraction
//!
//! Candidates are contiguous n-grams of word tokens whose first and last
//! tokens are not stopwords. Each token scores `(degree + frequency) /
//! frequency` over all candidate occurrences; a phrase scores the sum of its
//! tokens. Results are re-counted against the source text and ranked
//! deterministically.

use super::stopwords::is_stopword;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Extraction parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    /// Longest n-gram considered
    pub max_n: usize,
    /// Minimum phrase score to keep
    pub min_score: f64,
    /// Minimum whole-word occurrences in the source text
    pub min_count: usize,
    /// Cap on returned phrases (`None` keeps all)
    pub max_phrases: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_n: 3,
            min_score: 1.0,
            min_count: 1,
            max_phrases: None,
        }
    }
}

/// A ranked keyphrase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyphrase {
    /// Surface form of the first occurrence, tokens joined by single spaces
    pub phrase: String,
    /// Lowercase comparison key
    pub key: String,
    pub score: f64,
    pub count: usize,
}

/// A word run in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub surface: &'a str,
    pub lower: String,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '\u{2019}'
}

/// Split text into runs of letters, digits and apostrophes.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (is_word_char(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                tokens.push(make_token(&text[s..idx]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(make_token(&text[s..]));
    }
    tokens
}

fn make_token(surface: &str) -> Token<'_> {
    Token {
        surface,
        lower: surface.to_lowercase(),
    }
}

struct Candidate {
    key: String,
    surface: String,
    tokens: Vec<String>,
}

/// Extract ranked keyphrases from `text`.
pub fn extract(text: &str, options: &ExtractOptions) -> Vec<Keyphrase> {
    let tokens = tokenize(text);
    let max_n = options.max_n.max(1);

    let mut degree: HashMap<&str, usize> = HashMap::new();
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for start in 0..tokens.len() {
        for n in 1..=max_n {
            let Some(window) = tokens.get(start..start + n) else {
                break;
            };
            let (first, last) = (&window[0], &window[n - 1]);
            if is_stopword(&first.lower) || is_stopword(&last.lower) {
                continue;
            }

            for token in window {
                *degree.entry(token.lower.as_str()).or_insert(0) += n - 1;
                *frequency.entry(token.lower.as_str()).or_insert(0) += 1;
            }

            let key = join(window.iter().map(|t| t.lower.as_str()));
            if seen.insert(key.clone()) {
                candidates.push(Candidate {
                    surface: join(window.iter().map(|t| t.surface)),
                    tokens: window.iter().map(|t| t.lower.clone()).collect(),
                    key,
                });
            }
        }
    }

    let token_score = |token: &str| -> f64 {
        let freq = frequency.get(token).copied().unwrap_or(0);
        if freq == 0 {
            return 0.0;
        }
        let deg = degree.get(token).copied().unwrap_or(0);
        (deg + freq) as f64 / freq as f64
    };

    let haystack = collapse_whitespace(&text.to_lowercase());

    let mut results: Vec<Keyphrase> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let score: f64 = candidate.tokens.iter().map(|t| token_score(t.as_str())).sum();
            if score < options.min_score {
                return None;
            }
            let count = count_whole_word(&haystack, &candidate.key);
            if count < options.min_count {
                return None;
            }
            Some(Keyphrase {
                phrase: candidate.surface,
                key: candidate.key,
                score,
                count,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| b.key.chars().count().cmp(&a.key.chars().count()))
            .then_with(|| a.key.cmp(&b.key))
    });

    if let Some(limit) = options.max_phrases {
        results.truncate(limit);
    }
    results
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

/// Replace every whitespace run with a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Count occurrences of `needle` in `haystack` not embedded in a larger word.
fn count_whole_word(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack
        .match_indices(needle)
        .filter(|(idx, _)| {
            let before = haystack[..*idx].chars().next_back();
            let after = haystack[idx + needle.len()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .count()
}
