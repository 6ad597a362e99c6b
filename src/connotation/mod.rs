//! Connotation scoring — bounded lexicon lookup with deterministic fallback
//!
//! `score` is not a language model: an exact lexicon hit wins, otherwise the
//! known tokens are averaged, otherwise the phrase is neutral.

mod color;
mod lexicon;

pub use color::{band, color_of, Color, BANDS};
pub use lexicon::{Lexicon, LexiconError};

pub(crate) use color::clamp_score;

/// Scores phrases against a lexicon.
#[derive(Debug, Clone)]
pub struct ConnotationScorer {
    lexicon: Lexicon,
}

impl Default for ConnotationScorer {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

impl ConnotationScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Connotation of `phrase`, in [-1, 1].
    pub fn score(&self, phrase: &str) -> f64 {
        let key = lexicon::normalize(phrase);
        if key.is_empty() {
            return 0.0;
        }
        if let Some(score) = self.lexicon.get(&key) {
            return clamp_score(score);
        }

        let known: Vec<f64> = key
            .split_whitespace()
            .filter_map(|token| self.lexicon.get(token))
            .collect();
        if known.is_empty() {
            return 0.0;
        }
        clamp_score(known.iter().sum::<f64>() / known.len() as f64)
    }

    /// Score and color in one call.
    pub fn assess(&self, phrase: &str) -> (f64, Color) {
        let score = self.score(phrase);
        (score, color_of(score))
    }
}
