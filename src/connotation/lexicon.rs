//! Connotation lexicon — bounded word/phrase → score table

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Errors loading an external lexicon.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lexicon parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Built-in entries. Multi-word keys are matched exactly before any
/// token averaging, which lets negations and idioms override their parts.
const BUILTIN: &[(&str, f64)] = &[
    ("love", 0.9),
    ("loved", 0.85),
    ("joy", 0.85),
    ("happy", 0.8),
    ("wonderful", 0.85),
    ("excellent", 0.9),
    ("amazing", 0.85),
    ("beautiful", 0.75),
    ("brilliant", 0.8),
    ("calm", 0.4),
    ("hope", 0.6),
    ("hopeful", 0.6),
    ("kind", 0.55),
    ("warm", 0.45),
    ("bright", 0.45),
    ("good", 0.5),
    ("great", 0.7),
    ("nice", 0.4),
    ("fine", 0.2),
    ("better", 0.35),
    ("best", 0.75),
    ("success", 0.7),
    ("win", 0.6),
    ("gentle", 0.45),
    ("grateful", 0.75),
    ("peace", 0.65),
    ("safe", 0.4),
    ("free", 0.45),
    ("growth", 0.4),
    ("progress", 0.45),
    ("clear", 0.25),
    ("strong", 0.4),
    ("trust", 0.55),
    ("friend", 0.5),
    ("laugh", 0.6),
    ("smile", 0.6),
    ("hate", -0.9),
    ("hated", -0.85),
    ("awful", -0.85),
    ("terrible", -0.85),
    ("horrible", -0.85),
    ("sad", -0.7),
    ("angry", -0.75),
    ("anger", -0.7),
    ("fear", -0.7),
    ("afraid", -0.65),
    ("anxious", -0.6),
    ("stress", -0.55),
    ("stressed", -0.6),
    ("tired", -0.4),
    ("bad", -0.6),
    ("worse", -0.6),
    ("worst", -0.85),
    ("pain", -0.7),
    ("hurt", -0.65),
    ("lost", -0.45),
    ("lonely", -0.6),
    ("broken", -0.6),
    ("fail", -0.65),
    ("failure", -0.7),
    ("problem", -0.4),
    ("wrong", -0.5),
    ("dark", -0.3),
    ("cold", -0.3),
    ("boring", -0.45),
    ("difficult", -0.35),
    ("hard", -0.2),
    ("cry", -0.55),
    ("worry", -0.5),
    ("guilt", -0.6),
    ("not good", -0.5),
    ("not bad", 0.3),
    ("no problem", 0.35),
    ("well done", 0.7),
    ("give up", -0.55),
    ("fall apart", -0.7),
];

/// Shape of an external lexicon file: a flat YAML mapping.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct LexiconFile(BTreeMap<String, f64>);

/// Word and phrase connotation scores, keyed by lowercase text.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: HashMap<String, f64>,
}

impl Lexicon {
    /// An empty lexicon (every lookup misses).
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in English table.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().map(|(k, v)| (k.to_string(), *v)))
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut lexicon = Self::empty();
        lexicon.extend(entries);
        lexicon
    }

    /// Load a YAML mapping of `phrase: score`.
    pub fn load_yaml(path: &Path) -> Result<Self, LexiconError> {
        let raw = std::fs::read_to_string(path)?;
        let file: LexiconFile = serde_yaml::from_str(&raw)?;
        Ok(Self::from_entries(file.0))
    }

    /// Insert or override entries. Keys are normalized to trimmed lowercase.
    pub fn extend<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        for (key, score) in entries {
            let key = normalize(key.as_ref());
            if !key.is_empty() {
                self.entries.insert(key, score);
            }
        }
    }

    /// Exact lookup on an already-normalized key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// All `(key, score)` pairs, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase and trim, the comparison form for lexicon keys.
pub(crate) fn normalize(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}
