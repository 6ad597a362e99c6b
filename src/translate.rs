//! Translation fallback chain — primary, secondary, then static substitution
//!
//! Both network tiers speak the same contract: `POST {q, source, target}`
//! answered by `{translatedText}`. The static tier swaps known words from a
//! small built-in table and leaves everything else untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Request body for a translation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub q: String,
    pub source: String,
    pub target: String,
}

impl TranslateRequest {
    pub fn new(q: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// Errors from a translation tier.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation provider unavailable: {0}")]
    Unavailable(String),

    #[error("translation provider returned status {0}")]
    Status(u16),

    #[error("unreadable translation response: {0}")]
    BadResponse(String),

    #[error("no substitution table for language '{0}'")]
    UnsupportedLanguage(String),

    #[error("all translation tiers failed; last error: {0}")]
    Exhausted(Box<TranslateError>),
}

impl From<reqwest::Error> for TranslateError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None if err.is_decode() => Self::BadResponse(err.to_string()),
            None => Self::Unavailable(err.to_string()),
        }
    }
}

/// One translation provider.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError>;
}

/// HTTP provider: `POST {endpoint}` with a JSON `TranslateRequest`.
pub struct HttpTranslator {
    name: String,
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranslator {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslateError::Unavailable(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        let response: TranslateResponse = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.translated_text)
    }
}

const SPANISH: &[(&str, &str)] = &[
    ("hello", "hola"),
    ("goodbye", "adiós"),
    ("yes", "sí"),
    ("no", "no"),
    ("thank", "gracias"),
    ("thanks", "gracias"),
    ("love", "amor"),
    ("hate", "odio"),
    ("happy", "feliz"),
    ("sad", "triste"),
    ("good", "bueno"),
    ("bad", "malo"),
    ("day", "día"),
    ("night", "noche"),
    ("rain", "lluvia"),
    ("sun", "sol"),
    ("storm", "tormenta"),
    ("friend", "amigo"),
    ("home", "casa"),
    ("world", "mundo"),
    ("the", "el"),
    ("and", "y"),
    ("is", "es"),
    ("i", "yo"),
    ("you", "tú"),
];

const FRENCH: &[(&str, &str)] = &[
    ("hello", "bonjour"),
    ("goodbye", "au revoir"),
    ("yes", "oui"),
    ("no", "non"),
    ("thank", "merci"),
    ("thanks", "merci"),
    ("love", "amour"),
    ("hate", "haine"),
    ("happy", "heureux"),
    ("sad", "triste"),
    ("good", "bon"),
    ("bad", "mauvais"),
    ("day", "jour"),
    ("night", "nuit"),
    ("rain", "pluie"),
    ("sun", "soleil"),
    ("storm", "tempête"),
    ("friend", "ami"),
    ("home", "maison"),
    ("world", "monde"),
    ("the", "le"),
    ("and", "et"),
    ("is", "est"),
    ("i", "je"),
    ("you", "tu"),
];

/// Last-resort word-by-word substitution from built-in tables.
#[derive(Debug, Clone)]
pub struct StaticSubstitution {
    tables: HashMap<String, HashMap<String, String>>,
}

impl Default for StaticSubstitution {
    fn default() -> Self {
        let mut substitution = Self {
            tables: HashMap::new(),
        };
        substitution.add_table("es", SPANISH.iter().copied());
        substitution.add_table("fr", FRENCH.iter().copied());
        substitution
    }
}

impl StaticSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or extend the table for `language`.
    pub fn add_table<'a>(&mut self, language: &str, words: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let table = self.tables.entry(language.to_lowercase()).or_default();
        for (from, to) in words {
            table.insert(from.to_lowercase(), to.to_string());
        }
    }

    pub fn supports(&self, language: &str) -> bool {
        self.tables.contains_key(&language.to_lowercase())
    }

    /// Substitute every known word; separators and unknown words pass through.
    pub fn substitute(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        let table = self
            .tables
            .get(&target.to_lowercase())
            .ok_or_else(|| TranslateError::UnsupportedLanguage(target.to_string()))?;

        let mut out = String::with_capacity(text.len());
        let mut word = String::new();
        for c in text.chars() {
            if c.is_alphanumeric() || c == '\'' {
                word.push(c);
            } else {
                flush_word(&mut out, &mut word, table);
                out.push(c);
            }
        }
        flush_word(&mut out, &mut word, table);
        Ok(out)
    }
}

fn flush_word(out: &mut String, word: &mut String, table: &HashMap<String, String>) {
    if word.is_empty() {
        return;
    }
    match table.get(&word.to_lowercase()) {
        Some(replacement) if starts_uppercase(word) => out.push_str(&capitalize(replacement)),
        Some(replacement) => out.push_str(replacement),
        None => out.push_str(word),
    }
    word.clear();
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl Translator for StaticSubstitution {
    fn name(&self) -> &str {
        "static"
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        self.substitute(&request.q, &request.target)
    }
}

/// Which tier produced a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Secondary,
    Static,
}

/// A successful translation and the tier that answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub text: String,
    pub tier: Tier,
}

/// Ordered fallback over up to two providers plus static substitution.
pub struct TranslationChain {
    primary: Option<Arc<dyn Translator>>,
    secondary: Option<Arc<dyn Translator>>,
    fallback: StaticSubstitution,
}

impl Default for TranslationChain {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl TranslationChain {
    pub fn new(primary: Option<Arc<dyn Translator>>, secondary: Option<Arc<dyn Translator>>) -> Self {
        Self {
            primary,
            secondary,
            fallback: StaticSubstitution::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: StaticSubstitution) -> Self {
        self.fallback = fallback;
        self
    }

    /// Translate through the tiers in order.
    ///
    /// Network failures move on to the next tier; only a failure of the
    /// static tier is returned, wrapped in `Exhausted`.
    pub async fn translate(&self, request: &TranslateRequest) -> Result<Translation, TranslateError> {
        let tiers = [
            (Tier::Primary, self.primary.as_ref()),
            (Tier::Secondary, self.secondary.as_ref()),
        ];
        for (tier, provider) in tiers {
            let Some(provider) = provider else {
                continue;
            };
            match provider.translate(request).await {
                Ok(text) => {
                    debug!(provider = provider.name(), ?tier, "translation succeeded");
                    return Ok(Translation { text, tier });
                }
                Err(e) => warn!(provider = provider.name(), ?tier, error = %e, "translation tier failed"),
            }
        }

        match self.fallback.translate(request).await {
            Ok(text) => Ok(Translation {
                text,
                tier: Tier::Static,
            }),
            Err(e) => Err(TranslateError::Exhausted(Box::new(e))),
        }
    }
}
