//! Configuration — YAML file with per-subsystem sections
//!
//! Every field has a default, so an empty or partial file is valid.

use crate::connotation::{ConnotationScorer, Lexicon, LexiconError};
use crate::extract::ExtractOptions;
use crate::metrics::MetricsConfig;
use crate::timeline::ReplayTiming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("lexicon error: {0}")]
    Lexicon(#[from] LexiconError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub first_delay_ms: u64,
    pub max_step_delay_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            first_delay_ms: 100,
            max_step_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_n: usize,
    pub min_score: f64,
    pub min_count: usize,
    /// Cap on the auto annotation list
    pub max_phrases: usize,
    /// Quiet period before an auto recompute fires
    pub debounce_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_n: 3,
            min_score: 1.0,
            min_count: 1,
            max_phrases: 12,
            debounce_ms: 180,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// Extra YAML lexicon layered over the built-in table
    pub path: Option<PathBuf>,
    /// Individual scores applied last
    pub overrides: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseServiceConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub timeout_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            primary: None,
            secondary: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    4000
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub replay: ReplayConfig,
    pub metrics: MetricsConfig,
    pub extraction: ExtractionConfig,
    pub lexicon: LexiconConfig,
    pub phrase_service: Option<PhraseServiceConfig>,
    pub translation: TranslationConfig,
}

impl Config {
    /// `<config_dir>/inktrace/config.yaml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("inktrace").join("config.yaml"))
    }

    /// Load a config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else the default path if it exists, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse YAML text. Empty input yields defaults.
    pub fn parse(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn replay_timing(&self) -> ReplayTiming {
        ReplayTiming {
            first_delay: Duration::from_millis(self.replay.first_delay_ms),
            max_step_delay: Duration::from_millis(self.replay.max_step_delay_ms),
        }
    }

    /// Extraction options without a cap; the auto source applies `max_phrases`.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_n: self.extraction.max_n,
            min_score: self.extraction.min_score,
            min_count: self.extraction.min_count,
            max_phrases: None,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.extraction.debounce_ms)
    }

    /// Built-in lexicon, then the configured file, then overrides.
    pub fn build_scorer(&self) -> Result<ConnotationScorer, ConfigError> {
        let mut lexicon = Lexicon::builtin();
        if let Some(path) = &self.lexicon.path {
            let file = Lexicon::load_yaml(path)?;
            info!(path = %path.display(), entries = file.len(), "loaded lexicon");
            lexicon.extend(file.entries());
        }
        lexicon.extend(self.lexicon.overrides.iter().map(|(k, v)| (k.as_str(), *v)));
        Ok(ConnotationScorer::new(lexicon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn empty_text_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert_eq!(Config::parse("   \n").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            "replay:\n  first_delay_ms: 50\nextraction:\n  max_phrases: 4\n",
        )
        .unwrap();
        assert_eq!(config.replay.first_delay_ms, 50);
        assert_eq!(config.replay.max_step_delay_ms, 200);
        assert_eq!(config.extraction.max_phrases, 4);
        assert_eq!(config.extraction.debounce_ms, 180);
        assert_eq!(config.metrics, MetricsConfig::default());
        assert!(config.phrase_service.is_none());
    }

    #[test]
    fn phrase_service_timeout_defaults() {
        let config = Config::parse("phrase_service:\n  endpoint: http://localhost:9000/phrases\n").unwrap();
        let service = config.phrase_service.unwrap();
        assert_eq!(service.endpoint, "http://localhost:9000/phrases");
        assert_eq!(service.timeout_ms, 4000);
    }

    #[test]
    fn derived_values() {
        let config = Config::parse("replay:\n  max_step_delay_ms: 75\n").unwrap();
        let timing = config.replay_timing();
        assert_eq!(timing.first_delay, Duration::from_millis(100));
        assert_eq!(timing.max_step_delay, Duration::from_millis(75));
        assert_eq!(config.extract_options().max_phrases, None);
        assert_eq!(config.debounce(), Duration::from_millis(180));
    }

    #[test]
    fn load_reads_file_and_reports_bad_yaml() {
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "metrics:\n  burst_threshold_ms: 90").unwrap();
        let config = Config::load(good.path()).unwrap();
        assert_eq!(config.metrics.burst_threshold_ms, 90);

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "replay: [not, a, map]").unwrap();
        assert!(matches!(Config::load(bad.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            Config::load_or_default(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn scorer_layers_file_and_overrides() {
        let dir = TempDir::new().unwrap();
        let lexicon_path = dir.path().join("lexicon.yaml");
        std::fs::write(&lexicon_path, "storm: -0.7\nlove: 0.1\n").unwrap();

        let mut config = Config::default();
        config.lexicon.path = Some(lexicon_path);
        config.lexicon.overrides.insert("Love".to_string(), 0.95);

        let scorer = config.build_scorer().unwrap();
        assert_eq!(scorer.score("storm"), -0.7);
        assert_eq!(scorer.score("love"), 0.95, "overrides win over the file");
        assert_eq!(scorer.score("not good"), -0.5, "built-in entries survive");
    }

    #[test]
    fn missing_lexicon_file_fails_scorer() {
        let mut config = Config::default();
        config.lexicon.path = Some(PathBuf::from("/definitely/not/here.yaml"));
        assert!(matches!(config.build_scorer(), Err(ConfigError::Lexicon(_))));
    }
}
