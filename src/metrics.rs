//! Session metrics — reduces the edit timeline into flow/stress/energy indices
//!
//! Always recomputed from the full history; nothing is tracked incrementally.

use crate::timeline::HistoryEntry;
use serde::{Deserialize, Serialize};

/// Delta thresholds for classifying keystroke rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Deltas strictly below this are bursts
    pub burst_threshold_ms: u64,
    /// Deltas strictly above this are pauses
    pub pause_threshold_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            burst_threshold_ms: 120,
            pause_threshold_ms: 600,
        }
    }
}

/// Aggregate indices for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub duration_ms: u64,
    /// Rounded mean delta between consecutive edits, in ms
    pub avg_speed: u64,
    pub bursts: usize,
    pub pauses: usize,
    pub deletions: usize,
    pub flow_index: f64,
    pub stress_index: f64,
    pub energy_index: f64,
}

/// Analyze a history with default thresholds.
pub fn run_analysis(history: &[HistoryEntry]) -> Option<AnalysisResult> {
    run_analysis_with(history, &MetricsConfig::default())
}

/// Analyze a history. Empty history is `None`, not an error.
pub fn run_analysis_with(history: &[HistoryEntry], config: &MetricsConfig) -> Option<AnalysisResult> {
    let (first, last) = (history.first()?, history.last()?);
    let total = history.len() as f64;

    let duration_ms = last.time.saturating_sub(first.time);
    let deltas = crate::timeline::history_deltas(history);
    let deletions = history
        .windows(2)
        .filter(|pair| pair[1].value.chars().count() < pair[0].value.chars().count())
        .count();

    let avg_speed = if deltas.is_empty() {
        0
    } else {
        (deltas.iter().sum::<u64>() as f64 / deltas.len() as f64).round() as u64
    };
    let bursts = deltas.iter().filter(|&&d| d < config.burst_threshold_ms).count();
    let pauses = deltas.iter().filter(|&&d| d > config.pause_threshold_ms).count();

    Some(AnalysisResult {
        duration_ms,
        avg_speed,
        bursts,
        pauses,
        deletions,
        flow_index: clamp_index(100.0 - avg_speed as f64 / 10.0),
        stress_index: clamp_index(deletions as f64 / total * 100.0),
        energy_index: clamp_index(bursts as f64 / total * 100.0),
    })
}

fn clamp_index(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(raw: &[(&str, u64)]) -> Vec<HistoryEntry> {
        raw.iter().map(|(v, t)| HistoryEntry::new(*v, *t)).collect()
    }

    #[test]
    fn empty_history_has_no_result() {
        assert_eq!(run_analysis(&[]), None);
    }

    #[test]
    fn reference_session() {
        let result = run_analysis(&history(&[("a", 0), ("ab", 50), ("a", 700)])).unwrap();

        assert_eq!(result.duration_ms, 700);
        assert_eq!(result.deletions, 1);
        assert_eq!(result.avg_speed, 350);
        assert_eq!(result.bursts, 1);
        assert_eq!(result.pauses, 1);
        assert_eq!(result.flow_index, 65.0);
        assert!((result.stress_index - 100.0 / 3.0).abs() < 1e-9);
        assert!((result.energy_index - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn single_entry_is_neutral() {
        let result = run_analysis(&history(&[("hello", 42)])).unwrap();
        assert_eq!(result.duration_ms, 0);
        assert_eq!(result.avg_speed, 0);
        assert_eq!(result.flow_index, 100.0);
        assert_eq!(result.stress_index, 0.0);
        assert_eq!(result.energy_index, 0.0);
    }

    #[test]
    fn backwards_timestamps_count_as_zero_delta() {
        let result = run_analysis(&history(&[("a", 500), ("ab", 100), ("abc", 150)])).unwrap();
        assert_eq!(result.duration_ms, 0, "duration saturates instead of underflowing");
        assert_eq!(result.avg_speed, 25);
        assert_eq!(result.bursts, 2);
    }

    #[test]
    fn slow_typing_floors_flow_at_zero() {
        let result = run_analysis(&history(&[("a", 0), ("ab", 5_000)])).unwrap();
        assert_eq!(result.flow_index, 0.0);
        assert_eq!(result.pauses, 1);
    }

    #[test]
    fn deletions_compare_characters_not_bytes() {
        // "é" is two bytes but one character; swapping it for "e" is not a deletion.
        let result = run_analysis(&history(&[("é", 0), ("e", 10)])).unwrap();
        assert_eq!(result.deletions, 0);
    }

    #[test]
    fn custom_thresholds() {
        let config = MetricsConfig {
            burst_threshold_ms: 60,
            pause_threshold_ms: 40,
        };
        let result = run_analysis_with(&history(&[("a", 0), ("ab", 50), ("abc", 100)]), &config).unwrap();
        assert_eq!(result.bursts, 2);
        assert_eq!(result.pauses, 2);
    }

    #[test]
    fn serializes_camel_case() {
        let result = run_analysis(&history(&[("a", 0)])).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("durationMs").is_some());
        assert!(json.get("flowIndex").is_some());
    }
}
