//! Export formats for a recorded session
//!
//! - JSON: `{"history": [...], "analysis": {...} | null}`
//! - CSV: `time,value` rows; quotes doubled, newlines written as `\n`

use crate::metrics::AnalysisResult;
use crate::timeline::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors reading or writing export files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    history: &'a [HistoryEntry],
    analysis: Option<&'a AnalysisResult>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Document { history: Vec<HistoryEntry> },
    Entries(Vec<HistoryEntry>),
}

/// Render the JSON dump.
pub fn to_json(history: &[HistoryEntry], analysis: Option<&AnalysisResult>) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(&ExportDocument { history, analysis })?)
}

/// Render the CSV dump.
pub fn to_csv(history: &[HistoryEntry]) -> String {
    let mut out = String::from("time,value\n");
    for entry in history {
        out.push_str(&format!("{},\"{}\"\n", entry.time, escape_csv(&entry.value)));
    }
    out
}

fn escape_csv(value: &str) -> String {
    value.replace('"', "\"\"").replace('\n', "\\n")
}

pub fn write_json(
    path: &Path,
    history: &[HistoryEntry],
    analysis: Option<&AnalysisResult>,
) -> ExportResult<()> {
    std::fs::write(path, to_json(history, analysis)?)?;
    Ok(())
}

pub fn write_csv(path: &Path, history: &[HistoryEntry]) -> ExportResult<()> {
    std::fs::write(path, to_csv(history))?;
    Ok(())
}

/// Parse history from an exported JSON document or a bare entry array.
pub fn parse_history(raw: &str) -> ExportResult<Vec<HistoryEntry>> {
    Ok(match serde_json::from_str::<ImportDocument>(raw)? {
        ImportDocument::Document { history } => history,
        ImportDocument::Entries(entries) => entries,
    })
}

/// Read history from a JSON file (see `parse_history`).
pub fn read_history(path: &Path) -> ExportResult<Vec<HistoryEntry>> {
    parse_history(&std::fs::read_to_string(path)?)
}
