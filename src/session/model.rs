//! The Session aggregate — text, timeline, annotation sets and replay state

use super::{SessionError, SessionId};
use crate::annotation::{live_annotation, phrase_key, render, Annotation, AnnotationSource, Span};
use crate::cancel::CancellationToken;
use crate::connotation::ConnotationScorer;
use crate::metrics::{run_analysis_with, AnalysisResult, MetricsConfig};
use crate::timeline::{History, HistoryEntry, ReplayScheduler, ReplayState, ReplayStep, ReplayTiming};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// One writing session.
///
/// The text has a single writer at a time: direct edits while the replay
/// scheduler is idle, replay steps while it is replaying.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    text: String,
    history: History,
    user: BTreeMap<String, Annotation>,
    auto: Vec<Annotation>,
    auto_enabled: bool,
    replay: ReplayScheduler,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ReplayTiming::default())
    }
}

impl Session {
    pub fn new(timing: ReplayTiming) -> Self {
        Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            text: String::new(),
            history: History::new(),
            user: BTreeMap::new(),
            auto: Vec::new(),
            auto_enabled: true,
            replay: ReplayScheduler::new(timing),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // --- Editing ---

    /// Apply a direct edit stamped `time` ms.
    ///
    /// Rejected while a replay runs; the rejection also stops the replay so
    /// the next edit goes through.
    pub fn edit_at(&mut self, value: impl Into<String>, time: u64) -> Result<(), SessionError> {
        if self.replay.is_replaying() {
            self.replay.stop();
            return Err(SessionError::ReplayInProgress);
        }
        let value = value.into();
        self.text.clone_from(&value);
        self.history.record(value, time);
        Ok(())
    }

    // --- User annotations ---

    /// Mark `phrase` as a user annotation. Returns `false` for blank or
    /// already-marked phrases.
    pub fn mark(&mut self, phrase: &str, scorer: &ConnotationScorer) -> bool {
        let key = phrase_key(phrase);
        if key.is_empty() || self.user.contains_key(&key) {
            return false;
        }
        self.user
            .insert(key, Annotation::scored(phrase, AnnotationSource::User, scorer));
        true
    }

    /// Remove a user annotation by phrase (any case).
    pub fn unmark(&mut self, phrase: &str) -> bool {
        self.user.remove(&phrase_key(phrase)).is_some()
    }

    pub fn is_marked(&self, phrase: &str) -> bool {
        self.user.contains_key(&phrase_key(phrase))
    }

    pub fn user_annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.user.values()
    }

    pub fn marked_keys(&self) -> HashSet<String> {
        self.user.keys().cloned().collect()
    }

    // --- Auto annotations ---

    pub fn auto_annotations(&self) -> &[Annotation] {
        &self.auto
    }

    /// Replace the auto list wholesale.
    pub fn set_auto_annotations(&mut self, annotations: Vec<Annotation>) {
        debug!(count = annotations.len(), "auto annotations replaced");
        self.auto = annotations;
    }

    pub fn auto_enabled(&self) -> bool {
        self.auto_enabled
    }

    /// Toggle the auto source. Disabling drops the current auto list.
    pub fn set_auto_enabled(&mut self, enabled: bool) {
        self.auto_enabled = enabled;
        if !enabled {
            self.auto.clear();
        }
    }

    // --- Projections ---

    /// Render the text with user, auto and (when `caret` is given) live
    /// annotations.
    pub fn render(&self, caret: Option<usize>, scorer: &ConnotationScorer) -> Vec<Span> {
        let mut annotations: Vec<Annotation> = self.user.values().cloned().collect();
        if self.auto_enabled {
            annotations.extend(self.auto.iter().cloned());
        }
        if let Some(caret) = caret {
            let live = live_annotation(&self.text, caret, |key| self.user.contains_key(key), scorer);
            annotations.extend(live);
        }
        render(&self.text, &annotations)
    }

    pub fn analyze(&self, config: &MetricsConfig) -> Option<AnalysisResult> {
        run_analysis_with(self.history.entries(), config)
    }

    // --- Lifecycle ---

    /// Reset text, history and annotations. Stops any replay.
    pub fn clear(&mut self) {
        self.replay.stop();
        self.text.clear();
        self.history.clear();
        self.user.clear();
        self.auto.clear();
        self.created_at = Utc::now();
    }

    /// Replace the timeline with `entries`; the text becomes the last value.
    /// Annotations are kept. Stops any replay.
    pub fn restore(&mut self, entries: Vec<HistoryEntry>) {
        self.replay.stop();
        self.text = entries.last().map(|e| e.value.clone()).unwrap_or_default();
        self.history = History::from_entries(entries);
    }

    // --- Replay transitions ---

    pub fn replay_state(&self) -> ReplayState {
        self.replay.state()
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_replaying()
    }

    /// Enter `Replaying` and clear the text. `None` when history is empty.
    pub fn start_replay(&mut self) -> Option<(CancellationToken, Vec<ReplayStep>)> {
        let started = self.replay.start(self.history.entries())?;
        self.text.clear();
        Some(started)
    }

    /// Apply one step of the run owning `token`. Never touches history.
    pub fn apply_replay_step(&mut self, token: &CancellationToken, step: &ReplayStep) -> bool {
        if !self.replay.advance(token) {
            return false;
        }
        self.text.clone_from(&step.value);
        true
    }

    pub fn stop_replay(&mut self) -> bool {
        self.replay.stop()
    }
}
