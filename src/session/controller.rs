//! SessionController — owns the session and its background tasks
//!
//! The session sits behind one mutex. Two kinds of task write to it besides
//! the caller: the replay driver and debounced auto-annotation recomputes.
//! Each re-checks its cancellation token or generation ticket under the lock
//! before writing, so a stale task never overwrites newer state.

use super::{Session, SessionError, SessionId};
use crate::annotation::{Annotation, Span};
use crate::cancel::{CancellationToken, Generation, Ticket};
use crate::config::Config;
use crate::connotation::ConnotationScorer;
use crate::extract::AutoAnnotator;
use crate::metrics::{AnalysisResult, MetricsConfig};
use crate::phrase_service::{HttpPhraseClient, PhraseServiceClient};
use crate::timeline::{replay, HistoryEntry, ReplayStep, ReplayTarget};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

struct Shared {
    session: Mutex<Session>,
    scorer: Arc<ConnotationScorer>,
    annotator: AutoAnnotator,
    generation: Generation,
    debounce: Duration,
    metrics: MetricsConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Debounced recompute for `ticket`.
    async fn recompute(&self, ticket: Ticket) {
        tokio::time::sleep(self.debounce).await;
        if !self.generation.is_current(ticket) {
            debug!(ticket, "auto recompute superseded before firing");
            return;
        }
        self.recompute_now(ticket).await;
    }

    async fn recompute_now(&self, ticket: Ticket) {
        let (text, marked) = {
            let session = self.lock();
            if !session.auto_enabled() {
                return;
            }
            (session.text().to_string(), session.marked_keys())
        };

        let annotations = self.annotator.annotate(&text, &marked).await;

        let mut session = self.lock();
        if !self.generation.is_current(ticket) || !session.auto_enabled() {
            debug!(ticket, "discarding stale auto annotations");
            return;
        }
        session.set_auto_annotations(annotations);
    }
}

/// Spawn a debounced recompute for `ticket`.
///
/// Callers advance the generation while still holding the session lock, so
/// an in-flight recompute can never apply against the state they just wrote.
fn spawn_recompute(shared: &Arc<Shared>, ticket: Ticket) {
    let Ok(runtime) = Handle::try_current() else {
        warn!("no tokio runtime; auto annotations not recomputed");
        return;
    };
    let shared = Arc::clone(shared);
    runtime.spawn(async move { shared.recompute(ticket).await });
}

/// Replay target that writes steps into the shared session.
struct ReplayWriter {
    shared: Arc<Shared>,
}

impl ReplayTarget for ReplayWriter {
    fn apply_step(&self, token: &CancellationToken, step: &ReplayStep) -> bool {
        let ticket = {
            let mut session = self.shared.lock();
            if !session.apply_replay_step(token, step) {
                return false;
            }
            self.shared.generation.advance()
        };
        spawn_recompute(&self.shared, ticket);
        true
    }
}

/// Single owner of a `Session`.
///
/// Methods that trigger an auto recompute spawn onto the current tokio
/// runtime.
pub struct SessionController {
    shared: Arc<Shared>,
    clock: Instant,
}

impl SessionController {
    /// Build from config. A configured phrase service is reached over HTTP.
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        let client = match &config.phrase_service {
            Some(service) => {
                let client = HttpPhraseClient::new(
                    service.endpoint.clone(),
                    Duration::from_millis(service.timeout_ms),
                )?;
                Some(Arc::new(client) as Arc<dyn PhraseServiceClient>)
            }
            None => None,
        };
        Self::build(config, client)
    }

    /// Build from config with an explicit phrase-service client.
    pub fn with_phrase_service(
        config: &Config,
        client: Arc<dyn PhraseServiceClient>,
    ) -> Result<Self, SessionError> {
        Self::build(config, Some(client))
    }

    fn build(config: &Config, client: Option<Arc<dyn PhraseServiceClient>>) -> Result<Self, SessionError> {
        let scorer = Arc::new(config.build_scorer()?);
        let mut annotator = AutoAnnotator::new(
            Arc::clone(&scorer),
            config.extract_options(),
            config.extraction.max_phrases,
        );
        if let Some(client) = client {
            annotator = annotator.with_client(client);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session::new(config.replay_timing())),
                scorer,
                annotator,
                generation: Generation::new(),
                debounce: config.debounce(),
                metrics: config.metrics,
            }),
            clock: Instant::now(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.shared.lock().id()
    }

    fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    // --- Editing and annotations ---

    /// Apply a direct edit stamped with the controller clock.
    pub fn edit(&self, value: impl Into<String>) -> Result<(), SessionError> {
        let time = self.now_ms();
        let ticket = {
            let mut session = self.shared.lock();
            session.edit_at(value, time)?;
            self.shared.generation.advance()
        };
        spawn_recompute(&self.shared, ticket);
        Ok(())
    }

    pub fn mark(&self, phrase: &str) -> bool {
        let ticket = {
            let mut session = self.shared.lock();
            if !session.mark(phrase, &self.shared.scorer) {
                return false;
            }
            self.shared.generation.advance()
        };
        spawn_recompute(&self.shared, ticket);
        true
    }

    pub fn unmark(&self, phrase: &str) -> bool {
        let ticket = {
            let mut session = self.shared.lock();
            if !session.unmark(phrase) {
                return false;
            }
            self.shared.generation.advance()
        };
        spawn_recompute(&self.shared, ticket);
        true
    }

    /// Toggle the auto source. Disabling discards any in-flight recompute.
    pub fn set_auto_enabled(&self, enabled: bool) {
        let ticket = {
            let mut session = self.shared.lock();
            session.set_auto_enabled(enabled);
            self.shared.generation.advance()
        };
        if enabled {
            spawn_recompute(&self.shared, ticket);
        }
    }

    pub fn auto_enabled(&self) -> bool {
        self.shared.lock().auto_enabled()
    }

    pub fn auto_annotations(&self) -> Vec<Annotation> {
        self.shared.lock().auto_annotations().to_vec()
    }

    pub fn user_annotations(&self) -> Vec<Annotation> {
        self.shared.lock().user_annotations().cloned().collect()
    }

    /// Recompute auto annotations immediately, superseding pending work.
    pub async fn refresh_auto(&self) {
        let ticket = self.shared.generation.advance();
        self.shared.recompute_now(ticket).await;
    }

    // --- Replay ---

    /// Start replaying the timeline.
    ///
    /// `None` when history is empty or no tokio runtime is available to
    /// drive the run; the session stays `Idle` in both cases.
    pub fn start_replay(&self) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime; replay not started");
            return None;
        };
        let (token, steps, ticket) = {
            let mut session = self.shared.lock();
            let (token, steps) = session.start_replay()?;
            (token, steps, self.shared.generation.advance())
        };
        spawn_recompute(&self.shared, ticket);
        let target = Arc::new(ReplayWriter {
            shared: Arc::clone(&self.shared),
        });
        Some(runtime.spawn(replay::drive(target, token, steps)))
    }

    pub fn stop_replay(&self) -> bool {
        self.shared.lock().stop_replay()
    }

    pub fn is_replaying(&self) -> bool {
        self.shared.lock().is_replaying()
    }

    // --- Projections ---

    pub fn render(&self, caret: Option<usize>) -> Vec<Span> {
        self.shared.lock().render(caret, &self.shared.scorer)
    }

    pub fn analyze(&self) -> Option<AnalysisResult> {
        self.shared.lock().analyze(&self.shared.metrics)
    }

    pub fn text(&self) -> String {
        self.shared.lock().text().to_string()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.lock().history().entries().to_vec()
    }

    // --- Lifecycle ---

    /// Reset the session and drop any pending recompute.
    pub fn clear(&self) {
        let mut session = self.shared.lock();
        session.clear();
        self.shared.generation.advance();
    }

    /// Load a recorded timeline; the text becomes its last value.
    pub fn restore(&self, entries: Vec<HistoryEntry>) {
        let ticket = {
            let mut session = self.shared.lock();
            session.restore(entries);
            self.shared.generation.advance()
        };
        spawn_recompute(&self.shared, ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationSource;
    use crate::phrase_service::MockClient;

    fn controller() -> SessionController {
        SessionController::new(&Config::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn edits_are_clock_stamped() {
        let controller = controller();
        controller.edit("a").unwrap();
        tokio::time::advance(Duration::from_millis(250)).await;
        controller.edit("ab").unwrap();

        let times: Vec<u64> = controller.history().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0, 250]);
        assert_eq!(controller.text(), "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn local_auto_annotations_arrive_after_debounce() {
        let controller = controller();
        controller.edit("I love the rain").unwrap();
        assert!(controller.auto_annotations().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let auto = controller.auto_annotations();
        assert!(auto.iter().any(|a| a.key == "love"));
        assert!(auto.iter().all(|a| a.source == AnnotationSource::Auto));
    }

    #[tokio::test(start_paused = true)]
    async fn marking_removes_phrase_from_auto() {
        let controller = controller();
        controller.edit("love and rain").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(controller.auto_annotations().iter().any(|a| a.key == "love"));

        assert!(controller.mark("Love"));
        assert!(!controller.mark("love"));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!controller.auto_annotations().iter().any(|a| a.key == "love"));
        assert_eq!(controller.user_annotations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_uses_the_phrase_service() {
        let client = Arc::new(MockClient::with_body(r#"[{"phrase": "rain", "score": -0.2}]"#));
        let controller = SessionController::with_phrase_service(&Config::default(), client.clone()).unwrap();
        controller.restore(vec![HistoryEntry::new("rain again", 0)]);
        controller.refresh_auto().await;

        let auto = controller.auto_annotations();
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].score, Some(-0.2));
        assert_eq!(client.requests()[0].text, "rain again");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_and_cancels() {
        let controller = controller();
        controller.edit("sunny day").unwrap();
        controller.clear();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(controller.text(), "");
        assert!(controller.history().is_empty());
        assert!(controller.auto_annotations().is_empty());
        assert!(controller.analyze().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn replay_of_empty_history_does_nothing() {
        let controller = controller();
        assert!(controller.start_replay().is_none());
        assert!(!controller.is_replaying());
    }

    #[tokio::test(start_paused = true)]
    async fn mutators_supersede_pending_tickets_before_returning() {
        let controller = controller();
        controller.edit("rain").unwrap();
        let after_edit = controller.shared.generation.current();

        controller.clear();
        assert!(controller.shared.generation.current() > after_edit);
        let after_clear = controller.shared.generation.current();

        controller.set_auto_enabled(false);
        assert!(controller.shared.generation.current() > after_clear);
        let after_disable = controller.shared.generation.current();

        controller.restore(vec![HistoryEntry::new("sun", 0)]);
        assert!(controller.shared.generation.current() > after_disable);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_service_result_is_dropped_after_clear() {
        let client = Arc::new(
            MockClient::with_body(r#"[{"phrase": "rain", "score": -0.2}]"#)
                .with_delay(Duration::from_millis(400)),
        );
        let controller = SessionController::with_phrase_service(&Config::default(), client.clone()).unwrap();
        controller.edit("rain again").unwrap();

        // Past the debounce, the service call is now pending.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(client.requests().len(), 1);

        controller.clear();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(controller.auto_annotations().is_empty());
        assert_eq!(controller.text(), "");
    }

    #[test]
    fn replay_without_runtime_stays_idle() {
        let controller = controller();
        controller.restore(vec![HistoryEntry::new("a", 0), HistoryEntry::new("ab", 100)]);

        assert!(controller.start_replay().is_none());
        assert!(!controller.is_replaying());
        assert_eq!(controller.text(), "ab");
    }
}
