//! Replay scheduler — cooperative, time-scaled step-through of recorded history
//!
//! The scheduler is split in two:
//! - `ReplayScheduler`: synchronous `Idle`/`Replaying` state machine, owned
//!   by whoever owns the text (the session).
//! - `drive`: async loop that waits out each step delay and hands the step
//!   to a `ReplayTarget`. Every wait races the run's cancellation token, and
//!   the target re-checks the token before writing, so a cancelled run never
//!   applies a queued step.

use super::history::HistoryEntry;
use crate::cancel::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Delay before the first entry is shown.
pub const FIRST_DELAY: Duration = Duration::from_millis(100);
/// Upper bound on the wait between two consecutive entries.
pub const MAX_STEP_DELAY: Duration = Duration::from_millis(200);

/// Replay pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayTiming {
    pub first_delay: Duration,
    pub max_step_delay: Duration,
}

impl Default for ReplayTiming {
    fn default() -> Self {
        Self {
            first_delay: FIRST_DELAY,
            max_step_delay: MAX_STEP_DELAY,
        }
    }
}

/// One scheduled text mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    /// Index into the recorded history
    pub index: usize,
    /// Wait before applying this step
    pub delay: Duration,
    /// Text to show once the delay elapses
    pub value: String,
}

/// Delay preceding step `index`.
///
/// The first step waits `first_delay`; later steps wait the original gap,
/// clamped to `[0, max_step_delay]`.
pub fn step_delay(entries: &[HistoryEntry], index: usize, timing: &ReplayTiming) -> Duration {
    if index == 0 {
        return timing.first_delay;
    }
    let gap = entries[index].time.saturating_sub(entries[index - 1].time);
    Duration::from_millis(gap).min(timing.max_step_delay)
}

/// Build the full step list for a history, in original order.
pub fn plan(entries: &[HistoryEntry], timing: &ReplayTiming) -> Vec<ReplayStep> {
    (0..entries.len())
        .map(|index| ReplayStep {
            index,
            delay: step_delay(entries, index, timing),
            value: entries[index].value.clone(),
        })
        .collect()
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    Idle,
    Replaying {
        /// Next history index to apply
        cursor: usize,
        /// Number of entries in this run
        total: usize,
    },
}

/// Synchronous replay state machine.
#[derive(Debug, Default)]
pub struct ReplayScheduler {
    timing: ReplayTiming,
    state: ReplayState,
    token: Option<CancellationToken>,
}

impl ReplayScheduler {
    pub fn new(timing: ReplayTiming) -> Self {
        Self {
            timing,
            state: ReplayState::Idle,
            token: None,
        }
    }

    pub fn timing(&self) -> &ReplayTiming {
        &self.timing
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self.state, ReplayState::Replaying { .. })
    }

    /// Begin a run over `entries`.
    ///
    /// Returns `None` without touching state when there is nothing to replay.
    /// A run already in progress is cancelled first. The caller clears the
    /// visible text and spawns `drive` with the returned token and plan.
    pub fn start(&mut self, entries: &[HistoryEntry]) -> Option<(CancellationToken, Vec<ReplayStep>)> {
        if entries.is_empty() {
            return None;
        }
        self.stop();

        let token = CancellationToken::new();
        self.token = Some(token.clone());
        self.state = ReplayState::Replaying {
            cursor: 0,
            total: entries.len(),
        };
        info!(entries = entries.len(), "replay started");
        Some((token, plan(entries, &self.timing)))
    }

    /// Account for one applied step.
    ///
    /// Returns `false` when `token` belongs to a cancelled or superseded run,
    /// in which case the caller must not write. Reaching the end of the run
    /// returns the scheduler to `Idle`.
    pub fn advance(&mut self, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        let ReplayState::Replaying { cursor, total } = self.state else {
            return false;
        };

        let cursor = cursor + 1;
        if cursor >= total {
            self.state = ReplayState::Idle;
            self.token = None;
            info!(entries = total, "replay finished");
        } else {
            self.state = ReplayState::Replaying { cursor, total };
        }
        true
    }

    /// Cancel the current run. Returns whether a run was in progress.
    pub fn stop(&mut self) -> bool {
        let was_replaying = self.is_replaying();
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.state = ReplayState::Idle;
        if was_replaying {
            info!("replay stopped");
        }
        was_replaying
    }
}

/// Receiver of replay steps.
pub trait ReplayTarget: Send + Sync + 'static {
    /// Apply `step` unless `token` has been cancelled.
    ///
    /// Implementations must check the token while holding whatever lock
    /// guards the text. Returning `false` ends the run.
    fn apply_step(&self, token: &CancellationToken, step: &ReplayStep) -> bool;
}

/// Run a replay plan against `target`, honoring cancellation at every delay.
pub async fn drive<T>(target: Arc<T>, token: CancellationToken, steps: Vec<ReplayStep>)
where
    T: ReplayTarget + ?Sized,
{
    for step in steps {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(index = step.index, "replay cancelled before step");
                return;
            }
            _ = tokio::time::sleep(step.delay) => {}
        }

        if !target.apply_step(&token, &step) {
            debug!(index = step.index, "replay target rejected step");
            return;
        }
        debug!(index = step.index, delay_ms = step.delay.as_millis() as u64, "replay step applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn entries(raw: &[(&str, u64)]) -> Vec<HistoryEntry> {
        raw.iter().map(|(v, t)| HistoryEntry::new(*v, *t)).collect()
    }

    fn delays_ms(steps: &[ReplayStep]) -> Vec<u64> {
        steps.iter().map(|s| s.delay.as_millis() as u64).collect()
    }

    /// Target that records when each step lands, gated by its own scheduler.
    struct Recorder {
        started: Instant,
        scheduler: Mutex<ReplayScheduler>,
        seen: Mutex<Vec<(u64, String)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                started: Instant::now(),
                scheduler: Mutex::new(ReplayScheduler::default()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ReplayTarget for Recorder {
        fn apply_step(&self, token: &CancellationToken, step: &ReplayStep) -> bool {
            let mut scheduler = self.scheduler.lock().unwrap();
            if !scheduler.advance(token) {
                return false;
            }
            let at = self.started.elapsed().as_millis() as u64;
            self.seen.lock().unwrap().push((at, step.value.clone()));
            true
        }
    }

    // --- Step timing ---

    #[test]
    fn plan_uses_first_delay_then_clamped_gaps() {
        let history = entries(&[("a", 0), ("ab", 40), ("a", 900)]);
        let steps = plan(&history, &ReplayTiming::default());

        assert_eq!(delays_ms(&steps), vec![100, 40, 200]);
        let order: Vec<_> = steps.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![0, 1, 2], "steps follow original order");
        assert_eq!(steps[2].value, "a");
    }

    #[test]
    fn backwards_timestamps_clamp_to_zero_delay() {
        let history = entries(&[("a", 500), ("ab", 300)]);
        assert_eq!(delays_ms(&plan(&history, &ReplayTiming::default())), vec![100, 0]);
    }

    #[test]
    fn custom_timing_is_respected() {
        let timing = ReplayTiming {
            first_delay: Duration::from_millis(5),
            max_step_delay: Duration::from_millis(30),
        };
        let history = entries(&[("a", 0), ("ab", 20), ("abc", 100)]);
        assert_eq!(delays_ms(&plan(&history, &timing)), vec![5, 20, 30]);
    }

    // --- State machine ---

    #[test]
    fn start_on_empty_history_is_a_no_op() {
        let mut scheduler = ReplayScheduler::default();
        assert!(scheduler.start(&[]).is_none());
        assert_eq!(scheduler.state(), ReplayState::Idle);
    }

    #[test]
    fn advancing_through_all_steps_returns_to_idle() {
        let mut scheduler = ReplayScheduler::default();
        let (token, steps) = scheduler.start(&entries(&[("a", 0), ("ab", 10)])).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(scheduler.state(), ReplayState::Replaying { cursor: 0, total: 2 });

        assert!(scheduler.advance(&token));
        assert_eq!(scheduler.state(), ReplayState::Replaying { cursor: 1, total: 2 });
        assert!(scheduler.advance(&token));
        assert_eq!(scheduler.state(), ReplayState::Idle);
    }

    #[test]
    fn restart_cancels_previous_run() {
        let mut scheduler = ReplayScheduler::default();
        let history = entries(&[("a", 0), ("ab", 10)]);
        let (first, _) = scheduler.start(&history).unwrap();
        let (second, _) = scheduler.start(&history).unwrap();

        assert!(first.is_cancelled());
        assert!(!scheduler.advance(&first), "stale run may not advance");
        assert!(scheduler.advance(&second));
    }

    #[test]
    fn stop_cancels_token_and_reports_previous_state() {
        let mut scheduler = ReplayScheduler::default();
        let (token, _) = scheduler.start(&entries(&[("a", 0)])).unwrap();
        assert!(scheduler.stop());
        assert!(token.is_cancelled());
        assert!(!scheduler.stop(), "second stop finds nothing running");
    }

    // --- Driver ---

    #[tokio::test(start_paused = true)]
    async fn drive_applies_steps_at_scheduled_offsets() {
        let history = entries(&[("a", 0), ("ab", 40), ("a", 900)]);
        let recorder = Arc::new(Recorder::new());
        let (token, steps) = recorder.scheduler.lock().unwrap().start(&history).unwrap();

        drive(recorder.clone(), token, steps).await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![(100, "a".to_string()), (140, "ab".to_string()), (340, "a".to_string())]
        );
        assert_eq!(recorder.scheduler.lock().unwrap().state(), ReplayState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_applies_no_further_steps() {
        let history = entries(&[("a", 0), ("ab", 40), ("abc", 900)]);
        let recorder = Arc::new(Recorder::new());
        let (token, steps) = recorder.scheduler.lock().unwrap().start(&history).unwrap();

        let handle = tokio::spawn(drive(recorder.clone(), token, steps));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(recorder.scheduler.lock().unwrap().stop());

        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let values: Vec<_> = recorder.seen.lock().unwrap().iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(values, vec!["a", "ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wakes_driver_parked_in_a_delay() {
        let history = entries(&[("a", 0), ("ab", 5_000)]);
        let recorder = Arc::new(Recorder::new());
        let (token, steps) = recorder.scheduler.lock().unwrap().start(&history).unwrap();

        let handle = tokio::spawn(drive(recorder.clone(), token.clone(), steps));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!handle.is_finished(), "parked in the 200 ms step delay");

        token.cancel();
        tokio::time::timeout(Duration::from_millis(1), handle)
            .await
            .expect("driver wakes on cancel instead of finishing its sleep")
            .unwrap();
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }
}
