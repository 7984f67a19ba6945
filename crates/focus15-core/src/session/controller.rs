//! Session controller implementation.
//!
//! The controller is the only owner of the session clock, the interaction
//! guard and the progress counters. All inputs (start requests, clock ticks,
//! guard signals, manual aborts, resets) enter through [`SessionController::handle`],
//! which holds the whole transition table.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Active --(clock complete)--> succeed --> Idle
//!                   |
//!                   +--(violation | manual abort)--> fail --> Idle
//! ```
//!
//! Because every call takes `&mut self` and runs to completion, the first
//! terminal input of a burst wins and the rest find the controller Idle.
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = SessionController::boot(storage, renderer, notifier);
//! controller.handle(Input::Start);
//! // From the event loop:
//! controller.handle(Input::Tick(run));
//! controller.handle(Input::Signal(signal));
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::clock::{ClockEvent, RunId, SessionClock};
use super::guard::{InteractionGuard, Signal, Verdict};
use super::SessionState;
use crate::events::{Event, FailReason};
use crate::progress::{ProgressState, ProgressStore, FOCUS_SECS, PENALTY};
use crate::storage::Storage;

/// Draws progress and remaining time.
pub trait Renderer {
    fn render(&mut self, progress: &ProgressState, remaining_secs: u64);
}

/// Shows transient human-readable messages.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Messages accepted by [`SessionController::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Start,
    Tick(RunId),
    Signal(Signal),
    ManualAbort,
    Reset,
}

/// Result of delivering a guard signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutcome {
    pub verdict: Verdict,
    pub event: Option<Event>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
}

/// Single owner of the focus-session state machine.
///
/// Constructed once with [`SessionController::boot`]; intentionally neither
/// `Clone` nor `Default`.
pub struct SessionController<S, R, N> {
    store: ProgressStore<S>,
    progress: ProgressState,
    renderer: R,
    notifier: N,
    guard: InteractionGuard,
    clock: SessionClock,
    session: Option<ActiveSession>,
}

impl<S: Storage, R: Renderer, N: Notifier> SessionController<S, R, N> {
    /// Load persisted progress and render the idle view.
    pub fn boot(storage: S, renderer: R, notifier: N) -> Self {
        let store = ProgressStore::new(storage);
        let progress = store.load();
        let mut controller = Self {
            store,
            progress,
            renderer,
            notifier,
            guard: InteractionGuard::new(),
            clock: SessionClock::new(),
            session: None,
        };
        tracing::info!(
            level = progress.level,
            wins = progress.wins,
            fails = progress.fails,
            "progress loaded"
        );
        controller.render_idle();
        controller
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        match self.session {
            Some(_) => SessionState::Active {
                remaining_secs: self.clock.remaining_secs(),
                duration_secs: self.clock.duration_secs(),
            },
            None => SessionState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn progress(&self) -> ProgressState {
        self.progress
    }

    /// Remaining seconds as displayed: the full duration while idle.
    pub fn remaining_secs(&self) -> u64 {
        if self.is_active() {
            self.clock.remaining_secs()
        } else {
            FOCUS_SECS
        }
    }

    /// Run id the next tick must carry, if a session is active.
    pub fn clock_run(&self) -> Option<RunId> {
        self.clock.current_run()
    }

    pub fn guard(&self) -> &InteractionGuard {
        &self.guard
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn store(&self) -> &ProgressStore<S> {
        &self.store
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            progress: self.progress,
            stage: self.progress.stage(),
            remaining_secs: self.remaining_secs(),
            at: Utc::now(),
        }
    }

    // ── Transition table ─────────────────────────────────────────────

    /// Apply one input. Returns `None` when the input is redundant in the
    /// current state.
    pub fn handle(&mut self, input: Input) -> Option<Event> {
        let event = match (self.session, input) {
            (None, Input::Start) => Some(self.begin()),
            (None, Input::Reset) => Some(self.reset_progress()),
            (Some(session), Input::Tick(run)) => match self.clock.tick(run) {
                Some(ClockEvent::Tick(remaining)) => {
                    self.renderer.render(&self.progress, remaining);
                    Some(Event::Ticked {
                        session_id: session.id,
                        remaining_secs: remaining,
                    })
                }
                Some(ClockEvent::Complete) => Some(self.finish_success(session)),
                None => {
                    tracing::debug!(?run, "stale tick dropped");
                    None
                }
            },
            (Some(session), Input::Signal(signal)) => {
                let verdict = self.guard.inspect(signal);
                tracing::debug!(?signal, ?verdict, "guard verdict");
                verdict
                    .violation()
                    .map(|violation| self.finish_failure(session, violation.into()))
            }
            (Some(session), Input::ManualAbort) => {
                Some(self.finish_failure(session, FailReason::Manual))
            }
            (session, input) => {
                tracing::debug!(active = session.is_some(), ?input, "redundant input ignored");
                None
            }
        };
        self.debug_check_invariants();
        event
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.handle(Input::Start)
    }

    /// Deliver one tick for the current clock run.
    pub fn tick(&mut self) -> Option<Event> {
        let run = self.clock.current_run()?;
        self.handle(Input::Tick(run))
    }

    /// Deliver a guard signal and report how the guard classified it.
    pub fn signal(&mut self, signal: Signal) -> SignalOutcome {
        let verdict = self.guard.inspect(signal);
        let event = self.handle(Input::Signal(signal));
        SignalOutcome { verdict, event }
    }

    pub fn manual_abort(&mut self) -> Option<Event> {
        self.handle(Input::ManualAbort)
    }

    /// Clear all progress. Only honoured while idle; the caller is
    /// responsible for asking the user first.
    pub fn reset(&mut self) -> Option<Event> {
        self.handle(Input::Reset)
    }

    /// Complete the active session successfully. No-op while idle.
    pub fn succeed(&mut self) -> Option<Event> {
        let session = self.session?;
        let event = self.finish_success(session);
        self.debug_check_invariants();
        Some(event)
    }

    /// Fail the active session. No-op while idle, so a burst of violations
    /// costs one penalty.
    pub fn fail(&mut self, reason: FailReason) -> Option<Event> {
        let session = self.session?;
        let event = self.finish_failure(session, reason);
        self.debug_check_invariants();
        Some(event)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&mut self) -> Event {
        let session = ActiveSession {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        self.session = Some(session);
        self.guard.arm();
        let run = self.clock.start(FOCUS_SECS);
        tracing::info!(session_id = %session.id, ?run, "session started");
        self.renderer.render(&self.progress, FOCUS_SECS);
        Event::SessionStarted {
            session_id: session.id,
            duration_secs: FOCUS_SECS,
            at: session.started_at,
        }
    }

    fn finish_success(&mut self, session: ActiveSession) -> Event {
        self.end_session();
        self.progress.record_success();
        self.persist();
        self.render_idle();

        let stage = self.progress.stage();
        tracing::info!(
            session_id = %session.id,
            level = self.progress.level,
            stage = stage.as_str(),
            "session succeeded"
        );
        self.notifier.notify(&format!(
            "成功！ペンギンが1成長しました（Lv.{} {}）",
            self.progress.level,
            stage.label()
        ));
        Event::SessionSucceeded {
            session_id: session.id,
            level: self.progress.level,
            wins: self.progress.wins,
            stage,
            started_at: session.started_at,
            at: Utc::now(),
        }
    }

    fn finish_failure(&mut self, session: ActiveSession, reason: FailReason) -> Event {
        self.end_session();
        self.progress.record_failure();
        self.persist();
        self.render_idle();

        tracing::info!(
            session_id = %session.id,
            reason = reason.as_str(),
            level = self.progress.level,
            "session failed"
        );
        self.notifier.notify(&format!(
            "失敗：{}（成長 −{}）Lv.{}",
            reason.label(),
            PENALTY,
            self.progress.level
        ));
        Event::SessionFailed {
            session_id: session.id,
            reason,
            level: self.progress.level,
            fails: self.progress.fails,
            started_at: session.started_at,
            at: Utc::now(),
        }
    }

    fn reset_progress(&mut self) -> Event {
        self.progress = ProgressState::default();
        self.persist();
        self.render_idle();
        tracing::info!("progress reset");
        self.notifier.notify("リセットしました");
        Event::ProgressReset { at: Utc::now() }
    }

    /// Stop the clock and disarm the guard before anything else happens.
    fn end_session(&mut self) {
        self.clock.stop();
        self.guard.disarm();
        self.session = None;
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.progress) {
            tracing::warn!(error = %err, "failed to persist progress");
        }
    }

    fn render_idle(&mut self) {
        self.renderer.render(&self.progress, FOCUS_SECS);
    }

    fn debug_check_invariants(&self) {
        debug_assert_eq!(self.guard.is_armed(), self.session.is_some());
        debug_assert_eq!(self.clock.is_running(), self.session.is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::session::{InteractionKind, Target};
    use crate::storage::{MemoryStorage, LEVEL_KEY};

    #[derive(Default)]
    struct Frames(Vec<(ProgressState, u64)>);

    impl Renderer for Frames {
        fn render(&mut self, progress: &ProgressState, remaining_secs: u64) {
            self.0.push((*progress, remaining_secs));
        }
    }

    #[derive(Default)]
    struct Toasts(Vec<String>);

    impl Notifier for Toasts {
        fn notify(&mut self, message: &str) {
            self.0.push(message.to_string());
        }
    }

    fn controller_at(level: u64) -> SessionController<MemoryStorage, Frames, Toasts> {
        let mut storage = MemoryStorage::default();
        storage.insert_raw(LEVEL_KEY, &level.to_string());
        SessionController::boot(storage, Frames::default(), Toasts::default())
    }

    /// Backend that loads a fixed level and rejects every write.
    struct ReadOnlyStorage {
        level: i64,
    }

    impl Storage for ReadOnlyStorage {
        fn read_int(&self, key: &str) -> Option<i64> {
            (key == LEVEL_KEY).then_some(self.level)
        }

        fn write_int(&mut self, key: &str, _value: i64) -> Result<(), StorageError> {
            Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "read-only".to_string(),
            })
        }
    }

    fn read_only_at(level: i64) -> SessionController<ReadOnlyStorage, Frames, Toasts> {
        SessionController::boot(
            ReadOnlyStorage { level },
            Frames::default(),
            Toasts::default(),
        )
    }

    #[test]
    fn failure_completes_even_when_writes_fail() {
        let mut controller = read_only_at(4);
        controller.start();

        let event = controller.fail(FailReason::Interaction);
        assert!(matches!(event, Some(Event::SessionFailed { level: 0, fails: 1, .. })));
        assert!(!controller.is_active());
        assert!(!controller.guard().is_armed());
        assert!(!controller.clock().is_running());
        assert_eq!(controller.progress().level, 0);
        assert_eq!(controller.notifier().0.len(), 1);
        assert_eq!(controller.renderer().0.last().map(|f| f.1), Some(FOCUS_SECS));
        assert_eq!(controller.store().load().level, 4);
    }

    #[test]
    fn success_completes_even_when_writes_fail() {
        let mut controller = read_only_at(4);
        controller.start();
        for _ in 0..FOCUS_SECS {
            controller.tick();
        }

        assert!(!controller.is_active());
        assert!(!controller.guard().is_armed());
        assert!(!controller.clock().is_running());
        assert_eq!(controller.progress().level, 5);
        assert_eq!(controller.progress().wins, 1);
        assert_eq!(controller.notifier().0.len(), 1);
        assert!(controller.notifier().0[0].contains("Lv.5"));
    }

    #[test]
    fn boot_renders_loaded_progress() {
        let controller = controller_at(7);
        assert_eq!(controller.progress().level, 7);
        assert_eq!(controller.renderer().0.len(), 1);
        assert_eq!(controller.renderer().0[0].1, FOCUS_SECS);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn start_arms_guard_and_clock() {
        let mut controller = controller_at(0);
        let event = controller.start();
        assert!(matches!(event, Some(Event::SessionStarted { duration_secs: 900, .. })));
        assert!(controller.guard().is_armed());
        assert!(controller.clock().is_running());
        assert_eq!(
            controller.state(),
            SessionState::Active {
                remaining_secs: 900,
                duration_secs: 900
            }
        );
    }

    #[test]
    fn start_while_active_is_ignored() {
        let mut controller = controller_at(0);
        controller.start();
        let run = controller.clock_run();
        controller.tick();
        assert!(controller.start().is_none());
        assert_eq!(controller.clock_run(), run);
        assert_eq!(controller.remaining_secs(), 899);
    }

    #[test]
    fn tick_renders_remaining_time() {
        let mut controller = controller_at(0);
        controller.start();
        let event = controller.tick();
        assert!(matches!(event, Some(Event::Ticked { remaining_secs: 899, .. })));
        assert_eq!(controller.renderer().0.last().map(|f| f.1), Some(899));
    }

    #[test]
    fn interaction_fails_from_level_three_to_zero() {
        let mut controller = controller_at(3);
        controller.start();
        let outcome = controller.signal(Signal::interaction(InteractionKind::PointerDown));
        assert!(outcome.verdict.suppresses());
        match outcome.event {
            Some(Event::SessionFailed { reason, level, fails, .. }) => {
                assert_eq!(reason, FailReason::Interaction);
                assert_eq!(level, 0);
                assert_eq!(fails, 1);
            }
            other => panic!("Expected SessionFailed, got {other:?}"),
        }
        assert_eq!(controller.notifier().0, ["失敗：操作検知（成長 −5）Lv.0"]);
        assert!(!controller.guard().is_armed());
        assert!(!controller.clock().is_running());
    }

    #[test]
    fn success_from_level_twelve() {
        let mut controller = controller_at(12);
        controller.start();
        let event = controller.succeed();
        match event {
            Some(Event::SessionSucceeded { level, wins, stage, .. }) => {
                assert_eq!(level, 13);
                assert_eq!(wins, 1);
                assert_eq!(stage, crate::Stage::Juvenile);
            }
            other => panic!("Expected SessionSucceeded, got {other:?}"),
        }
        assert_eq!(controller.notifier().0, ["成功！ペンギンが1成長しました（Lv.13 若鳥）"]);
    }

    #[test]
    fn fail_while_idle_is_a_no_op() {
        let mut controller = controller_at(8);
        assert!(controller.fail(FailReason::Interaction).is_none());
        assert!(controller.manual_abort().is_none());
        assert_eq!(controller.progress().level, 8);
        assert_eq!(controller.progress().fails, 0);
        assert!(controller.notifier().0.is_empty());
    }

    #[test]
    fn succeed_while_idle_is_a_no_op() {
        let mut controller = controller_at(2);
        assert!(controller.succeed().is_none());
        assert_eq!(controller.progress().wins, 0);
    }

    #[test]
    fn emergency_exit_is_not_a_violation_but_abort_is() {
        let mut controller = controller_at(6);
        controller.start();
        let outcome = controller.signal(Signal::Interaction {
            kind: InteractionKind::MouseDown,
            target: Target::EmergencyExit,
        });
        assert_eq!(outcome.verdict, Verdict::PassThrough);
        assert!(outcome.event.is_none());
        assert!(controller.is_active());

        let event = controller.manual_abort();
        assert!(matches!(
            event,
            Some(Event::SessionFailed { reason: FailReason::Manual, level: 1, .. })
        ));
        assert_eq!(controller.progress().fails, 1);
    }

    #[test]
    fn blur_while_visible_keeps_session_running() {
        let mut controller = controller_at(0);
        controller.start();
        let outcome = controller.signal(Signal::Blur { hidden: false });
        assert!(outcome.event.is_none());
        assert!(controller.is_active());
    }

    #[test]
    fn violation_burst_costs_one_penalty() {
        let mut controller = controller_at(20);
        controller.start();
        let first = controller.handle(Input::Signal(Signal::VisibilityChange { hidden: true }));
        let second = controller.handle(Input::Signal(Signal::interaction(InteractionKind::PointerDown)));
        assert!(matches!(
            first,
            Some(Event::SessionFailed { reason: FailReason::Visibility, .. })
        ));
        assert!(second.is_none());
        assert_eq!(controller.progress().level, 15);
        assert_eq!(controller.progress().fails, 1);
        assert_eq!(controller.notifier().0.len(), 1);
    }

    #[test]
    fn tick_after_failure_is_dropped() {
        let mut controller = controller_at(0);
        controller.start();
        let run = controller.clock_run().unwrap();
        controller.manual_abort();
        assert!(controller.handle(Input::Tick(run)).is_none());
        assert_eq!(controller.progress().wins, 0);
    }

    #[test]
    fn reset_requires_idle() {
        let mut controller = controller_at(9);
        controller.start();
        assert!(controller.reset().is_none());
        assert!(controller.is_active());
        controller.manual_abort();

        assert!(matches!(controller.reset(), Some(Event::ProgressReset { .. })));
        assert_eq!(controller.progress(), ProgressState::default());
        assert_eq!(controller.store().load(), ProgressState::default());
        assert_eq!(controller.notifier().0.last().map(String::as_str), Some("リセットしました"));
    }

    #[test]
    fn snapshot_reports_idle_full_duration() {
        let controller = controller_at(4);
        match controller.snapshot() {
            Event::StateSnapshot {
                state,
                stage,
                remaining_secs,
                ..
            } => {
                assert_eq!(state, SessionState::Idle);
                assert_eq!(stage, crate::Stage::Chick);
                assert_eq!(remaining_secs, FOCUS_SECS);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
