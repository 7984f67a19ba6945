//! One-second countdown owned by the active session.
//!
//! The clock has no thread of its own. Whatever drives it delivers one
//! `tick(run)` per second; each run carries a [`RunId`] so that ticks queued
//! by a previous run are recognized and dropped after a restart.

use serde::{Deserialize, Serialize};

/// Identifies one start..stop run of the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second elapsed; carries the new remaining time.
    Tick(u64),
    /// The countdown reached its end. Fired once per run.
    Complete,
}

#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    running: bool,
    remaining_secs: u64,
    duration_secs: u64,
    run: RunId,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// The run ticks must belong to, if the clock is running.
    pub fn current_run(&self) -> Option<RunId> {
        self.running.then_some(self.run)
    }

    /// Begin a new run. A run already in progress is stopped first.
    pub fn start(&mut self, duration_secs: u64) -> RunId {
        self.stop();
        self.run = RunId(self.run.0 + 1);
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.running = true;
        self.run
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
    }

    /// Advance by one second. Ticks from a stale run or while stopped are
    /// ignored.
    pub fn tick(&mut self, run: RunId) -> Option<ClockEvent> {
        if !self.running || run != self.run {
            return None;
        }
        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.running = false;
            return Some(ClockEvent::Complete);
        }
        self.remaining_secs -= 1;
        Some(ClockEvent::Tick(self.remaining_secs))
    }
}
