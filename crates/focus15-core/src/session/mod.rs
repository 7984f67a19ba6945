mod clock;
mod controller;
mod guard;

use serde::{Deserialize, Serialize};

pub use clock::{ClockEvent, RunId, SessionClock};
pub use controller::{Input, Notifier, Renderer, SessionController, SignalOutcome};
pub use guard::{Channel, InteractionGuard, InteractionKind, Signal, Target, Verdict, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active {
        remaining_secs: u64,
        duration_secs: u64,
    },
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }
}
