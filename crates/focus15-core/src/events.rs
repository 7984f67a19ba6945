use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress::{ProgressState, Stage};
use crate::session::{SessionState, Violation};

/// Why a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailReason {
    /// Pointer, key, wheel, scroll or context-menu input.
    Interaction,
    /// The view was hidden (switched away or minimized).
    Visibility,
    /// The emergency-exit control was used.
    Manual,
}

impl FailReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailReason::Interaction => "interaction",
            FailReason::Visibility => "visibility",
            FailReason::Manual => "manual",
        }
    }

    /// User-facing reason text.
    pub fn label(self) -> &'static str {
        match self {
            FailReason::Interaction => "操作検知",
            FailReason::Visibility => "他タブ/最小化",
            FailReason::Manual => "手動終了",
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Violation> for FailReason {
    fn from(violation: Violation) -> Self {
        match violation {
            Violation::Interaction => FailReason::Interaction,
            Violation::Visibility => FailReason::Visibility,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    Success,
    Failure,
}

impl SessionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Success => "success",
            SessionOutcome::Failure => "failure",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(SessionOutcome::Success),
            "failure" => Some(SessionOutcome::Failure),
            _ => None,
        }
    }
}

/// Every state change of the session controller produces an Event.
/// The terminal UI renders from them; the history log records them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    Ticked {
        session_id: Uuid,
        remaining_secs: u64,
    },
    SessionSucceeded {
        session_id: Uuid,
        level: u64,
        wins: u64,
        stage: Stage,
        started_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    SessionFailed {
        session_id: Uuid,
        reason: FailReason,
        level: u64,
        fails: u64,
        started_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ProgressReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        progress: ProgressState,
        stage: Stage,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// True for the two events that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::SessionSucceeded { .. } | Event::SessionFailed { .. }
        )
    }
}
