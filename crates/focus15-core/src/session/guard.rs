//! Interaction guard - distraction detection while a session is active
//!
//! While armed, the guard listens on every monitored channel and classifies
//! each incoming signal:
//!
//! - **Interaction** (pointer-down, mouse-down, touch-start, key-down, wheel,
//!   scroll, context-menu): suppressed before it reaches its target and
//!   reported as [`Violation::Interaction`], unless the target is the
//!   emergency-exit control, which passes through untouched.
//! - **Visibility** (view hidden, or focus lost while hidden): reported as
//!   [`Violation::Visibility`]. Focus loss while still visible is ignored.
//!
//! The guard never disarms itself. Reporting a violation is the whole of its
//! job; the session controller decides what the violation means.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// User-input kinds that count as an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    PointerDown,
    MouseDown,
    TouchStart,
    KeyDown,
    Wheel,
    Scroll,
    ContextMenu,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 7] = [
        InteractionKind::PointerDown,
        InteractionKind::MouseDown,
        InteractionKind::TouchStart,
        InteractionKind::KeyDown,
        InteractionKind::Wheel,
        InteractionKind::Scroll,
        InteractionKind::ContextMenu,
    ];
}

/// A subscribable event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Interaction(InteractionKind),
    VisibilityChange,
    Blur,
}

impl Channel {
    /// Every channel the guard monitors.
    pub fn monitored() -> impl Iterator<Item = Channel> {
        InteractionKind::ALL
            .into_iter()
            .map(Channel::Interaction)
            .chain([Channel::VisibilityChange, Channel::Blur])
    }
}

/// Where an interaction landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The designated abort control.
    EmergencyExit,
    Other,
}

/// A raw signal delivered to the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    Interaction { kind: InteractionKind, target: Target },
    VisibilityChange { hidden: bool },
    Blur { hidden: bool },
}

impl Signal {
    /// Interaction on an ordinary target.
    pub fn interaction(kind: InteractionKind) -> Self {
        Signal::Interaction {
            kind,
            target: Target::Other,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Signal::Interaction { kind, .. } => Channel::Interaction(*kind),
            Signal::VisibilityChange { .. } => Channel::VisibilityChange,
            Signal::Blur { .. } => Channel::Blur,
        }
    }
}

/// Violation category reported by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Violation {
    Interaction,
    Visibility,
}

/// What the guard did with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Guard disarmed or channel not subscribed.
    Unobserved,
    /// Observed and allowed through unmodified.
    PassThrough,
    /// Default action and propagation cancelled; violation reported.
    Suppressed(Violation),
    /// Violation reported; nothing to suppress.
    Reported(Violation),
}

impl Verdict {
    pub fn violation(self) -> Option<Violation> {
        match self {
            Verdict::Suppressed(v) | Verdict::Reported(v) => Some(v),
            Verdict::Unobserved | Verdict::PassThrough => None,
        }
    }

    /// Whether the caller must cancel the signal's default effect.
    pub fn suppresses(self) -> bool {
        matches!(self, Verdict::Suppressed(_))
    }
}

/// Togglable distraction detector.
#[derive(Debug, Clone, Default)]
pub struct InteractionGuard {
    armed: bool,
    subscribed: BTreeSet<Channel>,
    /// Total subscribe operations performed, for observing idempotency.
    subscribe_ops: u64,
}

impl InteractionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn subscribed(&self) -> &BTreeSet<Channel> {
        &self.subscribed
    }

    pub fn subscribe_ops(&self) -> u64 {
        self.subscribe_ops
    }

    /// Subscribe to every monitored channel. No-op when already armed.
    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        for channel in Channel::monitored() {
            if self.subscribed.insert(channel) {
                self.subscribe_ops += 1;
            }
        }
    }

    /// Unsubscribe from every channel. No-op when already disarmed.
    pub fn disarm(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.subscribed.clear();
    }

    /// Classify one signal. Exactly one verdict per signal.
    pub fn inspect(&self, signal: Signal) -> Verdict {
        if !self.armed || !self.subscribed.contains(&signal.channel()) {
            return Verdict::Unobserved;
        }

        match signal {
            Signal::Interaction {
                target: Target::EmergencyExit,
                ..
            } => Verdict::PassThrough,
            Signal::Interaction { .. } => Verdict::Suppressed(Violation::Interaction),
            Signal::VisibilityChange { hidden: true } | Signal::Blur { hidden: true } => {
                Verdict::Reported(Violation::Visibility)
            }
            // Focus loss alone is too noisy to count.
            Signal::VisibilityChange { hidden: false } | Signal::Blur { hidden: false } => {
                Verdict::PassThrough
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_guard_observes_nothing() {
        let guard = InteractionGuard::new();
        for kind in InteractionKind::ALL {
            assert_eq!(guard.inspect(Signal::interaction(kind)), Verdict::Unobserved);
        }
        assert_eq!(
            guard.inspect(Signal::VisibilityChange { hidden: true }),
            Verdict::Unobserved
        );
    }

    #[test]
    fn armed_guard_suppresses_every_interaction_kind() {
        let mut guard = InteractionGuard::new();
        guard.arm();
        for kind in InteractionKind::ALL {
            let verdict = guard.inspect(Signal::interaction(kind));
            assert_eq!(verdict, Verdict::Suppressed(Violation::Interaction));
            assert!(verdict.suppresses());
        }
    }

    #[test]
    fn emergency_exit_passes_through() {
        let mut guard = InteractionGuard::new();
        guard.arm();
        let signal = Signal::Interaction {
            kind: InteractionKind::KeyDown,
            target: Target::EmergencyExit,
        };
        let verdict = guard.inspect(signal);
        assert_eq!(verdict, Verdict::PassThrough);
        assert!(!verdict.suppresses());
        assert_eq!(verdict.violation(), None);
    }

    #[test]
    fn hidden_view_is_a_visibility_violation() {
        let mut guard = InteractionGuard::new();
        guard.arm();
        assert_eq!(
            guard.inspect(Signal::VisibilityChange { hidden: true }),
            Verdict::Reported(Violation::Visibility)
        );
        assert_eq!(
            guard.inspect(Signal::Blur { hidden: true }),
            Verdict::Reported(Violation::Visibility)
        );
    }

    #[test]
    fn blur_while_visible_is_ignored() {
        let mut guard = InteractionGuard::new();
        guard.arm();
        assert_eq!(guard.inspect(Signal::Blur { hidden: false }), Verdict::PassThrough);
        assert_eq!(
            guard.inspect(Signal::VisibilityChange { hidden: false }),
            Verdict::PassThrough
        );
    }

    #[test]
    fn arm_twice_equals_arm_once() {
        let mut once = InteractionGuard::new();
        once.arm();
        let mut twice = InteractionGuard::new();
        twice.arm();
        twice.arm();

        assert_eq!(once.subscribed(), twice.subscribed());
        assert_eq!(once.subscribe_ops(), twice.subscribe_ops());
        assert_eq!(twice.subscribed().len(), 9);
        for kind in InteractionKind::ALL {
            assert_eq!(
                once.inspect(Signal::interaction(kind)),
                twice.inspect(Signal::interaction(kind))
            );
        }
    }

    #[test]
    fn disarm_twice_equals_disarm_once() {
        let mut guard = InteractionGuard::new();
        guard.arm();
        guard.disarm();
        guard.disarm();
        assert!(!guard.is_armed());
        assert!(guard.subscribed().is_empty());
        assert_eq!(
            guard.inspect(Signal::interaction(InteractionKind::Wheel)),
            Verdict::Unobserved
        );
    }

    #[test]
    fn rearm_after_disarm_resubscribes() {
        let mut guard = InteractionGuard::new();
        guard.arm();
        guard.disarm();
        guard.arm();
        assert_eq!(guard.subscribe_ops(), 18);
        assert_eq!(guard.subscribed().len(), 9);
    }
}
