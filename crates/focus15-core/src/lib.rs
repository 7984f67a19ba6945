//! # focus15 Core Library
//!
//! This library provides the core logic for focus15, a self-enforced
//! fifteen-minute focus timer. A session either runs to completion untouched
//! and grows the penguin by one level, or is broken by a distraction and
//! costs five levels.
//!
//! ## Architecture
//!
//! - **Session Controller**: The single state machine that owns the clock,
//!   the guard and the progress counters; every input flows through
//!   `handle()`
//! - **Interaction Guard**: Classifies input and visibility signals as
//!   violations while a session is active
//! - **Session Clock**: A one-second countdown driven by the caller's ticks
//! - **Storage**: Progress counters behind a small `Storage` trait, with
//!   SQLite and in-memory backends, plus TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionController`]: Core state machine
//! - [`ProgressStore`]: Load/save of the growth counters
//! - [`Database`]: SQLite progress and session history
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod progress;
pub mod session;
pub mod storage;

pub use error::{ConfigError, CoreError, DatabaseError, StorageError};
pub use events::{Event, FailReason, SessionOutcome};
pub use progress::{stage, ProgressState, ProgressStore, Stage, FOCUS_SECS, PENALTY};
pub use session::{
    Input, InteractionGuard, InteractionKind, Notifier, Renderer, RunId, SessionClock,
    SessionController, SessionState, Signal, Target, Verdict, Violation,
};
pub use storage::{Config, Database, MemoryStorage, Storage};
