//! Persistent growth progression.
//!
//! Three counters survive restarts: the growth level, the number of
//! completed sessions and the number of failed ones. The level is the only
//! counter that can go down, and it never goes below zero.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{Storage, FAILS_KEY, LEVEL_KEY, WINS_KEY};

/// Length of one focus session in seconds (15 minutes).
pub const FOCUS_SECS: u64 = 15 * 60;

/// Levels lost when a session fails.
pub const PENALTY: u64 = 5;

/// Display-facing growth stage, derived purely from the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Egg,
    Chick,
    Juvenile,
    Adult,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Egg, Stage::Chick, Stage::Juvenile, Stage::Adult];

    /// Stage for a level. Negative levels map to `Egg`.
    pub fn for_level(level: i64) -> Self {
        match level {
            i64::MIN..=0 => Stage::Egg,
            1..=4 => Stage::Chick,
            5..=14 => Stage::Juvenile,
            _ => Stage::Adult,
        }
    }

    /// Stable machine identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Egg => "egg",
            Stage::Chick => "chick",
            Stage::Juvenile => "juvenile",
            Stage::Adult => "adult",
        }
    }

    /// Label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Egg => "卵",
            Stage::Chick => "ヒナ",
            Stage::Juvenile => "若鳥",
            Stage::Adult => "大人",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pure stage query used by renderers.
pub fn stage(level: i64) -> Stage {
    Stage::for_level(level)
}

/// The persisted progression counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub level: u64,
    pub wins: u64,
    pub fails: u64,
}

impl ProgressState {
    pub fn stage(&self) -> Stage {
        Stage::for_level(i64::try_from(self.level).unwrap_or(i64::MAX))
    }

    /// Reward for a completed session.
    pub fn record_success(&mut self) {
        self.wins = self.wins.saturating_add(1);
        self.level = self.level.saturating_add(1);
    }

    /// Penalty for a failed session; the level floors at zero.
    pub fn record_failure(&mut self) {
        self.fails = self.fails.saturating_add(1);
        self.level = self.level.saturating_sub(PENALTY);
    }
}

/// Loads and saves [`ProgressState`] through a [`Storage`] backend.
#[derive(Debug)]
pub struct ProgressStore<S> {
    storage: S,
}

impl<S: Storage> ProgressStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Read all three counters. Missing, unparseable or negative values
    /// become 0, so this always yields a valid state.
    pub fn load(&self) -> ProgressState {
        ProgressState {
            level: self.read_counter(LEVEL_KEY),
            wins: self.read_counter(WINS_KEY),
            fails: self.read_counter(FAILS_KEY),
        }
    }

    /// Write all three counters.
    ///
    /// # Errors
    ///
    /// Returns the first backend write failure. Fields written before the
    /// failure stay written.
    pub fn save(&mut self, state: &ProgressState) -> Result<(), StorageError> {
        for (key, value) in [
            (LEVEL_KEY, state.level),
            (WINS_KEY, state.wins),
            (FAILS_KEY, state.fails),
        ] {
            let value = i64::try_from(value).unwrap_or(i64::MAX);
            self.storage.write_int(key, value)?;
        }
        Ok(())
    }

    fn read_counter(&self, key: &str) -> u64 {
        self.storage
            .read_int(key)
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(0)
    }
}
