//! SQLite-based progress storage and session history.
//!
//! Provides persistent storage for:
//! - The three progression counters (key-value table)
//! - An append-only log of finished sessions

use std::path::Path;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, Storage};
use crate::error::{CoreError, DatabaseError, StorageError};
use crate::events::{Event, SessionOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub reason: Option<String>,
    pub level_after: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_sessions: u64,
    pub successes: u64,
    pub failures: u64,
    pub today_sessions: u64,
    pub today_successes: u64,
}

/// SQLite database for progress counters and session history.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open the database at `~/.config/focus15/focus15.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focus15.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id  TEXT NOT NULL,
                    outcome     TEXT NOT NULL,
                    reason      TEXT,
                    level_after INTEGER NOT NULL,
                    started_at  TEXT NOT NULL,
                    ended_at    TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Append a terminal session event to the history.
    ///
    /// Returns the new row id, or `None` for events that do not end a
    /// session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_event(&self, event: &Event) -> Result<Option<i64>, DatabaseError> {
        let (session_id, outcome, reason, level, started_at, ended_at) = match event {
            Event::SessionSucceeded {
                session_id,
                level,
                started_at,
                at,
                ..
            } => (session_id, SessionOutcome::Success, None, *level, started_at, at),
            Event::SessionFailed {
                session_id,
                reason,
                level,
                started_at,
                at,
                ..
            } => (
                session_id,
                SessionOutcome::Failure,
                Some(reason.as_str()),
                *level,
                started_at,
                at,
            ),
            _ => return Ok(None),
        };

        self.conn.execute(
            "INSERT INTO sessions (session_id, outcome, reason, level_after, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id.to_string(),
                outcome.as_str(),
                reason,
                level,
                started_at.to_rfc3339(),
                ended_at.to_rfc3339(),
            ],
        )?;
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Most recent sessions, newest first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, outcome, reason, level_after, started_at, ended_at
             FROM sessions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, outcome, reason, level_after, started_at, ended_at) = row?;
            records.push(SessionRecord {
                id,
                session_id,
                outcome: SessionOutcome::parse(&outcome).ok_or_else(|| {
                    DatabaseError::QueryFailed(format!("unknown outcome '{outcome}'"))
                })?,
                reason,
                level_after,
                started_at: parse_timestamp(&started_at)?,
                ended_at: parse_timestamp(&ended_at)?,
            });
        }
        Ok(records)
    }

    /// Totals over the whole history, plus counts since local midnight.
    ///
    /// # Errors
    /// Returns an error if a query fails.
    pub fn history_stats(&self) -> Result<HistoryStats, DatabaseError> {
        self.history_stats_since(local_day_start(Local::now()))
    }

    fn history_stats_since(&self, since: DateTime<Utc>) -> Result<HistoryStats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT outcome, COUNT(*) FROM sessions GROUP BY outcome",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;

        let mut stats = HistoryStats::default();
        for row in rows {
            let (outcome, count) = row?;
            stats.total_sessions += count;
            match SessionOutcome::parse(&outcome) {
                Some(SessionOutcome::Success) => stats.successes += count,
                Some(SessionOutcome::Failure) => stats.failures += count,
                None => {}
            }
        }

        let (today_sessions, today_successes) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN outcome = 'success' THEN 1 ELSE 0 END), 0)
             FROM sessions
             WHERE ended_at >= ?1",
            params![since.to_rfc3339()],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_sessions = today_sessions;
        stats.today_successes = today_successes;

        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl Storage for Database {
    fn read_int(&self, key: &str) -> Option<i64> {
        match self.kv_get(key) {
            Ok(value) => value?.trim().parse().ok(),
            Err(err) => {
                tracing::warn!(key, error = %err, "progress read failed, using default");
                None
            }
        }
    }

    fn write_int(&mut self, key: &str, value: i64) -> Result<(), StorageError> {
        self.kv_set(key, &value.to_string())
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

/// Start of the local calendar day containing `now`, in UTC.
///
/// Falls back to `now` itself when midnight does not exist locally
/// (a DST jump at 00:00).
pub fn local_day_start(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or(now)
        .with_timezone(&Utc)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FailReason;
    use crate::storage::LEVEL_KEY;
    use uuid::Uuid;

    fn failed(level: u64) -> Event {
        let now = Utc::now();
        Event::SessionFailed {
            session_id: Uuid::new_v4(),
            reason: FailReason::Interaction,
            level,
            fails: 1,
            started_at: now,
            at: now,
        }
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn storage_reads_written_integers() {
        let mut db = Database::open_memory().unwrap();
        db.write_int(LEVEL_KEY, 42).unwrap();
        assert_eq!(db.read_int(LEVEL_KEY), Some(42));
    }

    #[test]
    fn storage_ignores_corrupt_values() {
        let db = Database::open_memory().unwrap();
        db.kv_set(LEVEL_KEY, "forty-two").unwrap();
        assert_eq!(db.read_int(LEVEL_KEY), None);
    }

    #[test]
    fn record_and_query_history() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let ok = Event::SessionSucceeded {
            session_id: Uuid::new_v4(),
            level: 4,
            wins: 4,
            stage: crate::Stage::Chick,
            started_at: now,
            at: now,
        };
        assert!(db.record_event(&ok).unwrap().is_some());
        assert!(db.record_event(&failed(0)).unwrap().is_some());

        let stats = db.history_stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.today_sessions, 2);
        assert_eq!(stats.today_successes, 1);

        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].outcome, SessionOutcome::Failure);
        assert_eq!(recent[0].reason.as_deref(), Some("interaction"));
        assert_eq!(recent[1].level_after, 4);
    }

    #[test]
    fn today_counts_start_at_local_midnight() {
        let db = Database::open_memory().unwrap();
        let day_start = local_day_start(Local::now());
        let finished_at = |at: DateTime<Utc>| Event::SessionSucceeded {
            session_id: Uuid::new_v4(),
            level: 1,
            wins: 1,
            stage: crate::Stage::Chick,
            started_at: at - chrono::Duration::minutes(15),
            at,
        };
        db.record_event(&finished_at(day_start - chrono::Duration::seconds(1)))
            .unwrap();
        db.record_event(&finished_at(day_start)).unwrap();
        db.record_event(&finished_at(day_start + chrono::Duration::hours(9)))
            .unwrap();

        let stats = db.history_stats_since(day_start).unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.today_sessions, 2);
        assert_eq!(stats.today_successes, 2);
    }

    #[test]
    fn local_day_start_is_local_midnight() {
        let now = Local::now();
        let start = local_day_start(now).with_timezone(&Local);
        assert!(start <= now);
        assert_eq!(start.date_naive(), now.date_naive());
        assert_eq!(start.time(), NaiveTime::MIN);
    }

    #[test]
    fn non_terminal_events_are_not_recorded() {
        let db = Database::open_memory().unwrap();
        let event = Event::ProgressReset { at: Utc::now() };
        assert!(db.record_event(&event).unwrap().is_none());
        assert_eq!(db.history_stats().unwrap().total_sessions, 0);
    }
}
