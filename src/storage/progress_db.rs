//! SQLite persistence for progress and attempt history.
//!
//! [`ProgressDb`] is the durable half of the two-step write: the CLI hydrates a
//! [`MemoryProgressStore`] from it at startup and hands it to the grading
//! pipeline as a [`ProgressSink`]. Blocking SQLite calls run on the blocking
//! thread pool.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::core::models::{AttemptRecord, AttemptResult, ErrorKind, SkillProgress};
use crate::error::{GymError, Result};
use crate::storage::progress::{MemoryProgressStore, ProgressSink};
use crate::storage::progress_schema::run_migrations;

/// Handle to the progress database. Cheap to clone.
#[derive(Clone)]
pub struct ProgressDb {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for ProgressDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDb").finish_non_exhaustive()
    }
}

impl ProgressDb {
    /// Open or create the database at `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrations fail.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| GymError::Database(format!("open {}: {e}", path.display())))?;
        Self::init(conn)
    }

    /// # Errors
    /// Returns an error if migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let version = run_migrations(&mut conn)?;
        tracing::debug!(version, "Progress database ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    async fn run_blocking<T: Send + 'static>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T> + Send + 'static,
    ) -> Result<T> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| GymError::Other(anyhow::anyhow!("database task failed: {e}")))?
    }

    // -------------------------------------------------------------------------
    // Progress
    // -------------------------------------------------------------------------

    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn get_progress(&self, skill_key: &str) -> Result<Option<SkillProgress>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT skill_key, box_level, next_review, last_result \
                 FROM gym_progress WHERE skill_key = ?1",
                [skill_key],
                progress_from_row,
            )
            .optional()
            .map_err(GymError::from)
        })
    }

    /// All progress rows ordered by skill key.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn load_progress(&self) -> Result<Vec<SkillProgress>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT skill_key, box_level, next_review, last_result \
                 FROM gym_progress ORDER BY skill_key",
            )?;
            let rows = stmt.query_map([], progress_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(GymError::from)
        })
    }

    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn save_progress(&self, progress: &SkillProgress) -> Result<()> {
        self.with_conn(|conn| upsert_progress(conn, progress))
    }

    /// Returns whether a row was removed.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn delete_progress_row(&self, skill_key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM gym_progress WHERE skill_key = ?1", [skill_key])?;
            Ok(n > 0)
        })
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Attempt history in the order it was written.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn load_attempts(&self) -> Result<Vec<AttemptRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT skill_key, timestamp, is_correct, score, time_taken_ms, error_kind \
                 FROM gym_history ORDER BY id",
            )?;
            let rows = stmt.query_map([], attempt_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(GymError::from)
        })
    }

    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn save_attempt(&self, record: &AttemptRecord) -> Result<i64> {
        self.with_conn(|conn| insert_attempt(conn, record))
    }

    /// Build an in-memory store holding everything in the database.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    pub fn load_store(&self) -> Result<MemoryProgressStore> {
        let progress = self.load_progress()?;
        let attempts = self.load_attempts()?;
        tracing::debug!(
            skills = progress.len(),
            attempts = attempts.len(),
            "Hydrated progress store"
        );
        Ok(MemoryProgressStore::hydrate(progress, attempts))
    }
}

fn upsert_progress(conn: &Connection, progress: &SkillProgress) -> Result<()> {
    conn.execute(
        "INSERT INTO gym_progress (skill_key, box_level, next_review, last_result, updated_at) \
         VALUES (?1, ?2, ?3, ?4, datetime('now')) \
         ON CONFLICT(skill_key) DO UPDATE SET \
            box_level = excluded.box_level, \
            next_review = excluded.next_review, \
            last_result = excluded.last_result, \
            updated_at = excluded.updated_at",
        params![
            progress.skill_key,
            progress.box_level,
            progress.next_review_at,
            progress.last_result.as_str(),
        ],
    )?;
    Ok(())
}

fn insert_attempt(conn: &Connection, record: &AttemptRecord) -> Result<i64> {
    let duration = i64::try_from(record.duration_ms).unwrap_or(i64::MAX);
    conn.execute(
        "INSERT INTO gym_history (skill_key, timestamp, is_correct, score, time_taken_ms, error_kind) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.skill_key,
            record.timestamp_ms,
            record.correct,
            record.score,
            duration,
            record.error_kind.map(ErrorKind::as_str),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<SkillProgress> {
    let last_result: String = row.get(3)?;
    Ok(SkillProgress::new(
        row.get::<_, String>(0)?,
        row.get(1)?,
        row.get(2)?,
        AttemptResult::parse(&last_result).unwrap_or(AttemptResult::Incorrect),
    ))
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<AttemptRecord> {
    let duration: i64 = row.get(4)?;
    let error_kind: Option<String> = row.get(5)?;
    Ok(AttemptRecord {
        skill_key: row.get(0)?,
        timestamp_ms: row.get(1)?,
        correct: row.get(2)?,
        score: row.get(3)?,
        duration_ms: u64::try_from(duration).unwrap_or(0),
        error_kind: error_kind.as_deref().and_then(ErrorKind::parse),
    })
}

#[async_trait]
impl ProgressSink for ProgressDb {
    async fn persist_progress(&self, progress: &SkillProgress) -> Result<()> {
        let progress = progress.clone();
        self.run_blocking(move |conn| upsert_progress(conn, &progress))
            .await
    }

    async fn persist_attempt(&self, record: &AttemptRecord) -> Result<()> {
        let record = record.clone();
        self.run_blocking(move |conn| insert_attempt(conn, &record).map(|_| ()))
            .await
    }

    async fn delete_progress(&self, skill_key: &str) -> Result<()> {
        let skill_key = skill_key.to_string();
        self.run_blocking(move |conn| {
            conn.execute("DELETE FROM gym_progress WHERE skill_key = ?1", [&skill_key])?;
            Ok(())
        })
        .await
    }
}
