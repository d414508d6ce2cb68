//! Persistent session → thread bindings in SQLite.
//!
//! Hook processes are short-lived and may run concurrently against the same
//! file, so every operation opens its own WAL-mode connection and runs as a
//! single transaction; the in-process mutex only serializes callers within
//! one invocation. The store is advisory: Discord is authoritative, and
//! callers treat a `StoreError` the same as "no record".

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};

use crate::migration_runner;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("thread store database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("thread store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One durable session → thread binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub session_id: String,
    pub thread_id: String,
    pub channel_id: String,
    pub thread_name: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub is_archived: bool,
}

impl ThreadRecord {
    pub fn new(
        session_id: impl Into<String>,
        thread_id: impl Into<String>,
        channel_id: impl Into<String>,
        thread_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            thread_id: thread_id.into(),
            channel_id: channel_id.into(),
            thread_name: thread_name.into(),
            created_at: now,
            last_used: now,
            is_archived: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub active: u64,
    pub archived: u64,
    pub channels: u64,
    pub oldest_last_used: Option<DateTime<Utc>>,
    pub newest_last_used: Option<DateTime<Utc>>,
}

pub struct ThreadStore {
    db_path: PathBuf,
    retention_days: u32,
    lock: Mutex<()>,
}

const SELECT_COLUMNS: &str =
    "session_id, thread_id, channel_id, thread_name, created_at, last_used, is_archived";

impl ThreadStore {
    /// Open (creating if needed) the store and bring its schema up to date.
    pub fn open(db_path: impl Into<PathBuf>, retention_days: u32) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&db_path)?;
        migration_runner::run_migrations(&mut conn)?;

        Ok(Self {
            db_path,
            retention_days,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Upsert keyed by `session_id`. Refreshes every field, bumps
    /// `last_used`, and evicts stale records in the same transaction.
    pub fn store(&self, record: &ThreadRecord) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let evicted = delete_older_than(&tx, self.cutoff(self.retention_days))?;
        let now = format_ts(Utc::now().max(record.last_used));
        tx.execute(
            "INSERT INTO thread_records (session_id, thread_id, channel_id, thread_name, created_at, last_used, is_archived)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(session_id) DO UPDATE SET
               created_at = CASE WHEN thread_records.thread_id = excluded.thread_id
                                 THEN thread_records.created_at ELSE excluded.created_at END,
               thread_id = excluded.thread_id,
               channel_id = excluded.channel_id,
               thread_name = excluded.thread_name,
               last_used = max(thread_records.last_used, excluded.last_used),
               is_archived = excluded.is_archived",
            params![
                record.session_id,
                record.thread_id,
                record.channel_id,
                record.thread_name,
                format_ts(record.created_at),
                now,
                record.is_archived,
            ],
        )?;
        tx.commit()?;

        if evicted > 0 {
            info!(
                component = "thread_store",
                event = "thread_store.evicted",
                count = evicted,
                retention_days = self.retention_days,
                "Evicted stale thread records"
            );
        }
        debug!(
            component = "thread_store",
            event = "thread_store.stored",
            session_id = %record.session_id,
            thread_id = %record.thread_id,
        );
        Ok(())
    }

    /// Look up a session's binding, touching `last_used` on a hit.
    pub fn get(&self, session_id: &str) -> Result<Option<ThreadRecord>, StoreError> {
        let _guard = self.guard();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let touched = tx.execute(
            "UPDATE thread_records SET last_used = max(last_used, ?1) WHERE session_id = ?2",
            params![format_ts(Utc::now()), session_id],
        )?;
        if touched == 0 {
            return Ok(None);
        }

        let record = tx
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM thread_records WHERE session_id = ?1"),
                params![session_id],
                map_record,
            )
            .optional()?;
        tx.commit()?;
        Ok(record)
    }

    pub fn update_status(&self, session_id: &str, archived: bool) -> Result<bool, StoreError> {
        let _guard = self.guard();
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE thread_records SET is_archived = ?1, last_used = max(last_used, ?2) WHERE session_id = ?3",
            params![archived, format_ts(Utc::now()), session_id],
        )?;
        Ok(changed > 0)
    }

    pub fn remove(&self, session_id: &str) -> Result<bool, StoreError> {
        let _guard = self.guard();
        let conn = self.connect()?;
        let removed = conn.execute(
            "DELETE FROM thread_records WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(removed > 0)
    }

    pub fn find_by_channel(&self, channel_id: &str) -> Result<Vec<ThreadRecord>, StoreError> {
        let _guard = self.guard();
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM thread_records WHERE channel_id = ?1 ORDER BY last_used DESC"
        ))?;
        let records = stmt
            .query_map(params![channel_id], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn find_by_name(
        &self,
        channel_id: &str,
        thread_name: &str,
    ) -> Result<Option<ThreadRecord>, StoreError> {
        let _guard = self.guard();
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM thread_records
                     WHERE channel_id = ?1 AND thread_name = ?2
                     ORDER BY last_used DESC LIMIT 1"
                ),
                params![channel_id, thread_name],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Delete every record not used within `max_age_days`.
    pub fn cleanup_stale(&self, max_age_days: u32) -> Result<usize, StoreError> {
        let _guard = self.guard();
        let conn = self.connect()?;
        let removed = delete_older_than(&conn, self.cutoff(max_age_days))?;
        if removed > 0 {
            info!(
                component = "thread_store",
                event = "thread_store.cleanup",
                count = removed,
                max_age_days = max_age_days,
                "Removed stale thread records"
            );
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let _guard = self.guard();
        let conn = self.connect()?;
        let (total, archived, channels, oldest, newest): (
            i64,
            i64,
            i64,
            Option<String>,
            Option<String>,
        ) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN is_archived THEN 1 ELSE 0 END), 0),
                    COUNT(DISTINCT channel_id),
                    MIN(last_used),
                    MAX(last_used)
             FROM thread_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;

        let total = total.max(0) as u64;
        let archived = archived.max(0) as u64;
        Ok(StoreStats {
            total,
            active: total.saturating_sub(archived),
            archived,
            channels: channels.max(0) as u64,
            oldest_last_used: oldest.as_deref().and_then(parse_ts),
            newest_last_used: newest.as_deref().and_then(parse_ts),
        })
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        migration_runner::configure_connection(&conn)?;
        Ok(conn)
    }

    fn cutoff(&self, max_age_days: u32) -> DateTime<Utc> {
        Utc::now() - Duration::days(i64::from(max_age_days))
    }
}

fn delete_older_than(conn: &Connection, cutoff: DateTime<Utc>) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM thread_records WHERE last_used < ?1",
        params![format_ts(cutoff)],
    )
}

/// Fixed-width UTC timestamps so string comparison orders by time.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<ThreadRecord> {
    let ts = |idx: usize| -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    };

    Ok(ThreadRecord {
        session_id: row.get(0)?,
        thread_id: row.get(1)?,
        channel_id: row.get(2)?,
        thread_name: row.get(3)?,
        created_at: ts(4)?,
        last_used: ts(5)?,
        is_archived: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> ThreadStore {
        ThreadStore::open(dir.path().join("threads.db"), 30).expect("open store")
    }

    fn set_last_used(store: &ThreadStore, session_id: &str, ts: DateTime<Utc>) {
        let conn = store.connect().expect("connect");
        conn.execute(
            "UPDATE thread_records SET last_used = ?1 WHERE session_id = ?2",
            params![format_ts(ts), session_id],
        )
        .expect("backdate");
    }

    #[test]
    fn store_then_get_round_trips_binding() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);

        store
            .store(&ThreadRecord::new("abc12345-0000", "111", "100", "Session abc12345"))
            .expect("store");

        let record = store.get("abc12345-0000").expect("get").expect("present");
        assert_eq!(record.thread_id, "111");
        assert_eq!(record.channel_id, "100");
        assert_eq!(record.thread_name, "Session abc12345");
        assert!(!record.is_archived);
        assert!(store.get("missing").expect("get").is_none());
    }

    #[test]
    fn store_is_an_upsert_per_session() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);

        store
            .store(&ThreadRecord::new("s1", "111", "100", "Session s1"))
            .expect("store");
        let mut replacement = ThreadRecord::new("s1", "222", "100", "Session s1");
        replacement.is_archived = true;
        store.store(&replacement).expect("restore");

        let records = store.find_by_channel("100").expect("find");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].thread_id, "222");
        assert!(records[0].is_archived);
    }

    #[test]
    fn get_never_moves_last_used_backwards() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .store(&ThreadRecord::new("s1", "111", "100", "Session s1"))
            .expect("store");

        let future = Utc::now() + Duration::days(1);
        set_last_used(&store, "s1", future);

        let record = store.get("s1").expect("get").expect("present");
        assert_eq!(format_ts(record.last_used), format_ts(future));
    }

    #[test]
    fn get_touches_last_used() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .store(&ThreadRecord::new("s1", "111", "100", "Session s1"))
            .expect("store");

        let past = Utc::now() - Duration::days(2);
        set_last_used(&store, "s1", past);

        let record = store.get("s1").expect("get").expect("present");
        assert!(record.last_used > past);
    }

    #[test]
    fn update_status_and_remove_report_whether_a_row_changed() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .store(&ThreadRecord::new("s1", "111", "100", "Session s1"))
            .expect("store");

        assert!(store.update_status("s1", true).expect("update"));
        assert!(store.get("s1").expect("get").expect("present").is_archived);
        assert!(!store.update_status("nope", true).expect("update"));

        assert!(store.remove("s1").expect("remove"));
        assert!(!store.remove("s1").expect("remove again"));
        assert!(store.get("s1").expect("get").is_none());
    }

    #[test]
    fn find_by_name_is_scoped_to_channel() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .store(&ThreadRecord::new("s1", "111", "100", "Session abc12345"))
            .expect("store");
        store
            .store(&ThreadRecord::new("s2", "222", "200", "Session abc12345"))
            .expect("store");

        let found = store
            .find_by_name("200", "Session abc12345")
            .expect("find")
            .expect("present");
        assert_eq!(found.thread_id, "222");
        assert!(store
            .find_by_name("300", "Session abc12345")
            .expect("find")
            .is_none());
    }

    #[test]
    fn cleanup_stale_evicts_old_records() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .store(&ThreadRecord::new("old", "111", "100", "Session old"))
            .expect("store");
        store
            .store(&ThreadRecord::new("fresh", "222", "100", "Session fresh"))
            .expect("store");
        set_last_used(&store, "old", Utc::now() - Duration::days(31));

        assert_eq!(store.cleanup_stale(30).expect("cleanup"), 1);
        assert!(store.get("old").expect("get").is_none());
        assert!(store.get("fresh").expect("get").is_some());
    }

    #[test]
    fn store_evicts_stale_records_opportunistically() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .store(&ThreadRecord::new("old", "111", "100", "Session old"))
            .expect("store");
        set_last_used(&store, "old", Utc::now() - Duration::days(45));

        store
            .store(&ThreadRecord::new("new", "222", "100", "Session new"))
            .expect("store");

        assert_eq!(store.stats().expect("stats").total, 1);
        assert!(store.get("old").expect("get").is_none());
    }

    #[test]
    fn stats_aggregate_counts() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        assert_eq!(store.stats().expect("stats"), StoreStats::default());

        store
            .store(&ThreadRecord::new("s1", "111", "100", "Session s1"))
            .expect("store");
        store
            .store(&ThreadRecord::new("s2", "222", "200", "Session s2"))
            .expect("store");
        store.update_status("s2", true).expect("archive");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.archived, 1);
        assert_eq!(stats.channels, 2);
        assert!(stats.oldest_last_used.is_some());
        assert!(stats.oldest_last_used <= stats.newest_last_used);
    }

    #[test]
    fn separate_handles_share_the_same_file() {
        let dir = TempDir::new().expect("tempdir");
        let first = open_store(&dir);
        let second = open_store(&dir);

        first
            .store(&ThreadRecord::new("s1", "111", "100", "Session s1"))
            .expect("store");
        assert_eq!(
            second.get("s1").expect("get").expect("present").thread_id,
            "111"
        );
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("threads.db");
        std::fs::write(&path, vec![b'x'; 8192]).expect("write");

        assert!(ThreadStore::open(&path, 30).is_err());
    }
}
