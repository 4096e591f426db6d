//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::catalog::ChannelEntry;
use crate::output::RunSummary;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, request_count, \
     blocked_count, channels_attempted, channels_resolved, duplicate_groups";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Maps a `runs` row selected with `RUN_COLUMNS`
fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status = RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed);

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status,
        summary: RunSummary {
            request_count: row.get::<_, i64>(5)? as u64,
            blocked_count: row.get::<_, i64>(6)? as u64,
            channels_attempted: row.get::<_, i64>(7)? as u64,
            channels_resolved: row.get::<_, i64>(8)? as u64,
            duplicate_groups: row.get::<_, i64>(9)? as u64,
            cancelled: status == RunStatus::Interrupted,
        },
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);

        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);

        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let status = if summary.cancelled {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };

        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, request_count = ?3, blocked_count = ?4,
             channels_attempted = ?5, channels_resolved = ?6, duplicate_groups = ?7
             WHERE id = ?8",
            params![
                status.to_db_string(),
                now,
                summary.request_count as i64,
                summary.blocked_count as i64,
                summary.channels_attempted as i64,
                summary.channels_resolved as i64,
                summary.duplicate_groups as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Entry Management =====

    fn insert_entries(&mut self, run_id: i64, entries: &[ChannelEntry]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO channel_entries (run_id, canonical_name, source_site, page_url,
                 resolved_url, backup_urls, duplicate_group, verified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for entry in entries {
                stmt.execute(params![
                    run_id,
                    entry.canonical_name,
                    entry.source_site,
                    entry.page_url,
                    entry.resolved_url,
                    entry.backup_urls.join("\n"),
                    entry.duplicate_group,
                    entry.verified
                ])?;
            }
        }
        tx.commit()?;

        Ok(entries.len())
    }

    fn load_entries(&self, run_id: i64) -> StorageResult<Vec<ChannelEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT canonical_name, source_site, page_url, resolved_url, backup_urls,
             duplicate_group, verified
             FROM channel_entries WHERE run_id = ?1 ORDER BY id",
        )?;

        let entries = stmt
            .query_map(params![run_id], |row| {
                let backups: String = row.get(4)?;
                Ok(ChannelEntry {
                    canonical_name: row.get(0)?,
                    source_site: row.get(1)?,
                    page_url: row.get(2)?,
                    resolved_url: row.get(3)?,
                    backup_urls: backups
                        .lines()
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect(),
                    duplicate_group: row.get(5)?,
                    verified: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn count_entries(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM channel_entries WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
