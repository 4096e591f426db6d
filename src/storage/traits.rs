//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::catalog::ChannelEntry;
use crate::output::RunSummary;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines the database operations needed to record harvest runs.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Records the counts of a finished run and stamps its finish time
    ///
    /// A cancelled summary marks the run `Interrupted`, otherwise `Completed`.
    fn complete_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()>;

    // ===== Entry Management =====

    /// Stores the catalog entries of a run in one transaction
    ///
    /// # Returns
    ///
    /// The number of rows inserted
    fn insert_entries(&mut self, run_id: i64, entries: &[ChannelEntry]) -> StorageResult<usize>;

    /// Loads the entries of a run in insertion order
    fn load_entries(&self, run_id: i64) -> StorageResult<Vec<ChannelEntry>>;

    /// Counts the entries of a run
    fn count_entries(&self, run_id: i64) -> StorageResult<u64>;
}
