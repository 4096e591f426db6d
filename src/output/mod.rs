//! Output module for harvest results
//!
//! This module handles:
//! - Writing the channel catalog as an M3U playlist
//! - Summarizing and printing the counts of a run

mod playlist;
mod summary;

pub use playlist::{render_playlist, write_playlist};
pub use summary::{print_summary, RunSummary};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
