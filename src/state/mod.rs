//! State module for tracking harvest progress
//!
//! This module provides the state shared by the fetch layer and the worker pool.
//!
//! # Components
//!
//! - `FetchState`: The validated state machine of one logical fetch (attempt, block, backoff, ...)
//! - `RunCounters`: Run-wide request and block counters
//! - `HostPacer`: Per-host request spacing shared by all workers

mod counters;
mod fetch_state;
mod host_state;

// Re-export main types
pub use counters::RunCounters;
pub use fetch_state::FetchState;
pub use host_state::HostPacer;
