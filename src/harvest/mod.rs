//! Harvest module - resolving channels into stream addresses
//!
//! This module contains the channel pipeline and its orchestration:
//! - `resolver`: breadth-first frame recursion for one channel
//! - `coordinator`: the worker pool running every channel of a run
//! - `probe`: optional reachability checks of resolved addresses
//! - `discovery`: channel links collected from site landing pages

mod coordinator;
mod discovery;
mod probe;
mod resolver;

pub use coordinator::{HarvestOutcome, Harvester};
pub use discovery::{discover_channels, discover_site};
pub use probe::VerificationProbe;
pub use resolver::ChannelResolver;
