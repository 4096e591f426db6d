//! Configuration module for Stream-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; omitted keys take the defaults documented on each type.
//!
//! # Example
//!
//! ```no_run
//! use stream_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvester will use {} workers", config.harvester.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ChannelTarget, Config, FetchConfig, FilterConfig, HarvesterConfig, OutputConfig, SiteProfile,
    DEFAULT_DENY_HOSTS, DEFAULT_EMBED_HOSTS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
