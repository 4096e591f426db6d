//! Stream-Harvest main entry point
//!
//! This is the command-line interface for the Stream-Harvest live-stream address harvester.

use anyhow::Context;
use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use stream_harvest::config::{load_config_with_hash, ChannelTarget, Config};
use stream_harvest::output::{print_summary, write_playlist};
use stream_harvest::storage::{RunStatus, SqliteStorage, Storage};
use stream_harvest::Harvester;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Stream-Harvest: a resilient live-stream address harvester
///
/// Stream-Harvest visits the channel pages of configured sites, follows their embedded
/// player frames, and writes the stream addresses it recovers into an M3U playlist.
#[derive(Parser, Debug)]
#[command(name = "stream-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resilient live-stream address harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without sending requests
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the latest run from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Also harvest channels discovered on each site's landing page
    #[arg(long)]
    discover: bool,

    /// Probe every resolved address and drop unreachable ones from the playlist
    #[arg(long)]
    verify: bool,

    /// Playlist path, overriding the configuration
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.verify {
        config.harvester.verify_streams = true;
    }
    if let Some(output) = &cli.output {
        config.output.playlist_path = output.display().to_string();
    }

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, &config_hash, cli.discover, cli.quiet).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stream_harvest=info,warn"),
            1 => EnvFilter::new("stream_harvest=debug,info"),
            2 => EnvFilter::new("stream_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Stream-Harvest Dry Run ===\n");

    println!("Harvester Configuration:");
    println!("  Workers: {}", config.harvester.workers);
    println!("  Max frame depth: {}", config.harvester.max_depth);
    println!("  Verify streams: {}", config.harvester.verify_streams);

    println!("\nFetch Configuration:");
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!(
        "  Backoff: {}ms to {}ms (jitter {:.0}%)",
        config.fetch.backoff_base_ms,
        config.fetch.backoff_max_ms,
        config.fetch.jitter_ratio * 100.0
    );
    println!("  Proxies: {}", config.fetch.proxies.len());

    println!("\nOutput:");
    println!("  Playlist: {}", config.output.playlist_path);
    println!("  Database: {}", config.output.database_path);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        let channels = config.channels.iter().filter(|c| c.site == site.name).count();
        println!("  - {} ({}) - {} channels", site.name, site.base_url, channels);
        if site.uses_blocking_protection {
            println!("    * uses blocking protection");
        }
        if site.needs_scripted_rendering {
            println!("    * needs scripted rendering (static extraction only)");
        }
    }

    let orphans: Vec<&ChannelTarget> = config
        .channels
        .iter()
        .filter(|c| config.site(&c.site).is_none())
        .collect();
    if !orphans.is_empty() {
        println!("\nChannels with unknown sites ({}):", orphans.len());
        for channel in orphans {
            println!("  - {} -> {}", channel.name, channel.site);
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} channels", config.channels.len());
}

/// Handles the --stats mode: shows the latest run from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let Some(run) = storage.get_latest_run()? else {
        println!("No harvest runs recorded yet.");
        return Ok(());
    };

    println!("Run {}:", run.id);
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    if let Some(seconds) = run.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  Status: {}", run.status.to_db_string());
    println!("  Config hash: {}", run.config_hash);
    println!("  Stored entries: {}", storage.count_entries(run.id)?);
    println!();

    print_summary(&run.summary);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: &str,
    discover: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let playlist_path = PathBuf::from(&config.output.playlist_path);
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let harvester = Harvester::new(config)?;

    // Step 1: Assemble targets
    let mut targets = harvester.config().channels.clone();
    if discover {
        let mut known: HashSet<String> = targets.iter().map(|t| t.url.clone()).collect();
        for target in harvester.discover().await {
            if known.insert(target.url.clone()) {
                targets.push(target);
            }
        }
    }
    tracing::info!("Harvesting {} channels", targets.len());

    // Step 2: Cancel on Ctrl-C
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing channels in progress");
            signal_token.cancel();
        }
    });

    // Step 3: Run
    let run_id = storage.create_run(config_hash)?;
    let outcome = match harvester.run(targets, cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            storage.update_run_status(run_id, RunStatus::Failed)?;
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    // Step 4: Persist and write the playlist
    storage.insert_entries(run_id, &outcome.catalog.unique)?;
    storage.complete_run(run_id, &outcome.summary)?;
    write_playlist(&outcome.catalog.unique, &playlist_path)?;

    if !quiet {
        println!();
        print_summary(&outcome.summary);
        println!("\n✓ Playlist written to: {}", playlist_path.display());
    }

    Ok(())
}
