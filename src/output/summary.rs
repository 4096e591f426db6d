//! Run summary counts and their console rendering

/// Counts describing one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// HTTP requests sent, one per fetch attempt
    pub request_count: u64,

    /// Attempts classified as blocked
    pub blocked_count: u64,

    /// Channel pipelines that ran to completion
    pub channels_attempted: u64,

    /// Channel pipelines that found a stream address
    pub channels_resolved: u64,

    /// Channels carried by more than one distinct stream
    pub duplicate_groups: u64,

    /// The run was cancelled before every target was processed
    pub cancelled: bool,
}

impl RunSummary {
    /// Returns the share of attempted channels that resolved, as a percentage
    pub fn resolution_rate(&self) -> f64 {
        if self.channels_attempted == 0 {
            return 0.0;
        }
        (self.channels_resolved as f64 / self.channels_attempted as f64) * 100.0
    }
}

/// Prints a run summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Requests:");
    println!("  Sent: {}", summary.request_count);
    println!("  Blocked: {}", summary.blocked_count);
    println!();

    println!("Channels:");
    println!("  Attempted: {}", summary.channels_attempted);
    println!("  Resolved: {}", summary.channels_resolved);
    println!("  Duplicate groups: {}", summary.duplicate_groups);
    println!();

    if summary.cancelled {
        println!("Run was cancelled before all channels were processed.");
        println!();
    }

    println!(
        "Resolution Rate: {:.1}% ({} / {} channels)",
        summary.resolution_rate(),
        summary.channels_resolved,
        summary.channels_attempted
    );
}
