use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Spaces out requests to the same host across all workers
///
/// Each host remembers the instant of its most recently booked request slot. A caller
/// reserves the next free slot under a short lock and then sleeps outside of it, so
/// workers targeting different hosts never wait on each other.
#[derive(Debug)]
pub struct HostPacer {
    min_interval: Duration,
    slots: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    /// Creates a pacer enforcing `min_interval` between requests to one host
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Books the next request slot for a host
    ///
    /// # Arguments
    ///
    /// * `host` - The host the request goes to
    /// * `now` - The current time instant
    ///
    /// # Returns
    ///
    /// How long the caller must wait before sending. Zero when the host is idle or pacing
    /// is disabled.
    pub fn reserve(&self, host: &str, now: Instant) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }

        let mut slots = self.slots.lock();
        let slot = match slots.get(host) {
            Some(last) => (*last + self.min_interval).max(now),
            None => now,
        };
        slots.insert(host.to_string(), slot);

        slot.saturating_duration_since(now)
    }

    /// Waits until this worker may send a request to `host`
    pub async fn wait_turn(&self, host: &str) {
        let wait = self.reserve(host, Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Pacing {} for {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Returns the number of hosts seen so far
    pub fn host_count(&self) -> usize {
        self.slots.lock().len()
    }
}
