use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide request counters shared by every worker
///
/// Held behind an `Arc` and updated with relaxed atomics; the values are only read for
/// reporting once the run is over.
#[derive(Debug, Default)]
pub struct RunCounters {
    requests: AtomicU64,
    blocked: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one outgoing HTTP attempt
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one response classified as blocked
    pub fn record_block(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero() {
        let counters = RunCounters::new();
        assert_eq!(counters.request_count(), 0);
        assert_eq!(counters.blocked_count(), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let counters = Arc::new(RunCounters::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counters.record_request();
                    }
                    counters.record_block();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.request_count(), 1000);
        assert_eq!(counters.blocked_count(), 4);
    }
}
