use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// One member of the proxy pool
#[derive(Debug)]
pub struct ProxyRecord {
    /// Proxy URL, or None for a direct connection
    pub address: Option<String>,
    failures: AtomicU32,
}

impl ProxyRecord {
    fn new(address: Option<String>) -> Self {
        Self {
            address,
            failures: AtomicU32::new(0),
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn is_direct(&self) -> bool {
        self.address.is_none()
    }
}

/// Round-robin proxy pool that always contains a direct member
///
/// Proxies whose failure count exceeds the threshold are skipped but never removed. The
/// direct member is never marked as failing, so a usable member always exists.
#[derive(Debug)]
pub struct ProxyPool {
    records: Vec<ProxyRecord>,
    cursor: AtomicUsize,
    failure_threshold: u32,
}

impl ProxyPool {
    /// Creates a pool from proxy URLs; the direct member is appended last
    pub fn new(proxies: &[String], failure_threshold: u32) -> Self {
        let mut records: Vec<ProxyRecord> = proxies
            .iter()
            .map(|p| ProxyRecord::new(Some(p.clone())))
            .collect();
        records.push(ProxyRecord::new(None));

        Self {
            records,
            cursor: AtomicUsize::new(0),
            failure_threshold,
        }
    }

    /// Returns the index of the next usable member
    pub fn next(&self) -> usize {
        let len = self.records.len();

        for _ in 0..len {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
            let record = &self.records[index];
            if record.is_direct() || record.failure_count() <= self.failure_threshold {
                return index;
            }
        }

        self.direct_index()
    }

    /// Records a failure against a member (direct connections are not counted)
    pub fn mark_failure(&self, index: usize) {
        if let Some(record) = self.records.get(index) {
            if !record.is_direct() {
                let failures = record.failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures == self.failure_threshold + 1 {
                    tracing::warn!(
                        "Proxy {} exceeded {} failures and will be skipped",
                        record.address.as_deref().unwrap_or("direct"),
                        self.failure_threshold
                    );
                }
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&ProxyRecord> {
        self.records.get(index)
    }

    /// Returns all members in pool order (the direct member last)
    pub fn records(&self) -> &[ProxyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn direct_index(&self) -> usize {
        self.records.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ProxyPool {
        ProxyPool::new(
            &[
                "http://10.0.0.1:8080".to_string(),
                "http://10.0.0.2:8080".to_string(),
            ],
            3,
        )
    }

    #[test]
    fn test_direct_member_always_present() {
        let pool = ProxyPool::new(&[], 3);
        assert_eq!(pool.len(), 1);
        assert!(pool.get(pool.next()).unwrap().is_direct());
    }

    #[test]
    fn test_round_robin() {
        let pool = pool();
        let picks: Vec<usize> = (0..6).map(|_| pool.next()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_failing_proxy_is_skipped_not_removed() {
        let pool = pool();
        for _ in 0..4 {
            pool.mark_failure(0);
        }

        let picks: Vec<usize> = (0..4).map(|_| pool.next()).collect();
        assert!(!picks.contains(&0));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(0).unwrap().failure_count(), 4);
    }

    #[test]
    fn test_at_threshold_still_used() {
        let pool = pool();
        for _ in 0..3 {
            pool.mark_failure(0);
        }
        assert_eq!(pool.next(), 0);
    }

    #[test]
    fn test_all_proxies_failing_falls_back_to_direct() {
        let pool = pool();
        for _ in 0..10 {
            pool.mark_failure(0);
            pool.mark_failure(1);
        }

        for _ in 0..5 {
            assert_eq!(pool.next(), 2);
        }
    }

    #[test]
    fn test_direct_failures_not_counted() {
        let pool = ProxyPool::new(&[], 0);
        pool.mark_failure(0);
        assert_eq!(pool.get(0).unwrap().failure_count(), 0);
    }
}
