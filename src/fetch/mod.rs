//! Resilient fetch layer
//!
//! This module performs every HTTP retrieval of the harvester. One logical fetch retries a
//! URL with rotated identities, rotated proxies, per-host pacing and exponential backoff,
//! and classifies each response as usable, blocked, or transiently failed.
//!
//! # Components
//!
//! - `FetchClient`: The retry loop shared by the resolver, discovery and the probe
//! - `BlockClassifier`: Pluggable block-page predicate (`KeywordBlockClassifier` by default)
//! - `HeaderProfile`: Rotating browser identity headers
//! - `ProxyPool`: Round-robin proxies with failure thresholds and a direct member
//! - `Backoff`: Exponential backoff with bounded jitter

mod backoff;
mod classify;
mod client;
mod identity;
mod proxy;

pub use backoff::Backoff;
pub use classify::{
    BlockClassifier, KeywordBlockClassifier, ResponseClassification, BLOCKED_STATUSES,
    DEFAULT_BLOCK_KEYWORDS,
};
pub use client::{build_http_client, FetchClient, FetchedPage, MAX_REDIRECTS};
pub use identity::{natural_referer, Browser, HeaderProfile, Platform};
pub use proxy::{ProxyPool, ProxyRecord};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a logical fetch
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Blocked by {url} (status {status})")]
    Blocked { url: String, status: u16 },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Connection to {url} failed: {message}")]
    ConnectionFailed { url: String, message: String },

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{url} not found (status {status})")]
    NotFound { url: String, status: u16 },

    #[error("Too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    #[error("Gave up on {url} after {} attempts", .attempts.len())]
    Exhausted { url: String, attempts: Vec<FetchAttempt> },

    #[error("Invalid fetch state transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl FetchError {
    /// Returns the number of attempts recorded in an `Exhausted` error (1 for other errors)
    pub fn attempt_count(&self) -> usize {
        match self {
            FetchError::Exhausted { attempts, .. } => attempts.len(),
            _ => 1,
        }
    }

    /// Returns the cause of the final attempt of an `Exhausted` error
    pub fn last_cause(&self) -> Option<&FetchError> {
        match self {
            FetchError::Exhausted { attempts, .. } => attempts.last().map(|a| &a.outcome),
            _ => None,
        }
    }

    /// Returns true for errors caused by the site refusing the request
    pub fn is_blocked(&self) -> bool {
        match self {
            FetchError::Blocked { .. } => true,
            FetchError::Exhausted { .. } => self.last_cause().is_some_and(FetchError::is_blocked),
            _ => false,
        }
    }
}

/// Diagnostic record of one failed attempt
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// 1-based attempt number
    pub index: u32,

    /// Proxy used for the attempt, None for a direct connection
    pub proxy: Option<String>,

    /// Identity presented (see `HeaderProfile::label`)
    pub header_profile: String,

    /// Backoff slept before this attempt, None for the first attempt
    pub backoff_before: Option<Duration>,

    /// Why the attempt failed
    pub outcome: FetchError,
}

impl fmt::Display for FetchAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} via {} as {}: {}",
            self.index,
            self.proxy.as_deref().unwrap_or("direct"),
            self.header_profile,
            self.outcome
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(index: u32, outcome: FetchError) -> FetchAttempt {
        FetchAttempt {
            index,
            proxy: None,
            header_profile: "chrome/windows".to_string(),
            backoff_before: None,
            outcome,
        }
    }

    #[test]
    fn test_exhausted_reports_attempts() {
        let url = "https://tv.example.com/".to_string();
        let error = FetchError::Exhausted {
            url: url.clone(),
            attempts: vec![
                attempt(1, FetchError::Timeout { url: url.clone() }),
                attempt(
                    2,
                    FetchError::Blocked {
                        url: url.clone(),
                        status: 403,
                    },
                ),
            ],
        };

        assert_eq!(error.attempt_count(), 2);
        assert!(matches!(
            error.last_cause(),
            Some(FetchError::Blocked { status: 403, .. })
        ));
        assert!(error.is_blocked());
        assert_eq!(
            error.to_string(),
            "Gave up on https://tv.example.com/ after 2 attempts"
        );
    }

    #[test]
    fn test_attempt_display() {
        let a = attempt(
            3,
            FetchError::UnexpectedStatus {
                url: "https://x.example.com/".to_string(),
                status: 500,
            },
        );
        assert_eq!(
            a.to_string(),
            "#3 via direct as chrome/windows: Unexpected status 500 from https://x.example.com/"
        );
    }
}
