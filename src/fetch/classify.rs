/// Classification of one HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClassification {
    /// A usable page
    Success,
    /// The site refused the request or served a challenge page
    Blocked,
    /// A failure that may clear up on retry
    TransientError,
    /// The retry budget is used up
    Exhausted,
}

/// Statuses that mean the request was refused or throttled
pub const BLOCKED_STATUSES: &[u16] = &[403, 429, 502, 503];

/// Phrases found on challenge, captcha, and rate-limit pages
pub const DEFAULT_BLOCK_KEYWORDS: &[&str] = &[
    "captcha",
    "access denied",
    "bot detected",
    "security check",
    "too many requests",
    "rate limit exceeded",
    "checking your browser",
    "cf-challenge",
    "are you a robot",
    "verificación",
];

/// Decides whether a response is a block page
///
/// Implementations must be cheap and side-effect free; the fetch client calls them once per
/// attempt from every worker.
pub trait BlockClassifier: Send + Sync {
    fn classify(&self, status: u16, body: &str) -> ResponseClassification;
}

/// Block classifier driven by status codes, body keywords, and body size
#[derive(Debug, Clone)]
pub struct KeywordBlockClassifier {
    keywords: Vec<String>,
    min_body_bytes: usize,
}

impl KeywordBlockClassifier {
    /// Creates a classifier with custom keywords (matched case-insensitively)
    pub fn new<S: AsRef<str>>(keywords: &[S], min_body_bytes: usize) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            min_body_bytes,
        }
    }

    /// Creates a classifier with the built-in keyword list
    pub fn with_defaults(min_body_bytes: usize) -> Self {
        Self::new(DEFAULT_BLOCK_KEYWORDS, min_body_bytes)
    }

    fn contains_keyword(&self, body: &str) -> Option<&str> {
        let lower = body.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| lower.contains(keyword.as_str()))
            .map(|keyword| keyword.as_str())
    }
}

impl BlockClassifier for KeywordBlockClassifier {
    fn classify(&self, status: u16, body: &str) -> ResponseClassification {
        if BLOCKED_STATUSES.contains(&status) {
            return ResponseClassification::Blocked;
        }

        if let Some(keyword) = self.contains_keyword(body) {
            tracing::debug!("Block keyword '{}' found in {} response", keyword, status);
            return ResponseClassification::Blocked;
        }

        if status == 200 {
            if body.len() < self.min_body_bytes {
                tracing::debug!(
                    "Body of {} bytes is below the {} byte minimum",
                    body.len(),
                    self.min_body_bytes
                );
                return ResponseClassification::Blocked;
            }
            return ResponseClassification::Success;
        }

        ResponseClassification::TransientError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_body(text: &str) -> String {
        format!("<html><body>{}{}</body></html>", text, " ".repeat(1200))
    }

    #[test]
    fn test_blocked_statuses() {
        let classifier = KeywordBlockClassifier::with_defaults(1000);
        for status in [403, 429, 502, 503] {
            assert_eq!(
                classifier.classify(status, &long_body("ok")),
                ResponseClassification::Blocked
            );
        }
    }

    #[test]
    fn test_captcha_body_is_blocked() {
        let classifier = KeywordBlockClassifier::with_defaults(1000);
        assert_eq!(
            classifier.classify(200, &long_body("Please solve the CAPTCHA to continue")),
            ResponseClassification::Blocked
        );
    }

    #[test]
    fn test_short_body_is_blocked() {
        let classifier = KeywordBlockClassifier::with_defaults(1000);
        assert_eq!(
            classifier.classify(200, "<html></html>"),
            ResponseClassification::Blocked
        );
    }

    #[test]
    fn test_normal_page_is_success() {
        let classifier = KeywordBlockClassifier::with_defaults(1000);
        assert_eq!(
            classifier.classify(200, &long_body("<video src=\"/live.m3u8\"></video>")),
            ResponseClassification::Success
        );
    }

    #[test]
    fn test_other_statuses_are_transient() {
        let classifier = KeywordBlockClassifier::with_defaults(1000);
        assert_eq!(
            classifier.classify(500, &long_body("oops")),
            ResponseClassification::TransientError
        );
        assert_eq!(
            classifier.classify(301, ""),
            ResponseClassification::TransientError
        );
    }

    #[test]
    fn test_custom_keywords_replace_defaults() {
        let classifier = KeywordBlockClassifier::new(&["Wartungsarbeiten"], 0);
        assert_eq!(
            classifier.classify(200, "wartungsarbeiten laufen"),
            ResponseClassification::Blocked
        );
        assert_eq!(
            classifier.classify(200, "captcha"),
            ResponseClassification::Success
        );
    }

    #[test]
    fn test_zero_minimum_accepts_short_bodies() {
        let classifier = KeywordBlockClassifier::with_defaults(0);
        assert_eq!(
            classifier.classify(200, "<p>hi</p>"),
            ResponseClassification::Success
        );
    }
}
