//! URL handling module for Stream-Harvest
//!
//! This module provides reference resolution for addresses scraped out of page content,
//! host extraction, and the host-fragment matching used by the deny and embed lists.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, origin_of};
pub use matcher::{host_matches_any, matches_host_fragment};
pub use normalize::{parse_http_url, resolve_reference, unescape_slashes};

use url::Url;

/// Checks whether a URL's host matches any fragment of a host list
///
/// URLs without a host never match.
pub fn url_matches_any<S: AsRef<str>>(url: &Url, fragments: &[S]) -> bool {
    match extract_domain(url) {
        Some(host) => host_matches_any(&host, fragments),
        None => false,
    }
}
