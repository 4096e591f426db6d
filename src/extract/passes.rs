//! Extraction passes
//!
//! Each pass looks at the page from a different angle and appends raw matches in the
//! order it finds them. Passes never fail; anything they cannot read is skipped.

use crate::extract::markers::{has_manifest_marker, is_manifest_mime, MEDIA_SUFFIXES};
use crate::url::unescape_slashes;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Absolute or protocol-relative URLs
static ABSOLUTE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?:)?//[^\s"'<>`\\|^{}]+"#).expect("hardcoded regex pattern is valid")
});

/// Quoted relative references ending in a media or manifest extension
static QUOTED_MEDIA_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']([^"'\s<>]+\.(?:m3u8|mpd|mp4|m4v|mkv|webm|ts)(?:\?[^"'\s<>]*)?)["']"#)
        .expect("hardcoded regex pattern is valid")
});

/// Player configuration assignments such as `file: "..."` or `source = '...'`
static ASSIGNMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:source|src|url|file|hls|stream|playlist)["']?\s*[:=]\s*["']([^"'\s]+)["']"#,
    )
    .expect("hardcoded regex pattern is valid")
});

/// Candidate base64 payloads
static BASE64_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9+/]{32,}={0,2}").expect("hardcoded regex pattern is valid")
});

/// Standard alphabet, accepting payloads with or without padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Attributes players use to carry stream addresses
const DATA_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-stream",
    "data-file",
    "data-url",
    "data-video",
    "data-hls",
];

/// Scripts mentioning any of these are scanned in full
const SCRIPT_HINTS: &[&str] = &["m3u8", "stream", "video", "player", "hls"];

/// Where a raw match came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Free text (markup, script, decoded payloads)
    Text,
    /// A media element source; `declared_manifest` when its `type` names HLS/DASH
    MediaElement { declared_manifest: bool },
    /// A nested frame or embed
    Frame,
}

/// A reference exactly as it was found, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub raw: String,
    pub origin: Origin,
}

impl RawMatch {
    fn text(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            origin: Origin::Text,
        }
    }
}

/// Returns true if free text looks like it references media
fn has_media_marker(text: &str) -> bool {
    if has_manifest_marker(text) {
        return true;
    }

    let lower = text.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or("");
    MEDIA_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Trims punctuation that regularly trails URLs in prose and scripts
fn trim_trailing(raw: &str) -> &str {
    raw.trim_end_matches([',', ';', ')', ']', '.'])
}

/// Collects absolute URLs carrying a media marker from free text
fn scan_absolute(text: &str, out: &mut Vec<RawMatch>) {
    for m in ABSOLUTE_URL_REGEX.find_iter(text) {
        let candidate = trim_trailing(m.as_str());
        if has_media_marker(candidate) {
            out.push(RawMatch::text(candidate));
        }
    }
}

/// Pass 1: literal absolute URLs and quoted relative references with media markers
pub fn literal_pass(content: &str, out: &mut Vec<RawMatch>) {
    scan_absolute(content, out);

    for caps in QUOTED_MEDIA_REGEX.captures_iter(content) {
        if let Some(value) = caps.get(1) {
            out.push(RawMatch::text(value.as_str()));
        }
    }
}

/// Pass 2: player configuration assignments whose value names a manifest
pub fn assignment_pass(content: &str, out: &mut Vec<RawMatch>) {
    for caps in ASSIGNMENT_REGEX.captures_iter(content) {
        if let Some(value) = caps.get(1) {
            if has_manifest_marker(value.as_str()) {
                out.push(RawMatch::text(value.as_str()));
            }
        }
    }
}

/// Pass 3: `data-*` attributes whose value names a manifest
pub fn data_attribute_pass(document: &Html, out: &mut Vec<RawMatch>) {
    let query = DATA_ATTRIBUTES
        .iter()
        .map(|attr| format!("[{}]", attr))
        .collect::<Vec<_>>()
        .join(", ");

    let Ok(selector) = Selector::parse(&query) else {
        return;
    };

    for element in document.select(&selector) {
        for attr in DATA_ATTRIBUTES {
            if let Some(value) = element.value().attr(attr) {
                if has_manifest_marker(value) {
                    out.push(RawMatch::text(value));
                }
            }
        }
    }
}

/// Pass 4: full-text scan of scripts that mention a player or stream
pub fn script_pass(document: &Html, out: &mut Vec<RawMatch>) {
    if let Ok(selector) = Selector::parse("script") {
        for element in document.select(&selector) {
            let text: String = element.text().collect();
            let lower = text.to_ascii_lowercase();
            if SCRIPT_HINTS.iter().any(|hint| lower.contains(hint)) {
                scan_absolute(&text, out);
            }
        }
    }
}

/// Pass 5: base64 tokens whose decoded text contains a media URL
pub fn base64_pass(content: &str, out: &mut Vec<RawMatch>) {
    for token in BASE64_TOKEN_REGEX.find_iter(content) {
        let bytes = match LENIENT_BASE64.decode(token.as_str()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::trace!("Skipping undecodable base64 token: {}", e);
                continue;
            }
        };

        let decoded = match String::from_utf8(bytes) {
            Ok(decoded) => decoded,
            Err(_) => {
                tracing::trace!("Skipping base64 token that is not UTF-8 text");
                continue;
            }
        };

        let decoded = unescape_slashes(&decoded);
        let before = out.len();
        scan_absolute(&decoded, out);
        if out.len() > before {
            tracing::debug!("Decoded {} stream URL(s) from a base64 payload", out.len() - before);
        }
    }
}

/// Pass 6: media element sources
pub fn media_element_pass(document: &Html, out: &mut Vec<RawMatch>) {
    for (query, attr) in [
        ("video[src]", "src"),
        ("video[data-src]", "data-src"),
        ("source[src]", "src"),
        ("audio[src]", "src"),
    ] {
        let Ok(selector) = Selector::parse(query) else {
            continue;
        };

        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                let declared_manifest = element.value().attr("type").is_some_and(is_manifest_mime);
                out.push(RawMatch {
                    raw: value.to_string(),
                    origin: Origin::MediaElement { declared_manifest },
                });
            }
        }
    }
}

/// Pass 7: nested frames and embeds to recurse into
pub fn frame_pass(document: &Html, out: &mut Vec<RawMatch>) {
    for (query, attr) in [
        ("iframe[src]", "src"),
        ("iframe[data-src]", "data-src"),
        ("frame[src]", "src"),
        ("embed[src]", "src"),
    ] {
        let Ok(selector) = Selector::parse(query) else {
            continue;
        };

        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                out.push(RawMatch {
                    raw: value.to_string(),
                    origin: Origin::Frame,
                });
            }
        }
    }
}
