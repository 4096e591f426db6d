use crate::extract::CandidateKind;
use url::Url;

/// Substrings identifying adaptive-streaming manifests
pub const MANIFEST_MARKERS: &[&str] = &[".m3u8", ".mpd"];

/// Path suffixes identifying direct media files
pub const MEDIA_SUFFIXES: &[&str] = &[".mp4", ".ts", ".mkv", ".webm", ".m4v"];

/// MIME types that declare a manifest without a file marker
pub const MANIFEST_MIME_TYPES: &[&str] = &[
    "application/x-mpegurl",
    "application/vnd.apple.mpegurl",
    "audio/mpegurl",
    "application/dash+xml",
];

/// Returns true if the text mentions a manifest file
pub fn has_manifest_marker(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    MANIFEST_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Returns true if the URL path ends in a direct media extension
pub fn has_media_suffix(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    MEDIA_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Returns true if a `type` attribute names an HLS or DASH MIME type
pub fn is_manifest_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    MANIFEST_MIME_TYPES.iter().any(|m| mime.starts_with(m))
}

/// Returns true if the last path segment's stem names a master playlist
pub fn is_master_stem(url: &Url) -> bool {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let stem = segment.split('.').next().unwrap_or("");
    stem.to_ascii_lowercase().contains("master")
}

/// Classifies a URL by its media markers
///
/// # Returns
///
/// * `Some(ManifestMaster)` - A manifest whose file stem names a master playlist
/// * `Some(ManifestGeneric)` - Any other manifest
/// * `Some(DirectMedia)` - A direct media file
/// * `None` - No media marker (a page, a frame, or an unrelated resource)
pub fn media_kind(url: &Url) -> Option<CandidateKind> {
    if has_manifest_marker(url.as_str()) {
        if is_master_stem(url) {
            return Some(CandidateKind::ManifestMaster);
        }
        return Some(CandidateKind::ManifestGeneric);
    }

    if has_media_suffix(url) {
        return Some(CandidateKind::DirectMedia);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_master_manifest() {
        assert_eq!(
            media_kind(&url("https://cdn.example.com/live/master.m3u8")),
            Some(CandidateKind::ManifestMaster)
        );
        assert_eq!(
            media_kind(&url("https://cdn.example.com/live/MASTER.m3u8?token=abc")),
            Some(CandidateKind::ManifestMaster)
        );
    }

    #[test]
    fn test_generic_manifests() {
        assert_eq!(
            media_kind(&url("https://cdn.example.com/stream/index.m3u8")),
            Some(CandidateKind::ManifestGeneric)
        );
        assert_eq!(
            media_kind(&url("https://cdn.example.com/dash/manifest.mpd")),
            Some(CandidateKind::ManifestGeneric)
        );
        assert_eq!(
            media_kind(&url("https://cdn.example.com/play?src=chunk.m3u8")),
            Some(CandidateKind::ManifestGeneric)
        );
    }

    #[test]
    fn test_direct_media() {
        assert_eq!(
            media_kind(&url("https://cdn.example.com/vod/movie.mp4")),
            Some(CandidateKind::DirectMedia)
        );
        assert_eq!(
            media_kind(&url("https://cdn.example.com/seg/000123.ts")),
            Some(CandidateKind::DirectMedia)
        );
    }

    #[test]
    fn test_non_media() {
        assert_eq!(media_kind(&url("https://player.example.net/embed/42")), None);
        assert_eq!(media_kind(&url("https://example.com/scripts.tsx")), None);
    }

    #[test]
    fn test_manifest_mime() {
        assert!(is_manifest_mime("application/x-mpegURL"));
        assert!(is_manifest_mime("application/vnd.apple.mpegurl; codecs=avc1"));
        assert!(is_manifest_mime("application/dash+xml"));
        assert!(!is_manifest_mime("video/mp4"));
    }
}
