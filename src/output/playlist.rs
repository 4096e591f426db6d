use super::OutputResult;
use crate::catalog::ChannelEntry;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the M3U playlist for a set of entries
///
/// # Arguments
///
/// * `entries` - Catalog entries, in the order they should be listed
/// * `output_path` - Path of the playlist file (created or truncated)
///
/// # Returns
///
/// * `Ok(usize)` - Number of channels written
/// * `Err(OutputError)` - Failed to write the file
pub fn write_playlist(entries: &[ChannelEntry], output_path: &Path) -> OutputResult<usize> {
    let playlist = render_playlist(entries);
    let written = entries.iter().filter(|e| e.is_playable()).count();

    let mut file = File::create(output_path)?;
    file.write_all(playlist.as_bytes())?;

    tracing::info!("Wrote {} channels to {}", written, output_path.display());
    Ok(written)
}

/// Renders entries as an extended M3U playlist
///
/// Only entries with a stream address that has not failed verification are listed.
///
/// # Format
///
/// ```text
/// #EXTM3U
/// #EXTINF:-1 tvg-name="<name>" group-title="<site>",<name> [<site>]
/// <stream address>
/// ```
pub fn render_playlist(entries: &[ChannelEntry]) -> String {
    let mut m3u = String::from("#EXTM3U\n");

    for entry in entries.iter().filter(|e| e.is_playable()) {
        let Some(url) = entry.resolved_url.as_deref() else {
            continue;
        };

        let name = attribute_value(&entry.canonical_name);
        let site = attribute_value(&entry.source_site);

        m3u.push_str(&format!(
            "#EXTINF:-1 tvg-name=\"{}\" group-title=\"{}\",{} [{}]\n",
            name, site, entry.canonical_name, entry.source_site
        ));
        m3u.push_str(url);
        m3u.push('\n');
    }

    m3u
}

/// Makes a value safe inside a double-quoted EXTINF attribute
fn attribute_value(value: &str) -> String {
    value.replace('"', "'")
}
