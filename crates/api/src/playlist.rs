//! Playlist rewriting.
//!
//! Segment URIs get the session parameters appended so subsequent chunk
//! requests carry the listener identity back to the origin.

/// Appends `params` to every URI line of an M3U8 playlist. Comment and blank
/// lines pass through unchanged; URIs that already carry a query string get
/// `&` instead of `?`.
pub fn rewrite(playlist: &str, params: &str) -> String {
    let mut out = String::with_capacity(playlist.len() + 64);
    for line in playlist.lines() {
        if line.is_empty() || line.starts_with('#') {
            out.push_str(line);
        } else {
            out.push_str(line);
            out.push(if line.contains('?') { '&' } else { '?' });
            out.push_str(params);
        }
        out.push('\n');
    }
    out
}
