use crate::models::Track;

pub const TRACK_LINK_BASE: &str = "https://open.spotify.com/track";

/// Shareable web link for every track, preserving order. One URL per line is
/// what the caller prints or hands to a clipboard tool.
pub fn track_links(tracks: &[Track]) -> Vec<String> {
    tracks
        .iter()
        .map(|t| format!("{}/{}", TRACK_LINK_BASE, t.id))
        .collect()
}
