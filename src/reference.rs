use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RegroupError;

static PLAYLIST_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https://open\.spotify\.com/playlist/(\w+)").expect("playlist url regex"));

/// Extract the playlist id from a share link like
/// `https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=...`.
/// Anything after the id segment (query string, trailing slash) is ignored.
pub fn parse_playlist_reference(reference: &str) -> Result<String, RegroupError> {
    PLAYLIST_URL
        .captures(reference.trim())
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| RegroupError::InvalidReference(reference.to_string()))
}
