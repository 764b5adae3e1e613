use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One track as the catalog describes it: opaque id, display title and
/// primary artist display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
}

/// One row of a playlist's membership list: which track, which album it
/// belongs to, and when it was added to the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub track_id: String,
    pub album_id: String,
    pub added_at: DateTime<Utc>,
}

/// The album-grouped rebuild of a playlist, plus the source playlist's
/// display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegroupedPlaylist {
    pub name: String,
    pub tracks: Vec<Track>,
}

/// One page of playlist membership. `next` is the opaque token for the
/// following page; `None` means the listing is exhausted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntriesPage {
    pub entries: Vec<PlaylistEntry>,
    pub next: Option<String>,
}

/// One page of an album's canonical track list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumTracksPage {
    pub tracks: Vec<Track>,
    pub next: Option<String>,
}
