use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::Catalog;
use crate::error::RegroupError;
use crate::models::{PlaylistEntry, RegroupedPlaylist, Track};

/// Rebuild a playlist so tracks are grouped by their parent album.
///
/// Albums are ordered by the earliest `added_at` among the playlist entries
/// that reference them; each album then contributes its full canonical track
/// list, even when the source playlist held only a subset. The source
/// playlist itself is never modified.
pub async fn regroup_by_album(
    catalog: &dyn Catalog,
    playlist_id: &str,
) -> Result<RegroupedPlaylist, RegroupError> {
    let name = catalog
        .playlist_name(playlist_id)
        .await
        .map_err(RegroupError::Fetch)?;

    // Pull the full membership list. A failure on any page aborts the whole
    // rebuild; a silently truncated listing would reorder albums.
    let mut entries: Vec<PlaylistEntry> = Vec::new();
    let mut page: Option<String> = None;
    loop {
        let batch = catalog
            .playlist_entries_page(playlist_id, page.as_deref())
            .await
            .map_err(RegroupError::Fetch)?;
        entries.extend(batch.entries);
        match batch.next {
            Some(token) => page = Some(token),
            None => break,
        }
    }
    debug!("fetched {} entries from playlist {}", entries.len(), playlist_id);

    let order = album_order(&entries);
    debug!("{} distinct albums referenced", order.len());

    // Expand every album in order, each fetched exactly once and paginated
    // to exhaustion.
    let mut tracks: Vec<Track> = Vec::new();
    for (album_id, _) in &order {
        let mut page: Option<String> = None;
        loop {
            let batch = catalog
                .album_tracks_page(album_id, page.as_deref())
                .await
                .map_err(RegroupError::Fetch)?;
            tracks.extend(batch.tracks);
            match batch.next {
                Some(token) => page = Some(token),
                None => break,
            }
        }
    }

    Ok(RegroupedPlaylist { name, tracks })
}

/// Parse a share link and rebuild the referenced playlist. The one-call
/// surface the CLI uses; a malformed link fails before any catalog traffic.
pub async fn regroup_from_reference(
    catalog: &dyn Catalog,
    reference: &str,
) -> Result<RegroupedPlaylist, RegroupError> {
    let playlist_id = crate::reference::parse_playlist_reference(reference)?;
    regroup_by_album(catalog, &playlist_id).await
}

/// Distinct albums with their earliest `added_at`, sorted ascending.
///
/// The vec is built in first-seen order and only re-sorted at the end with a
/// stable sort, so albums whose minima tie keep the order they were first
/// observed in. The stored minimum is overwritten only by a strictly smaller
/// timestamp.
fn album_order(entries: &[PlaylistEntry]) -> Vec<(String, DateTime<Utc>)> {
    let mut order: Vec<(String, DateTime<Utc>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        match index.get(&entry.album_id) {
            Some(&i) => {
                if entry.added_at < order[i].1 {
                    order[i].1 = entry.added_at;
                }
            }
            None => {
                index.insert(entry.album_id.clone(), order.len());
                order.push((entry.album_id.clone(), entry.added_at));
            }
        }
    }

    order.sort_by_key(|&(_, added_at)| added_at);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(track_id: &str, album_id: &str, added_at: &str) -> PlaylistEntry {
        PlaylistEntry {
            track_id: track_id.into(),
            album_id: album_id.into(),
            added_at: added_at.parse().unwrap(),
        }
    }

    #[test]
    fn album_order_keeps_minimum_timestamp() {
        let entries = vec![
            entry("t1", "a", "2024-01-02T00:00:00Z"),
            entry("t2", "b", "2024-01-01T00:00:00Z"),
            entry("t3", "a", "2024-01-03T00:00:00Z"),
        ];
        let order = album_order(&entries);
        let ids: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn album_order_breaks_ties_by_first_seen() {
        let entries = vec![
            entry("t1", "a", "2024-01-01T00:00:00Z"),
            entry("t2", "b", "2024-01-01T00:00:00Z"),
            entry("t3", "b", "2024-01-05T00:00:00Z"),
        ];
        let order = album_order(&entries);
        let ids: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn album_order_ignores_equal_later_timestamps() {
        // An equal (not strictly smaller) timestamp must not disturb the
        // stored minimum or the first-seen position.
        let entries = vec![
            entry("t1", "a", "2024-01-01T00:00:00Z"),
            entry("t2", "b", "2024-01-01T00:00:00Z"),
            entry("t3", "a", "2024-01-01T00:00:00Z"),
        ];
        let order = album_order(&entries);
        let ids: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
