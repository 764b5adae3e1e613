use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Catalog;
use crate::materialize::MAX_TRACKS_PER_ADD;
use crate::models::{AlbumTracksPage, EntriesPage, PlaylistEntry, Track};

/// In-memory catalog used in tests and when experimenting without
/// credentials. Data is seeded up front; pagination is served in fixed-size
/// pages so multi-page paths get exercised, and failures can be injected per
/// endpoint and page index. Page tokens are stringified offsets.
pub struct MemoryCatalog {
    playlist_name: String,
    entries: Vec<PlaylistEntry>,
    albums: HashMap<String, Vec<Track>>,
    page_size: usize,
    fail_entries_on_page: Option<usize>,
    fail_album_on_page: Option<(String, usize)>,
    fail_create: bool,
    fail_add_on_batch: Option<usize>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    metadata_calls: usize,
    entry_page_calls: usize,
    album_fetches: HashMap<String, usize>,
    created: Vec<String>,
    added: Vec<Vec<String>>,
    playlist_seq: u32,
}

impl MemoryCatalog {
    pub fn new(playlist_name: &str) -> Self {
        Self {
            playlist_name: playlist_name.to_string(),
            entries: Vec::new(),
            albums: HashMap::new(),
            page_size: 50,
            fail_entries_on_page: None,
            fail_album_on_page: None,
            fail_create: false,
            fail_add_on_batch: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Append one membership row to the seeded playlist.
    pub fn with_entry(mut self, track_id: &str, album_id: &str, added_at: DateTime<Utc>) -> Self {
        self.entries.push(PlaylistEntry {
            track_id: track_id.to_string(),
            album_id: album_id.to_string(),
            added_at,
        });
        self
    }

    /// Seed an album's canonical track list as (id, title, artist) tuples.
    pub fn with_album(mut self, album_id: &str, tracks: &[(&str, &str, &str)]) -> Self {
        let tracks = tracks
            .iter()
            .map(|(id, title, artist)| Track {
                id: id.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
            })
            .collect();
        self.albums.insert(album_id.to_string(), tracks);
        self
    }

    /// Fail the membership fetch when the given zero-based page is requested.
    pub fn fail_entries_page(mut self, page: usize) -> Self {
        self.fail_entries_on_page = Some(page);
        self
    }

    /// Fail the given album's track fetch on the given zero-based page.
    pub fn fail_album_page(mut self, album_id: &str, page: usize) -> Self {
        self.fail_album_on_page = Some((album_id.to_string(), page));
        self
    }

    pub fn fail_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Fail the given zero-based add-tracks batch.
    pub fn fail_add_batch(mut self, batch: usize) -> Self {
        self.fail_add_on_batch = Some(batch);
        self
    }

    /// Total fetch-side calls served so far (metadata + entry pages + album
    /// pages). Lets tests assert that nothing touched the catalog.
    pub fn fetch_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.metadata_calls + state.entry_page_calls + state.album_fetches.values().sum::<usize>()
    }

    /// How many times an album's listing was started (first-page requests).
    pub fn album_fetch_count(&self, album_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .album_fetches
            .get(album_id)
            .copied()
            .unwrap_or(0)
    }

    /// Names of playlists created through this catalog, in creation order.
    pub fn created_playlists(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    /// Every add-tracks batch as it arrived, in order.
    pub fn added_batches(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().added.clone()
    }

    fn parse_offset(page: Option<&str>) -> Result<usize> {
        match page {
            None => Ok(0),
            Some(token) => token
                .parse()
                .map_err(|_| anyhow!("bad page token: {:?}", token)),
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn playlist_name(&self, _playlist_id: &str) -> Result<String> {
        self.state.lock().unwrap().metadata_calls += 1;
        Ok(self.playlist_name.clone())
    }

    async fn playlist_entries_page(
        &self,
        _playlist_id: &str,
        page: Option<&str>,
    ) -> Result<EntriesPage> {
        self.state.lock().unwrap().entry_page_calls += 1;
        let offset = Self::parse_offset(page)?;
        let page_idx = offset / self.page_size;
        if self.fail_entries_on_page == Some(page_idx) {
            return Err(anyhow!("injected entries failure on page {}", page_idx));
        }
        let end = (offset + self.page_size).min(self.entries.len());
        let entries = self.entries[offset.min(end)..end].to_vec();
        let next = (end < self.entries.len()).then(|| end.to_string());
        Ok(EntriesPage { entries, next })
    }

    async fn album_tracks_page(
        &self,
        album_id: &str,
        page: Option<&str>,
    ) -> Result<AlbumTracksPage> {
        if page.is_none() {
            *self
                .state
                .lock()
                .unwrap()
                .album_fetches
                .entry(album_id.to_string())
                .or_insert(0) += 1;
        }
        let offset = Self::parse_offset(page)?;
        let page_idx = offset / self.page_size;
        if let Some((fail_album, fail_page)) = &self.fail_album_on_page {
            if fail_album == album_id && *fail_page == page_idx {
                return Err(anyhow!(
                    "injected album failure for {} on page {}",
                    album_id,
                    page_idx
                ));
            }
        }
        let all = self
            .albums
            .get(album_id)
            .ok_or_else(|| anyhow!("unknown album: {}", album_id))?;
        let end = (offset + self.page_size).min(all.len());
        let tracks = all[offset.min(end)..end].to_vec();
        let next = (end < all.len()).then(|| end.to_string());
        Ok(AlbumTracksPage { tracks, next })
    }

    async fn create_playlist(&self, name: &str, _public: bool) -> Result<String> {
        if self.fail_create {
            return Err(anyhow!("injected create failure"));
        }
        let mut state = self.state.lock().unwrap();
        state.playlist_seq += 1;
        state.created.push(name.to_string());
        Ok(format!("memory-playlist-{}", state.playlist_seq))
    }

    async fn add_tracks(&self, _playlist_id: &str, track_ids: &[String]) -> Result<()> {
        if track_ids.len() > MAX_TRACKS_PER_ADD {
            return Err(anyhow!(
                "too many tracks in one request: {}",
                track_ids.len()
            ));
        }
        let mut state = self.state.lock().unwrap();
        let batch_idx = state.added.len();
        if self.fail_add_on_batch == Some(batch_idx) {
            return Err(anyhow!("injected add failure on batch {}", batch_idx));
        }
        state.added.push(track_ids.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}
