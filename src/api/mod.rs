pub mod memory;
pub mod spotify;
pub mod spotify_auth;

use anyhow::Result;

use crate::models::{AlbumTracksPage, EntriesPage};

/// Catalog trait: the remote-service operations the regrouper and
/// materializer need.
/// Implementations: spotify::SpotifyCatalog and memory::MemoryCatalog.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Display name of a playlist (single metadata fetch).
    async fn playlist_name(&self, playlist_id: &str) -> Result<String>;

    /// One page of playlist membership. `page` is the opaque token carried in
    /// the previous page's `next`; `None` asks for the first page.
    async fn playlist_entries_page(
        &self,
        playlist_id: &str,
        page: Option<&str>,
    ) -> Result<EntriesPage>;

    /// One page of an album's canonical track list.
    async fn album_tracks_page(&self, album_id: &str, page: Option<&str>)
        -> Result<AlbumTracksPage>;

    /// Create a playlist owned by the authenticated user; returns its id.
    async fn create_playlist(&self, name: &str, public: bool) -> Result<String>;

    /// Add tracks to a playlist. Callers keep each call within the remote
    /// per-request limit (100 ids).
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Return the catalog's name (for logging, UI, etc)
    fn name(&self) -> &str;

    /// Return true if the catalog handle is ready for authenticated calls
    fn is_authenticated(&self) -> bool;
}
