use tracing::info;

use crate::api::Catalog;
use crate::error::RegroupError;
use crate::models::Track;

/// Hard cap the Web API puts on a single add-tracks request.
pub const MAX_TRACKS_PER_ADD: usize = 100;

/// Create a new remote playlist named `"{name} (Albums)"` and fill it with
/// the given tracks, in order, in batches of at most [`MAX_TRACKS_PER_ADD`].
///
/// Returns the new playlist's id. A failed batch leaves the partially
/// populated playlist in place on the remote side; the error is reported,
/// not rolled back.
pub async fn materialize(
    catalog: &dyn Catalog,
    tracks: &[Track],
    name: &str,
    batch_size: usize,
) -> Result<String, RegroupError> {
    let new_name = format!("{} (Albums)", name);
    let playlist_id = catalog
        .create_playlist(&new_name, true)
        .await
        .map_err(RegroupError::Materialize)?;

    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let batch = batch_size.clamp(1, MAX_TRACKS_PER_ADD);
    for chunk in ids.chunks(batch) {
        catalog
            .add_tracks(&playlist_id, chunk)
            .await
            .map_err(RegroupError::Materialize)?;
    }

    info!("created playlist '{}' ({}) with {} tracks", new_name, playlist_id, ids.len());
    Ok(playlist_id)
}
