use chrono::{DateTime, Utc};
use playlist_album_regroup::api::memory::MemoryCatalog;
use playlist_album_regroup::error::RegroupError;
use playlist_album_regroup::regroup::{regroup_by_album, regroup_from_reference};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// The catalog from the worked example: albumB has the earliest added track,
/// albumA appears twice and owns a track (t9) never added to the playlist.
fn example_catalog(page_size: usize) -> MemoryCatalog {
    MemoryCatalog::new("Road Trip")
        .with_page_size(page_size)
        .with_entry("t1", "albumA", ts("2024-01-02T00:00:00Z"))
        .with_entry("t2", "albumB", ts("2024-01-01T00:00:00Z"))
        .with_entry("t3", "albumA", ts("2024-01-03T00:00:00Z"))
        .with_album(
            "albumA",
            &[
                ("t1", "Opener", "Artist A"),
                ("t3", "Deep Cut", "Artist A"),
                ("t9", "Closer", "Artist A"),
            ],
        )
        .with_album("albumB", &[("t2", "Single", "Artist B")])
}

fn track_ids(playlist: &playlist_album_regroup::models::RegroupedPlaylist) -> Vec<String> {
    playlist.tracks.iter().map(|t| t.id.clone()).collect()
}

#[tokio::test]
async fn groups_albums_by_earliest_added_and_expands_fully() {
    let catalog = example_catalog(50);
    let playlist = regroup_by_album(&catalog, "p1").await.unwrap();
    assert_eq!(playlist.name, "Road Trip");
    // albumB first (earliest added track), then all of albumA in canonical
    // order, including t9 which the source playlist never contained.
    assert_eq!(track_ids(&playlist), ["t2", "t1", "t3", "t9"]);
}

#[tokio::test]
async fn output_length_is_sum_of_canonical_album_sizes() {
    let catalog = example_catalog(50);
    let playlist = regroup_by_album(&catalog, "p1").await.unwrap();
    // 3 source entries, but 1 + 3 canonical tracks across the two albums.
    assert_eq!(playlist.tracks.len(), 4);
}

#[tokio::test]
async fn empty_playlist_yields_empty_result_with_name() {
    let catalog = MemoryCatalog::new("Empty One");
    let playlist = regroup_by_album(&catalog, "p1").await.unwrap();
    assert_eq!(playlist.name, "Empty One");
    assert!(playlist.tracks.is_empty());
}

#[tokio::test]
async fn single_album_playlist_expands_once() {
    let catalog = MemoryCatalog::new("One Album")
        .with_entry("t2", "albumA", ts("2024-03-01T10:00:00Z"))
        .with_entry("t1", "albumA", ts("2024-03-02T10:00:00Z"))
        .with_album(
            "albumA",
            &[("t1", "First", "X"), ("t2", "Second", "X"), ("t3", "Third", "X")],
        );
    let playlist = regroup_by_album(&catalog, "p1").await.unwrap();
    assert_eq!(track_ids(&playlist), ["t1", "t2", "t3"]);
    assert_eq!(catalog.album_fetch_count("albumA"), 1);
}

#[tokio::test]
async fn equal_minimum_timestamps_keep_first_seen_order() {
    let same = ts("2024-05-05T12:00:00Z");
    let catalog = MemoryCatalog::new("Tied")
        .with_entry("a1", "albumA", same)
        .with_entry("b1", "albumB", same)
        .with_entry("b2", "albumB", ts("2024-05-06T12:00:00Z"))
        .with_album("albumA", &[("a1", "A1", "A")])
        .with_album("albumB", &[("b1", "B1", "B"), ("b2", "B2", "B")]);
    let playlist = regroup_by_album(&catalog, "p1").await.unwrap();
    assert_eq!(track_ids(&playlist), ["a1", "b1", "b2"]);
}

#[tokio::test]
async fn entry_order_is_irrelevant_when_minima_are_unchanged() {
    // Swapping the two albumA entries changes neither album's minimum, so
    // the output must be identical.
    let permuted = MemoryCatalog::new("Road Trip")
        .with_entry("t3", "albumA", ts("2024-01-03T00:00:00Z"))
        .with_entry("t2", "albumB", ts("2024-01-01T00:00:00Z"))
        .with_entry("t1", "albumA", ts("2024-01-02T00:00:00Z"))
        .with_album(
            "albumA",
            &[
                ("t1", "Opener", "Artist A"),
                ("t3", "Deep Cut", "Artist A"),
                ("t9", "Closer", "Artist A"),
            ],
        )
        .with_album("albumB", &[("t2", "Single", "Artist B")]);

    let original = regroup_by_album(&example_catalog(50), "p1").await.unwrap();
    let reordered = regroup_by_album(&permuted, "p1").await.unwrap();
    assert_eq!(original, reordered);
}

#[tokio::test]
async fn pagination_is_transparent() {
    // Page size 1 forces 3 membership pages and 3 albumA pages; the result
    // must match the single-page fetch exactly.
    let one_page = regroup_by_album(&example_catalog(50), "p1").await.unwrap();
    let many_pages = regroup_by_album(&example_catalog(1), "p1").await.unwrap();
    assert_eq!(one_page, many_pages);
}

#[tokio::test]
async fn each_distinct_album_is_fetched_exactly_once() {
    let catalog = example_catalog(50);
    regroup_by_album(&catalog, "p1").await.unwrap();
    assert_eq!(catalog.album_fetch_count("albumA"), 1);
    assert_eq!(catalog.album_fetch_count("albumB"), 1);
}

#[tokio::test]
async fn entries_fetch_failure_aborts_reconstruction() {
    let catalog = example_catalog(1).fail_entries_page(1);
    let err = regroup_by_album(&catalog, "p1").await.unwrap_err();
    assert!(matches!(err, RegroupError::Fetch(_)));
}

#[tokio::test]
async fn failure_on_last_album_page_aborts_reconstruction() {
    // albumA has 3 tracks; with page size 2 its listing spans pages 0 and 1.
    // Failing the final page must abort the whole rebuild.
    let catalog = MemoryCatalog::new("Road Trip")
        .with_page_size(2)
        .with_entry("t1", "albumA", ts("2024-01-02T00:00:00Z"))
        .with_entry("t2", "albumB", ts("2024-01-01T00:00:00Z"))
        .with_album(
            "albumA",
            &[("t1", "Opener", "A"), ("t3", "Deep Cut", "A"), ("t9", "Closer", "A")],
        )
        .with_album("albumB", &[("t2", "Single", "B")])
        .fail_album_page("albumA", 1);
    let err = regroup_by_album(&catalog, "p1").await.unwrap_err();
    assert!(matches!(err, RegroupError::Fetch(_)));
}

#[tokio::test]
async fn invalid_reference_is_reported_without_catalog_calls() {
    let catalog = example_catalog(50);
    let err = regroup_from_reference(&catalog, "not-a-url").await.unwrap_err();
    assert!(matches!(err, RegroupError::InvalidReference(_)));
    assert_eq!(catalog.fetch_calls(), 0);
}

#[tokio::test]
async fn regroup_from_reference_accepts_share_links() {
    let catalog = example_catalog(50);
    let playlist =
        regroup_from_reference(&catalog, "https://open.spotify.com/playlist/p1?si=abc123")
            .await
            .unwrap();
    assert_eq!(track_ids(&playlist), ["t2", "t1", "t3", "t9"]);
}
