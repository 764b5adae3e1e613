use playlist_album_regroup::error::RegroupError;
use playlist_album_regroup::reference::parse_playlist_reference;

#[test]
fn parses_plain_playlist_link() {
    let id = parse_playlist_reference("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M")
        .expect("parse playlist link");
    assert_eq!(id, "37i9dQZF1DXcBWIGoYBM5M");
}

#[test]
fn parses_link_with_share_query() {
    let id = parse_playlist_reference(
        "https://open.spotify.com/playlist/5rAgHTVJhzKzPqdLeIcZq?si=f00ba4",
    )
    .expect("parse playlist link");
    assert_eq!(id, "5rAgHTVJhzKzPqdLeIcZq");
}

#[test]
fn surrounding_whitespace_is_tolerated() {
    let id = parse_playlist_reference("  https://open.spotify.com/playlist/abc123\n")
        .expect("parse playlist link");
    assert_eq!(id, "abc123");
}

#[test]
fn rejects_malformed_references() {
    for reference in [
        "not-a-url",
        "",
        "http://open.spotify.com/playlist/abc123",
        "https://open.spotify.com/album/abc123",
        "https://example.com/playlist/abc123",
    ] {
        let err = parse_playlist_reference(reference).unwrap_err();
        match err {
            RegroupError::InvalidReference(input) => assert_eq!(input, reference),
            other => panic!("expected InvalidReference, got {:?}", other),
        }
    }
}
