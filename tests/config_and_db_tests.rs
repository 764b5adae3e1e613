use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use playlist_album_regroup::config::Config;
use playlist_album_regroup::db;

#[test]
fn config_from_path_parses_toml() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    let toml = r#"
db_path = "/tmp/test.db"
log_dir = "/tmp"
max_batch_size = 50
"#;
    f.write_all(toml.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.db_path.to_str().unwrap(), "/tmp/test.db");
    assert_eq!(cfg.log_dir.to_str().unwrap(), "/tmp");
    assert_eq!(cfg.max_batch_size, 50);
}

#[test]
fn config_fields_default_when_missing() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    f.write_all(b"db_path = \"/tmp/test.db\"\n").unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.max_batch_size, 100);
    assert!(cfg.log_dir.ends_with("logs"));
}

#[test]
fn run_migrations_creates_credentials_table() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    db::run_migrations(&conn).expect("run migrations");
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='credentials'")
        .unwrap();
    let mut rows = stmt.query([]).unwrap();
    let found = rows.next().unwrap().is_some();
    assert!(found, "credentials table should exist after migrations");
}

#[test]
fn credential_round_trip_keeps_client_on_token_refresh() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("creds.db");
    let conn = db::open_or_create(&db_path).unwrap();

    db::save_credential_raw(&conn, "spotify", "{\"v\":1}", Some("cid"), Some("secret")).unwrap();
    // A token refresh rewrites the JSON without knowing the client pair;
    // the stored pair must survive.
    db::save_credential_raw(&conn, "spotify", "{\"v\":2}", None, None).unwrap();

    let (json, client_id, client_secret) = db::load_credential_with_client(&conn, "spotify")
        .unwrap()
        .expect("credential row");
    assert_eq!(json, "{\"v\":2}");
    assert_eq!(client_id.as_deref(), Some("cid"));
    assert_eq!(client_secret.as_deref(), Some("secret"));
}

#[test]
fn load_credential_missing_provider_is_none() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("creds.db");
    let conn = db::open_or_create(&db_path).unwrap();
    assert!(db::load_credential_with_client(&conn, "spotify").unwrap().is_none());
}
