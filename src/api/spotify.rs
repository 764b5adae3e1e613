use super::Catalog;
use crate::db;
use crate::models::{AlbumTracksPage, EntriesPage, PlaylistEntry, Track};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Spotify catalog backed by the Spotify Web API.
/// Token management reads token JSON from the credentials DB and persists
/// refreshed tokens. Endpoints may be overridden by SPOTIFY_AUTH_BASE and
/// SPOTIFY_API_BASE env vars (useful for tests).
///
/// Page tokens for the paginated endpoints are the absolute `next` URLs the
/// Web API returns, so following a page is a plain GET.
pub struct SpotifyCatalog {
    client: Client,
    client_id: String,
    client_secret: String,
    db_path: std::path::PathBuf,
    token: tokio::sync::Mutex<Option<StoredToken>>,
    user_id: tokio::sync::Mutex<Option<String>>,
}

impl SpotifyCatalog {
    pub fn new(client_id: String, client_secret: String, db_path: std::path::PathBuf) -> Self {
        // If either client_id or client_secret is empty, try to load from DB
        let (client_id, client_secret) = if client_id.is_empty() || client_secret.is_empty() {
            if let Ok(conn) = rusqlite::Connection::open(&db_path) {
                if let Ok(Some((_token_json, db_client_id, db_client_secret))) =
                    db::load_credential_with_client(&conn, "spotify")
                {
                    (
                        db_client_id.unwrap_or(client_id),
                        db_client_secret.unwrap_or(client_secret),
                    )
                } else {
                    (client_id, client_secret)
                }
            } else {
                (client_id, client_secret)
            }
        } else {
            (client_id, client_secret)
        };
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            db_path,
            token: tokio::sync::Mutex::new(None),
            user_id: tokio::sync::Mutex::new(None),
        }
    }

    fn is_authenticated(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
    fn name(&self) -> &str {
        "spotify"
    }

    fn auth_base() -> String {
        env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
    }
    fn api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    async fn load_token_from_db(&self) -> Result<Option<StoredToken>> {
        let db_path = self.db_path.clone();
        let json_opt =
            tokio::task::spawn_blocking(move || -> Result<Option<String>, anyhow::Error> {
                let conn = rusqlite::Connection::open(db_path)?;
                Ok(db::load_credential_with_client(&conn, "spotify")?.map(|(json, _, _)| json))
            })
            .await??;

        if let Some(s) = json_opt {
            let st: StoredToken =
                serde_json::from_str(&s).map_err(|e| anyhow!("parse token json: {}", e))?;
            Ok(Some(st))
        } else {
            Ok(None)
        }
    }

    async fn persist_token_to_db(&self, st: &StoredToken) -> Result<()> {
        let db_path = self.db_path.clone();
        let s = serde_json::to_string(&st)?;
        tokio::task::spawn_blocking(move || -> Result<(), anyhow::Error> {
            let conn = rusqlite::Connection::open(db_path)?;
            db::save_credential_raw(&conn, "spotify", &s, None, None)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn ensure_token(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        if lock.is_none() {
            if let Some(st) = self.load_token_from_db().await? {
                *lock = Some(st);
            }
        }
        if let Some(st) = &*lock {
            let now = Utc::now().timestamp();
            if now + 30 >= st.expires_at {
                debug!("Spotify token is near expiry, refreshing");
                let mut cur = st.clone();
                self.refresh_token_internal(&mut cur).await?;
                *lock = Some(cur);
            }
        }
        Ok(())
    }

    /// Refresh regardless of expiry. Used after a 401 from the API, which
    /// means the stored expiry was optimistic.
    async fn force_refresh(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        let st = lock.as_ref().ok_or_else(|| anyhow!("no token loaded"))?;
        let mut cur = st.clone();
        self.refresh_token_internal(&mut cur).await?;
        *lock = Some(cur);
        Ok(())
    }

    async fn refresh_token_internal(&self, cur: &mut StoredToken) -> Result<()> {
        let refresh_token = cur
            .refresh_token
            .clone()
            .ok_or_else(|| anyhow!("no refresh token"))?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ];
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
        );
        let url = format!("{}/api/token", Self::auth_base());
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to refresh token: {} - {}", status, body));
        }
        let j: serde_json::Value = resp.json().await?;
        let access_token = j["access_token"]
            .as_str()
            .ok_or_else(|| anyhow!("no access_token"))?
            .to_string();
        let expires_in = j["expires_in"].as_i64().unwrap_or(3600);
        let scope = j["scope"].as_str().map(|s| s.to_string());
        cur.access_token = access_token;
        cur.token_type = "Bearer".into();
        cur.expires_at = Utc::now().timestamp() + expires_in;
        if let Some(s) = scope {
            cur.scope = Some(s);
        }
        self.persist_token_to_db(cur).await?;
        Ok(())
    }

    async fn get_bearer(&self) -> Result<String> {
        self.ensure_token().await?;
        let lock = self.token.lock().await;
        let st = lock.as_ref().ok_or_else(|| anyhow!("no token loaded"))?;
        Ok(format!("Bearer {}", st.access_token))
    }

    /// GET a JSON document, refreshing the token and retrying once on 401.
    async fn get_value(&self, url: &str) -> Result<serde_json::Value> {
        let bearer = self.get_bearer().await?;
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        let status = resp.status();
        if status.as_u16() == 401 {
            warn!("Got 401 from {}; attempting token refresh", url);
            self.force_refresh().await?;
            let bearer2 = self.get_bearer().await?;
            let resp2 = self
                .client
                .get(url)
                .header(AUTHORIZATION, &bearer2)
                .send()
                .await?;
            let st2 = resp2.status();
            if !st2.is_success() {
                let txt = resp2.text().await.unwrap_or_default();
                return Err(anyhow!("GET {} failed after refresh: {} => {}", url, st2, txt));
            }
            return Ok(resp2.json().await?);
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("GET {} failed: {} => {}", url, status, txt));
        }
        Ok(resp.json().await?)
    }

    /// POST a JSON body, refreshing the token and retrying once on 401.
    /// A 429 is surfaced as an error with the retry-after hint; backoff is
    /// the caller's concern.
    async fn post_value(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let bearer = self.get_bearer().await?;
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, &bearer)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if status.as_u16() == 401 {
            self.force_refresh().await?;
            let bearer2 = self.get_bearer().await?;
            let resp2 = self
                .client
                .post(url)
                .header(AUTHORIZATION, &bearer2)
                .header(CONTENT_TYPE, "application/json")
                .json(body)
                .send()
                .await?;
            let st2 = resp2.status();
            if !st2.is_success() {
                let txt = resp2.text().await.unwrap_or_default();
                return Err(anyhow!("POST {} failed after refresh: {} => {}", url, st2, txt));
            }
            return Ok(resp2.json().await.unwrap_or(serde_json::Value::Null));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(anyhow!("rate_limited: retry_after={:?}", retry_after));
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("POST {} failed: {} => {}", url, status, txt));
        }
        Ok(resp.json().await.unwrap_or(serde_json::Value::Null))
    }

    async fn get_user_id(&self) -> Result<String> {
        {
            let g = self.user_id.lock().await;
            if let Some(u) = g.as_ref() {
                return Ok(u.clone());
            }
        }
        let url = format!("{}/me", Self::api_base());
        let j = self.get_value(&url).await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id in /me response"))?
            .to_string();
        let mut g = self.user_id.lock().await;
        *g = Some(id.clone());
        Ok(id)
    }

    fn parse_entries_page(j: &serde_json::Value) -> Result<EntriesPage> {
        let mut entries = Vec::new();
        if let Some(items) = j["items"].as_array() {
            for it in items {
                let track = &it["track"];
                if track.is_null() {
                    // removed or local track; membership row carries no catalog track
                    continue;
                }
                let track_id = match track["id"].as_str() {
                    Some(s) => s.to_string(),
                    None => continue,
                };
                let album_id = track["album"]["id"]
                    .as_str()
                    .ok_or_else(|| anyhow!("playlist entry for track {} missing album id", track_id))?
                    .to_string();
                let added_raw = it["added_at"]
                    .as_str()
                    .ok_or_else(|| anyhow!("playlist entry for track {} missing added_at", track_id))?;
                let added_at = added_raw
                    .parse::<DateTime<Utc>>()
                    .map_err(|e| anyhow!("bad added_at {:?}: {}", added_raw, e))?;
                entries.push(PlaylistEntry {
                    track_id,
                    album_id,
                    added_at,
                });
            }
        }
        Ok(EntriesPage {
            entries,
            next: j["next"].as_str().map(|s| s.to_string()),
        })
    }

    fn parse_album_tracks_page(j: &serde_json::Value) -> AlbumTracksPage {
        let mut tracks = Vec::new();
        if let Some(items) = j["items"].as_array() {
            for it in items {
                let id = match it["id"].as_str() {
                    Some(s) => s.to_string(),
                    None => continue,
                };
                let title = it["name"].as_str().unwrap_or("").to_string();
                let artist = it["artists"]
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(|a| a["name"].as_str())
                    .unwrap_or("")
                    .to_string();
                tracks.push(Track { id, title, artist });
            }
        }
        AlbumTracksPage {
            tracks,
            next: j["next"].as_str().map(|s| s.to_string()),
        }
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    fn name(&self) -> &str {
        SpotifyCatalog::name(self)
    }
    fn is_authenticated(&self) -> bool {
        SpotifyCatalog::is_authenticated(self)
    }

    async fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        let url = format!("{}/playlists/{}?fields=name", Self::api_base(), playlist_id);
        let j = self.get_value(&url).await?;
        j["name"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("playlist {} has no name field", playlist_id))
    }

    async fn playlist_entries_page(
        &self,
        playlist_id: &str,
        page: Option<&str>,
    ) -> Result<EntriesPage> {
        let url = match page {
            Some(next) => next.to_string(),
            None => format!(
                "{}/playlists/{}/tracks?fields=items(added_at,track(id,album(id))),next&limit=100",
                Self::api_base(),
                playlist_id
            ),
        };
        let j = self.get_value(&url).await?;
        Self::parse_entries_page(&j)
    }

    async fn album_tracks_page(
        &self,
        album_id: &str,
        page: Option<&str>,
    ) -> Result<AlbumTracksPage> {
        let url = match page {
            Some(next) => next.to_string(),
            None => format!("{}/albums/{}/tracks?limit=50", Self::api_base(), album_id),
        };
        let j = self.get_value(&url).await?;
        Ok(Self::parse_album_tracks_page(&j))
    }

    async fn create_playlist(&self, name: &str, public: bool) -> Result<String> {
        let user_id = self.get_user_id().await?;
        let url = format!(
            "{}/users/{}/playlists",
            Self::api_base(),
            url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect::<String>()
        );
        let body = json!({
            "name": name,
            "public": public
        });
        let j = self.post_value(&url, &body).await?;
        j["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("create playlist response has no id"))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let url = format!("{}/playlists/{}/tracks", Self::api_base(), playlist_id);
        let uris: Vec<String> = track_ids
            .iter()
            .map(|id| format!("spotify:track:{}", id))
            .collect();
        let body = json!({ "uris": uris });
        self.post_value(&url, &body).await?;
        Ok(())
    }
}
