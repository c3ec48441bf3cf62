//! Spotify Web API catalog backend.
//!
//! Authentication is not handled here: the caller supplies a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{CatalogBackend, CatalogError, CatalogTrack};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: &str = "5";

// ---------------------------------------------------------------------------
// API response types (private; Spotify nests everything)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: SpotifyAlbum,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<SpotifyTrack> for CatalogTrack {
    fn from(track: SpotifyTrack) -> Self {
        CatalogTrack {
            id: track.id,
            title: track.name,
            artist: track
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default(),
            album: track.album.name,
            external_url: track.external_urls.spotify,
        }
    }
}

#[derive(Clone)]
pub struct SpotifyCatalog {
    http: Client,
    access_token: String,
}

impl SpotifyCatalog {
    pub fn new(access_token: String) -> Result<Self, CatalogError> {
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(30)).build()?,
            access_token,
        })
    }
}

/// Field-filtered search query, e.g. `artist:Queen track:Bohemian Rhapsody`.
fn search_query(title: &str, artist: &str) -> String {
    format!("artist:{artist} track:{title}")
}

/// Spotify track ids are base62; anything else never reaches the URL.
fn is_track_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

async fn api_error(response: reqwest::Response) -> CatalogError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    CatalogError::Api { status, message }
}

#[async_trait]
impl CatalogBackend for SpotifyCatalog {
    async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let query = search_query(title, artist);
        debug!("Spotify search: {query}");

        let response = self
            .http
            .get(format!("{SPOTIFY_API_BASE}/search"))
            .bearer_auth(&self.access_token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", SEARCH_LIMIT)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let result: SearchResponse = response.json().await?;
        Ok(result.tracks.items.into_iter().map(CatalogTrack::from).collect())
    }

    async fn get_track(&self, id: &str) -> Result<CatalogTrack, CatalogError> {
        if !is_track_id(id) {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        let response = self
            .http
            .get(format!("{SPOTIFY_API_BASE}/tracks/{id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let track: SpotifyTrack = response.json().await?;
                Ok(track.into())
            }
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                Err(CatalogError::NotFound(id.to_string()))
            }
            _ => Err(api_error(response).await),
        }
    }
}
