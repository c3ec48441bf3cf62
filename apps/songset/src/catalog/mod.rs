// Music catalog access: the search/lookup backend trait, the Spotify implementation,
// and the caching resolver the recommendation engine talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod handlers;
pub mod resolver;
pub mod spotify;

/// One track as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub external_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Track not found: {0}")]
    NotFound(String),
}

/// A track search + lookup service. Transport retry/backoff is the implementor's concern.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Returns zero or more matches for an artist + track-name query, best first.
    async fn search_track(&self, title: &str, artist: &str)
        -> Result<Vec<CatalogTrack>, CatalogError>;

    /// Looks up one track by catalog id.
    async fn get_track(&self, id: &str) -> Result<CatalogTrack, CatalogError>;
}
