use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogTrack;

/// Normalized (title, artist) identity: lowercased, trimmed, inner whitespace collapsed.
/// Two candidates are "the same song" exactly when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateKey {
    title: String,
    artist: String,
}

impl CandidateKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: normalize(title),
            artist: normalize(artist),
        }
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// An unverified song suggestion pulled out of model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub artist: String,
}

impl Candidate {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            artist: artist.trim().to_string(),
        }
    }

    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(&self.title, &self.artist)
    }

    /// Human-readable form used in re-prompts, e.g. `Hey Jude - The Beatles`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Candidate {}

/// A candidate confirmed to exist in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub external_url: Option<String>,
}

impl ResolvedTrack {
    /// Key of the catalog's own title/artist, which may differ from the candidate's.
    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(&self.title, &self.artist)
    }
}

impl From<CatalogTrack> for ResolvedTrack {
    fn from(track: CatalogTrack) -> Self {
        ResolvedTrack {
            id: track.id,
            title: track.title,
            artist: track.artist,
            album: track.album,
            external_url: track.external_url,
        }
    }
}

/// One user query: a fully composed prompt and how many distinct tracks it must yield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub base_prompt: String,
    pub quota: usize,
}

impl RecommendationRequest {
    pub fn new(base_prompt: impl Into<String>, quota: usize) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            quota,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_case_and_whitespace() {
        assert_eq!(
            CandidateKey::new("  Hey   Jude ", "THE beatles"),
            CandidateKey::new("hey jude", "The Beatles")
        );
    }

    #[test]
    fn test_key_distinguishes_artist() {
        assert_ne!(
            CandidateKey::new("Hurt", "Nine Inch Nails"),
            CandidateKey::new("Hurt", "Johnny Cash")
        );
    }

    #[test]
    fn test_candidate_trims_fields() {
        let candidate = Candidate::new("  Yellow \n", " Coldplay ");
        assert_eq!(candidate.title, "Yellow");
        assert_eq!(candidate.artist, "Coldplay");
        assert_eq!(candidate.label(), "Yellow - Coldplay");
    }

    #[test]
    fn test_candidate_equality_is_normalized() {
        assert_eq!(
            Candidate::new("Yellow", "Coldplay"),
            Candidate::new("YELLOW", "coldplay ")
        );
    }

    #[test]
    fn test_resolved_track_from_catalog() {
        let track: ResolvedTrack = CatalogTrack {
            id: "abc".to_string(),
            title: "Yellow".to_string(),
            artist: "Coldplay".to_string(),
            album: "Parachutes".to_string(),
            external_url: None,
        }
        .into();
        assert_eq!(track.id, "abc");
        assert_eq!(track.key(), CandidateKey::new("yellow", "coldplay"));
    }
}
