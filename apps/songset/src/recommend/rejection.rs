use std::collections::HashSet;

use crate::recommend::models::{Candidate, CandidateKey};

/// Songs the model should not offer again within one request.
pub const DEFAULT_REJECTION_BOUND: usize = 30;

/// Per-request memory of songs already used or proven nonexistent.
///
/// Bounded: once it grows past `bound` it is cleared before being embedded in a
/// prompt. Forgetting is accepted; the engine's accepted-set still blocks duplicates.
#[derive(Debug)]
pub struct RejectionSet {
    bound: usize,
    keys: HashSet<CandidateKey>,
    labels: Vec<String>,
}

impl RejectionSet {
    pub fn new(bound: usize) -> Self {
        Self {
            bound,
            keys: HashSet::new(),
            labels: Vec::new(),
        }
    }

    /// Returns false if the song was already present.
    pub fn insert(&mut self, candidate: &Candidate) -> bool {
        if self.keys.insert(candidate.key()) {
            self.labels.push(candidate.label());
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn contains(&self, key: &CandidateKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Labels to embed in a re-prompt, in insertion order. Clears first if over the bound.
    pub fn labels_for_prompt(&mut self) -> &[String] {
        if self.keys.len() > self.bound {
            tracing::debug!("Rejection set hit {} entries, clearing", self.keys.len());
            self.keys.clear();
            self.labels.clear();
        }
        &self.labels
    }
}

impl Default for RejectionSet {
    fn default() -> Self {
        Self::new(DEFAULT_REJECTION_BOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(n: usize) -> Candidate {
        Candidate::new(&format!("Song {n}"), "Artist")
    }

    #[test]
    fn test_insert_dedups_by_normalized_key() {
        let mut set = RejectionSet::default();
        assert!(set.insert(&Candidate::new("Yellow", "Coldplay")));
        assert!(!set.insert(&Candidate::new(" yellow", "COLDPLAY")));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&CandidateKey::new("YELLOW", "coldplay")));
    }

    #[test]
    fn test_labels_keep_insertion_order() {
        let mut set = RejectionSet::default();
        set.insert(&song(2));
        set.insert(&song(1));
        assert_eq!(set.labels_for_prompt(), ["Song 2 - Artist", "Song 1 - Artist"]);
    }

    #[test]
    fn test_at_bound_is_kept() {
        let mut set = RejectionSet::default();
        for n in 0..DEFAULT_REJECTION_BOUND {
            set.insert(&song(n));
        }
        assert_eq!(set.labels_for_prompt().len(), DEFAULT_REJECTION_BOUND);
    }

    #[test]
    fn test_past_bound_is_cleared_before_embedding() {
        let mut set = RejectionSet::default();
        for n in 0..=DEFAULT_REJECTION_BOUND {
            set.insert(&song(n));
        }
        assert_eq!(set.len(), DEFAULT_REJECTION_BOUND + 1);
        assert!(set.labels_for_prompt().is_empty());
        assert!(set.is_empty());
    }
}
