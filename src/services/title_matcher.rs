//! Title similarity scorer
//!
//! Compares a locally stored title against the authoritative title and yields
//! a normalized similarity in [0, 1]. Identical normalized titles short-circuit
//! to exactly 1.0; everything else is token-set Jaccard similarity over words
//! longer than the configured noise cutoff.

use std::collections::HashSet;

use crate::config::AuditConfig;
use crate::models::AuditStatus;

/// Title similarity scorer and classifier
#[derive(Debug, Clone)]
pub struct TitleMatcher {
    /// Similarity at or above this value classifies as `match`
    match_threshold: f64,

    /// Tokens of this length or shorter are excluded from the word sets
    min_token_len: usize,
}

impl TitleMatcher {
    pub fn new(match_threshold: f64, min_token_len: usize) -> Self {
        Self {
            match_threshold,
            min_token_len,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.match_threshold, config.min_token_len)
    }

    /// Normalize a title: lowercase, strip punctuation, collapse whitespace
    /// runs to single spaces, trim.
    pub fn normalize(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        let stripped: String = lowered
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c
                } else {
                    // Punctuation and whitespace both become separators
                    ' '
                }
            })
            .collect();
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Score similarity between a local title and the authoritative title.
    ///
    /// Returns exactly 1.0 for titles identical after normalization, 0.0 when
    /// either title normalizes to an empty word set, and token-set Jaccard
    /// similarity otherwise.
    pub fn score(&self, local: &str, authoritative: &str) -> f64 {
        let a = self.normalize(local);
        let b = self.normalize(authoritative);

        if a == b {
            // Identical garbled/empty titles are meaningless, not a match
            return if a.is_empty() { 0.0 } else { 1.0 };
        }

        let words_a = self.word_set(&a);
        let words_b = self.word_set(&b);
        if words_a.is_empty() || words_b.is_empty() {
            return 0.0;
        }

        let intersection = words_a.intersection(&words_b).count();
        let union = words_a.union(&words_b).count();
        intersection as f64 / union as f64
    }

    /// Map a similarity score to its classification
    pub fn classify(&self, similarity: f64) -> AuditStatus {
        if similarity >= self.match_threshold {
            AuditStatus::Match
        } else {
            AuditStatus::Mismatch
        }
    }

    fn word_set<'a>(&self, normalized: &'a str) -> HashSet<&'a str> {
        normalized
            .split(' ')
            .filter(|word| word.len() > self.min_token_len)
            .collect()
    }
}

impl Default for TitleMatcher {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}
