//! Audit engine configuration
//!
//! All policy constants that shape a run live here: the similarity threshold
//! separating `match` from `mismatch`, the author-list cutoff, batch sizing and
//! pacing. They are tunables with documented defaults, not derived values.

use std::time::Duration;

use crate::error::{Error, Result};

/// Hard ceiling on identifiers per EFetch request, imposed by the registry.
pub const EFETCH_MAX_IDS: usize = 200;

/// Default similarity threshold separating `match` from `mismatch`.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Default number of author surnames kept before the ", et al." suffix.
pub const DEFAULT_MAX_AUTHORS: usize = 3;

/// Default pause between consecutive EFetch batches.
pub const DEFAULT_BATCH_DELAY_MS: u64 = 350;

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_USER_AGENT: &str = "citeaudit/0.1.0 (https://github.com/citeaudit/citeaudit)";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Base URL of the E-utilities endpoint (overridable for tests).
    pub base_url: String,

    /// User agent sent with every registry request.
    pub user_agent: String,

    /// Per-batch request timeout. A timed-out batch is treated as a failed
    /// batch: logged, skipped, run continues.
    pub request_timeout: Duration,

    /// Identifiers per EFetch batch. Must be 1..=[`EFETCH_MAX_IDS`]. Smaller
    /// values trade extra round trips for finer-grained progress reporting.
    pub chunk_size: usize,

    /// Pause between consecutive batches. Not applied before the first batch
    /// or after the last.
    pub batch_delay: Duration,

    /// Similarity at or above this value classifies a title as `match`.
    pub match_threshold: f64,

    /// Title tokens of this length or shorter are ignored when scoring.
    pub min_token_len: usize,

    /// Author surnames kept before truncating with ", et al.".
    pub max_authors: usize,

    /// Event bus channel capacity.
    pub event_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            chunk_size: EFETCH_MAX_IDS,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            min_token_len: 2,
            max_authors: DEFAULT_MAX_AUTHORS,
            event_capacity: 1000,
        }
    }
}

impl AuditConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > EFETCH_MAX_IDS {
            return Err(Error::Config(format!(
                "chunk_size must be 1..={}, got {}",
                EFETCH_MAX_IDS, self.chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(Error::Config(format!(
                "match_threshold must be within [0, 1], got {}",
                self.match_threshold
            )));
        }
        if self.max_authors == 0 {
            return Err(Error::Config(
                "max_authors must be at least 1".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AuditConfig::default().validate().is_ok());
    }

    #[test]
    fn test_chunk_size_over_registry_ceiling_rejected() {
        let config = AuditConfig {
            chunk_size: EFETCH_MAX_IDS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = AuditConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let config = AuditConfig {
            match_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
