//! Error types for citeaudit

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level errors
///
/// Per-record and per-batch failures are not errors: they surface as
/// classification outcomes (`invalid_url`, `not_found`) on the audit report.
/// This type covers failures that prevent an engine from being built at all.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry client error (wraps PubMedError)
    #[error("Registry error: {0}")]
    Registry(#[from] crate::services::PubMedError),
}
