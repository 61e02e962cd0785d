//! Citation reconciliation engine
//!
//! Audits a locally curated corpus of citation records against the PubMed
//! registry. Each audit run recovers a trustworthy accession number per
//! record, fetches authoritative metadata for all distinct identifiers in
//! paced batches, scores local titles against authoritative titles, and
//! produces an ordered, progress-tracked report the host application uses to
//! fix data drift.
//!
//! The engine reads the corpus and writes nothing: no persisted state, no
//! record repair. Remote failures degrade the report instead of aborting it.
//!
//! ```no_run
//! use citeaudit::{AuditConfig, AuditOrchestrator, Corpus, EventBus};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(corpus: Corpus) -> citeaudit::Result<()> {
//! let event_bus = EventBus::new(1000);
//! let orchestrator = AuditOrchestrator::new(AuditConfig::default(), event_bus.clone())?;
//!
//! let run = orchestrator
//!     .run_audit(&corpus, None, CancellationToken::new())
//!     .await;
//!
//! println!("{} of {} citations verified", run.summary.matches, run.summary.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod services;

pub use crate::config::AuditConfig;
pub use crate::error::{Error, Result};
pub use crate::events::{AuditEvent, EventBus};
pub use crate::models::{
    ArticleMetadata, AuditPhase, AuditResult, AuditRun, AuditStatus, AuditSummary, CitationRecord,
    Corpus, ResearchArea,
};
pub use crate::services::AuditOrchestrator;
