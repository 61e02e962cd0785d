//! Data model types for the citation audit engine

pub mod audit;
pub mod corpus;

pub use audit::{
    ArticleMetadata, AuditPhase, AuditProgress, AuditResult, AuditRun, AuditStatus, AuditSummary,
};
pub use corpus::{CitationRecord, Corpus, ResearchArea};
