//! Service modules for the citation audit workflow

pub mod accession_resolver;
pub mod audit_orchestrator;
pub mod pubmed_client;
pub mod title_matcher;

pub use accession_resolver::{is_valid_pmid, AccessionResolver};
pub use audit_orchestrator::AuditOrchestrator;
pub use pubmed_client::{FetchReport, PubMedClient, PubMedError};
pub use title_matcher::TitleMatcher;
