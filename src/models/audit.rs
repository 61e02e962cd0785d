//! Audit run state and report types
//!
//! An audit run progresses through phases:
//! RESOLVING → FETCHING → CLASSIFYING → COMPLETED (or CANCELLED)
//!
//! The run exclusively owns its result list, summary and progress counter for
//! its lifetime; concurrent runs each own an independent `AuditRun`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CitationRecord;

/// Audit workflow phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditPhase {
    /// Recovering accession numbers from explicit fields and reference URLs
    Resolving,
    /// Batched metadata retrieval from the registry
    Fetching,
    /// Per-record similarity scoring and status assignment
    Classifying,
    /// Audit finished; results and summary are final
    Completed,
    /// Audit cancelled; partial results are valid output
    Cancelled,
}

/// Classification outcome for a single citation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Local title agrees with the authoritative title
    Match,
    /// Local title disagrees with the authoritative title
    Mismatch,
    /// Identifier resolved but the registry returned no record for it
    NotFound,
    /// No trustworthy identifier could be recovered from the record
    InvalidUrl,
}

/// Authoritative bibliographic metadata for one accession number.
///
/// Produced fresh per audit run and never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    /// Authoritative article title
    pub title: String,

    /// First surnames comma-joined, with ", et al." appended when the
    /// author list was truncated
    pub authors: String,

    /// Journal title
    pub journal: String,

    /// Publication year, 0 when unparseable
    pub year: u16,
}

/// One classified citation record.
///
/// Created once, immutable, collected in corpus traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// Subject the record belongs to
    pub subject: String,

    /// Research area title the record belongs to
    pub area: String,

    /// The original record, unmodified
    pub citation: CitationRecord,

    /// Resolved accession number, if any
    pub pmid: Option<String>,

    /// Fetched authoritative metadata, if any
    pub metadata: Option<ArticleMetadata>,

    /// Title similarity in [0, 1]
    pub similarity: f64,

    /// Classification outcome
    pub status: AuditStatus,
}

/// Aggregate counts over a result list.
///
/// Invariant: `total == matches + mismatches + not_found + invalid_urls`.
/// Counters are bumped incrementally during a run and recomputed from the
/// final result list to guard against drift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub not_found: usize,
    pub invalid_urls: usize,
}

impl AuditSummary {
    /// Count one classified record
    pub fn record(&mut self, status: AuditStatus) {
        self.total += 1;
        match status {
            AuditStatus::Match => self.matches += 1,
            AuditStatus::Mismatch => self.mismatches += 1,
            AuditStatus::NotFound => self.not_found += 1,
            AuditStatus::InvalidUrl => self.invalid_urls += 1,
        }
    }

    /// Recompute the summary from a result list
    pub fn from_results(results: &[AuditResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result.status);
        }
        summary
    }

    /// Check the counting invariant
    pub fn is_consistent(&self) -> bool {
        self.total == self.matches + self.mismatches + self.not_found + self.invalid_urls
    }
}

/// Progress tracking for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditProgress {
    /// Overall percentage, 0-100, monotonically non-decreasing within a run
    pub percent: u8,

    /// Current operation description
    pub current_operation: String,

    /// Elapsed time (seconds)
    pub elapsed_seconds: u64,
}

/// One end-to-end audit run: ordered results, summary, progress, and an
/// optional run-level error when the registry was unreachable outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRun {
    /// Unique run identifier
    pub run_id: Uuid,

    /// Current workflow phase
    pub phase: AuditPhase,

    /// Progress tracking
    pub progress: AuditProgress,

    /// Results in corpus traversal order, one per audited record
    pub results: Vec<AuditResult>,

    /// Aggregate counts over `results`
    pub summary: AuditSummary,

    /// Run-level error. Set when the run produced a best-effort report under
    /// total registry unavailability; partial results remain valid output.
    pub error: Option<String>,

    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Run end time (set on completion or cancellation)
    pub ended_at: Option<DateTime<Utc>>,
}

impl AuditRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: AuditPhase::Resolving,
            progress: AuditProgress::default(),
            results: Vec::new(),
            summary: AuditSummary::default(),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new phase, stamping the end time on terminal phases
    pub fn transition_to(&mut self, phase: AuditPhase) {
        self.phase = phase;
        if matches!(phase, AuditPhase::Completed | AuditPhase::Cancelled) {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Update progress. The percentage is clamped so it never decreases,
    /// even when phase bands overlap at their boundaries.
    pub fn update_progress(&mut self, percent: u8, operation: String) {
        self.progress.percent = self.progress.percent.max(percent.min(100));
        self.progress.current_operation = operation;
        self.progress.elapsed_seconds = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
    }
}

impl Default for AuditRun {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_status(status: AuditStatus) -> AuditResult {
        AuditResult {
            subject: "s".to_string(),
            area: "a".to_string(),
            citation: CitationRecord {
                title: "t".to_string(),
                authors: String::new(),
                journal: String::new(),
                year: 0,
                url: String::new(),
                pmid: None,
            },
            pmid: None,
            metadata: None,
            similarity: 0.0,
            status,
        }
    }

    #[test]
    fn test_summary_recomputation_matches_incremental_counting() {
        let statuses = [
            AuditStatus::Match,
            AuditStatus::Match,
            AuditStatus::Mismatch,
            AuditStatus::NotFound,
            AuditStatus::InvalidUrl,
        ];

        let mut incremental = AuditSummary::default();
        let results: Vec<AuditResult> = statuses
            .iter()
            .map(|&s| {
                incremental.record(s);
                result_with_status(s)
            })
            .collect();

        let recomputed = AuditSummary::from_results(&results);
        assert_eq!(incremental, recomputed);
        assert!(recomputed.is_consistent());
        assert_eq!(recomputed.total, results.len());
        assert_eq!(recomputed.matches, 2);
        assert_eq!(recomputed.invalid_urls, 1);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut run = AuditRun::new();
        run.update_progress(40, "fetching".to_string());
        run.update_progress(25, "late event".to_string());
        assert_eq!(run.progress.percent, 40);
        run.update_progress(100, "done".to_string());
        assert_eq!(run.progress.percent, 100);
    }

    #[test]
    fn test_terminal_transition_sets_end_time() {
        let mut run = AuditRun::new();
        assert!(run.ended_at.is_none());
        run.transition_to(AuditPhase::Fetching);
        assert!(run.ended_at.is_none());
        run.transition_to(AuditPhase::Completed);
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AuditStatus::InvalidUrl).unwrap(),
            "\"invalid_url\""
        );
        assert_eq!(
            serde_json::to_string(&AuditStatus::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
