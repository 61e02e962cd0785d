//! Audit orchestrator
//!
//! Drives one end-to-end audit run: flattens the corpus into an ordered
//! sequence, resolves accession numbers, fetches authoritative metadata once
//! for the whole run, then classifies every record in traversal order. The
//! run exclusively owns its result list and summary; progress streams over
//! the event bus and cancellation is honored at every suspension point.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::AuditConfig;
use crate::error::Result;
use crate::events::{AuditEvent, EventBus};
use crate::models::{
    ArticleMetadata, AuditPhase, AuditResult, AuditRun, AuditStatus, AuditSummary, CitationRecord,
    Corpus,
};
use crate::services::{AccessionResolver, PubMedClient, TitleMatcher};

/// Fetch-phase share of overall run progress. Classification fills the rest.
const FETCH_PROGRESS_CAP: u8 = 80;

/// One corpus record with its position context.
///
/// The nested subject → area → record corpus is flattened into these before
/// processing; a flat ordered list keeps ordering and progress accounting
/// simple.
struct FlatCitation<'a> {
    subject: &'a str,
    area: &'a str,
    record: &'a CitationRecord,
}

fn flatten_corpus<'a>(
    corpus: &'a Corpus,
    subject_filter: Option<&BTreeSet<String>>,
) -> Vec<FlatCitation<'a>> {
    let mut flat = Vec::new();
    for (subject, areas) in corpus {
        if let Some(filter) = subject_filter {
            if !filter.contains(subject) {
                continue;
            }
        }
        for area in areas {
            for record in &area.citations {
                flat.push(FlatCitation {
                    subject,
                    area: &area.title,
                    record,
                });
            }
        }
    }
    flat
}

/// Audit workflow orchestrator
pub struct AuditOrchestrator {
    event_bus: EventBus,
    client: PubMedClient,
    resolver: AccessionResolver,
    matcher: TitleMatcher,
}

impl AuditOrchestrator {
    /// Build an orchestrator from a validated configuration
    pub fn new(config: AuditConfig, event_bus: EventBus) -> Result<Self> {
        config.validate()?;
        let client = PubMedClient::new(&config)?;
        let matcher = TitleMatcher::from_config(&config);

        Ok(Self {
            event_bus,
            client,
            resolver: AccessionResolver::new(),
            matcher,
        })
    }

    /// Execute one audit run over the corpus, optionally restricted to the
    /// given subjects.
    ///
    /// Always returns a run: remote failures degrade classifications rather
    /// than abort, and a cancelled run carries its partial results. The
    /// result list holds exactly one entry per audited record, in corpus
    /// traversal order.
    pub async fn run_audit(
        &self,
        corpus: &Corpus,
        subject_filter: Option<&BTreeSet<String>>,
        cancel: CancellationToken,
    ) -> AuditRun {
        let start_time = std::time::Instant::now();
        let mut run = AuditRun::new();
        let run_id = run.run_id;

        let flat = flatten_corpus(corpus, subject_filter);

        tracing::info!(
            run_id = %run_id,
            citations = flat.len(),
            filtered = subject_filter.is_some(),
            "Starting citation audit"
        );

        self.event_bus.emit_lossy(AuditEvent::AuditStarted {
            run_id,
            total_citations: flat.len(),
            timestamp: Utc::now(),
        });

        // Phase 1: RESOLVING - recover accession numbers in corpus order
        run.transition_to(AuditPhase::Resolving);
        run.update_progress(0, "Resolving accession numbers...".to_string());

        let resolved: Vec<Option<String>> = flat
            .iter()
            .map(|citation| self.resolver.resolve(citation.record))
            .collect();

        // One fetch per run over the distinct identifiers: remote calls scale
        // with distinct-identifier count, not corpus size.
        let distinct: Vec<String> = resolved
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        tracing::info!(
            run_id = %run_id,
            resolved = resolved.iter().filter(|r| r.is_some()).count(),
            distinct = distinct.len(),
            "Accession resolution completed"
        );

        // Phase 2: FETCHING - batched metadata retrieval, 0-80% band
        run.transition_to(AuditPhase::Fetching);
        let report = {
            let bus = &self.event_bus;
            let run_ref = &mut run;
            self.client
                .fetch_metadata(&distinct, &cancel, |fetch_percent| {
                    let overall = (fetch_percent as u32 * FETCH_PROGRESS_CAP as u32 / 100) as u8;
                    run_ref.update_progress(
                        overall,
                        format!("Fetching article metadata ({fetch_percent}%)"),
                    );
                    bus.emit_lossy(AuditEvent::AuditProgress {
                        run_id,
                        phase: run_ref.phase,
                        percent: run_ref.progress.percent,
                        current_operation: run_ref.progress.current_operation.clone(),
                        elapsed_seconds: run_ref.progress.elapsed_seconds,
                        timestamp: Utc::now(),
                    });
                })
                .await
        };

        if cancel.is_cancelled() {
            return self.finalize_cancelled(run);
        }

        // Phase 3: CLASSIFYING - score and classify in corpus order, 80-100%
        run.transition_to(AuditPhase::Classifying);
        for (index, (citation, pmid)) in flat.iter().zip(resolved.iter()).enumerate() {
            if cancel.is_cancelled() {
                return self.finalize_cancelled(run);
            }

            let result = self.classify(citation, pmid.as_deref(), &report.articles);
            run.summary.record(result.status);
            run.results.push(result);

            let done = index + 1;
            let band = (100 - FETCH_PROGRESS_CAP) as f64;
            let percent =
                FETCH_PROGRESS_CAP + ((done as f64 / flat.len() as f64) * band).round() as u8;
            run.update_progress(
                percent,
                format!("Classified citation {} of {}", done, flat.len()),
            );
            self.event_bus.emit_lossy(AuditEvent::AuditProgress {
                run_id,
                phase: run.phase,
                percent: run.progress.percent,
                current_operation: run.progress.current_operation.clone(),
                elapsed_seconds: run.progress.elapsed_seconds,
                timestamp: Utc::now(),
            });

            // Classification is CPU-only; yield so a cancel can land between
            // records on large corpora.
            tokio::task::yield_now().await;
        }

        // Finalize: recompute the summary rather than trusting the
        // incremental counters
        run.summary = AuditSummary::from_results(&run.results);
        debug_assert!(run.summary.is_consistent());

        if report.registry_unreachable() {
            let message = format!(
                "registry unreachable: all {} metadata batches failed",
                report.batches_total
            );
            tracing::error!(run_id = %run_id, error = %message, "Audit degraded to best-effort report");
            run.error = Some(message);
        }

        run.update_progress(100, "Audit completed".to_string());
        run.transition_to(AuditPhase::Completed);

        let duration_seconds = start_time.elapsed().as_secs();
        tracing::info!(
            run_id = %run_id,
            total = run.summary.total,
            matches = run.summary.matches,
            mismatches = run.summary.mismatches,
            not_found = run.summary.not_found,
            invalid_urls = run.summary.invalid_urls,
            duration_seconds,
            "Citation audit completed"
        );

        self.event_bus.emit_lossy(AuditEvent::AuditCompleted {
            run_id,
            summary: run.summary.clone(),
            error: run.error.clone(),
            duration_seconds,
            timestamp: Utc::now(),
        });

        run
    }

    /// Classify one citation against the resolved identifier and the fetched
    /// metadata map
    fn classify(
        &self,
        citation: &FlatCitation<'_>,
        pmid: Option<&str>,
        articles: &HashMap<String, ArticleMetadata>,
    ) -> AuditResult {
        let mut result = AuditResult {
            subject: citation.subject.to_string(),
            area: citation.area.to_string(),
            citation: citation.record.clone(),
            pmid: pmid.map(str::to_string),
            metadata: None,
            similarity: 0.0,
            status: AuditStatus::InvalidUrl,
        };

        // A record without a usable title is a data-shape failure, classified
        // invalid_url even when an identifier resolved
        if citation.record.title.trim().is_empty() {
            return result;
        }

        let Some(pmid) = pmid else {
            return result;
        };

        let Some(metadata) = articles.get(pmid) else {
            result.status = AuditStatus::NotFound;
            return result;
        };

        result.similarity = self.matcher.score(&citation.record.title, &metadata.title);
        result.status = self.matcher.classify(result.similarity);
        result.metadata = Some(metadata.clone());
        result
    }

    fn finalize_cancelled(&self, mut run: AuditRun) -> AuditRun {
        // Partial results are valid output: recompute the summary over what
        // was classified before the cancellation point
        run.summary = AuditSummary::from_results(&run.results);
        run.transition_to(AuditPhase::Cancelled);

        tracing::info!(
            run_id = %run.run_id,
            results_completed = run.results.len(),
            "Audit cancelled"
        );

        self.event_bus.emit_lossy(AuditEvent::AuditCancelled {
            run_id: run.run_id,
            results_completed: run.results.len(),
            timestamp: Utc::now(),
        });

        run
    }
}
