//! PubMed EFetch client
//!
//! Retrieves authoritative bibliographic metadata for a set of accession
//! numbers in bounded, strictly sequential batches. Batches are paced with a
//! fixed delay to respect the registry's rate limits; a failed batch is
//! logged and skipped, never fatal. Parsing is defensive: a missing field is
//! "field absent", not an error.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::{AuditConfig, EFETCH_MAX_IDS};
use crate::models::ArticleMetadata;

const EFETCH_PATH: &str = "/efetch.fcgi";

/// PubMed client errors
#[derive(Debug, Error)]
pub enum PubMedError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

/// Outcome of one batched fetch.
///
/// Identifiers from failed batches are simply absent from `articles`; the
/// caller classifies their records `not_found`.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Parsed metadata keyed by accession number
    pub articles: HashMap<String, ArticleMetadata>,

    /// Number of batches attempted
    pub batches_total: usize,

    /// Number of batches that failed (network error, non-success status)
    pub batches_failed: usize,
}

impl FetchReport {
    /// True when every attempted batch failed, i.e. the registry was
    /// unreachable for the whole run
    pub fn registry_unreachable(&self) -> bool {
        self.batches_total > 0 && self.batches_failed == self.batches_total
    }
}

/// Field scanners over the EFetch XML body.
///
/// The registry responds with one `<PubmedArticle>` container per requested
/// identifier. Only the handful of fields the audit needs are extracted.
struct ResponseParser {
    article: Regex,
    pmid: Regex,
    title: Regex,
    surname: Regex,
    journal: Regex,
    journal_title: Regex,
    pub_date: Regex,
    year: Regex,
}

impl ResponseParser {
    fn new() -> Self {
        Self {
            article: Regex::new(r"(?s)<PubmedArticle\b.*?>.*?</PubmedArticle>")
                .expect("valid article pattern"),
            pmid: Regex::new(r"<PMID[^>]*>(\d+)</PMID>").expect("valid pmid pattern"),
            title: Regex::new(r"(?s)<ArticleTitle[^>]*>(.*?)</ArticleTitle>")
                .expect("valid title pattern"),
            surname: Regex::new(r"(?s)<LastName>(.*?)</LastName>").expect("valid surname pattern"),
            journal: Regex::new(r"(?s)<Journal\b.*?>(.*?)</Journal>")
                .expect("valid journal pattern"),
            journal_title: Regex::new(r"(?s)<Title[^>]*>(.*?)</Title>")
                .expect("valid journal title pattern"),
            pub_date: Regex::new(r"(?s)<PubDate\b.*?>(.*?)</PubDate>")
                .expect("valid pub date pattern"),
            year: Regex::new(r"\b(\d{4})\b").expect("valid year pattern"),
        }
    }

    /// Parse every attributable article record out of a response body.
    ///
    /// Containers without a PMID are skipped silently: the record cannot be
    /// keyed back to any local citation.
    fn parse(&self, body: &str, max_authors: usize) -> Vec<(String, ArticleMetadata)> {
        let mut parsed = Vec::new();

        for container in self.article.find_iter(body) {
            let fragment = container.as_str();

            let Some(pmid) = self
                .pmid
                .captures(fragment)
                .map(|c| c[1].to_string())
            else {
                tracing::debug!("Skipping article container without PMID");
                continue;
            };

            let title = self
                .title
                .captures(fragment)
                .map(|c| decode_entities(c[1].trim()))
                .unwrap_or_default();

            let surnames: Vec<String> = self
                .surname
                .captures_iter(fragment)
                .map(|c| decode_entities(c[1].trim()))
                .collect();
            let authors = format_authors(&surnames, max_authors);

            let journal = self
                .journal
                .captures(fragment)
                .and_then(|c| {
                    let block = c.get(1).map(|m| m.as_str()).unwrap_or_default();
                    self.journal_title
                        .captures(block)
                        .map(|t| decode_entities(t[1].trim()))
                })
                .unwrap_or_default();

            let year = self
                .pub_date
                .captures(fragment)
                .and_then(|c| {
                    let block = c.get(1).map(|m| m.as_str()).unwrap_or_default();
                    self.year
                        .captures(block)
                        .and_then(|y| y[1].parse::<u16>().ok())
                })
                .unwrap_or(0);

            parsed.push((
                pmid,
                ArticleMetadata {
                    title,
                    authors,
                    journal,
                    year,
                },
            ));
        }

        parsed
    }
}

/// Decode the XML entities the registry emits in text content
fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Join the first `max_authors` surnames, appending ", et al." when the list
/// was truncated
fn format_authors(surnames: &[String], max_authors: usize) -> String {
    let mut authors = surnames
        .iter()
        .take(max_authors)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if surnames.len() > max_authors {
        authors.push_str(", et al.");
    }
    authors
}

/// Batched PubMed EFetch client
pub struct PubMedClient {
    http_client: reqwest::Client,
    base_url: String,
    chunk_size: usize,
    batch_delay: Duration,
    max_authors: usize,
    parser: ResponseParser,
}

impl PubMedClient {
    pub fn new(config: &AuditConfig) -> Result<Self, PubMedError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PubMedError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chunk_size: config.chunk_size.clamp(1, EFETCH_MAX_IDS),
            batch_delay: config.batch_delay,
            max_authors: config.max_authors,
            parser: ResponseParser::new(),
        })
    }

    /// Fetch metadata for a set of accession numbers.
    ///
    /// Identifiers are deduplicated and fetched in ordered batches of at most
    /// `chunk_size`. After each batch (success or failure) `on_progress`
    /// receives the rounded fetch percentage. Cancellation is honored between
    /// batches; the partial report gathered so far is returned.
    pub async fn fetch_metadata<F>(
        &self,
        pmids: &[String],
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> FetchReport
    where
        F: FnMut(u8),
    {
        // Dedup through a BTreeSet: the same study may back many citations,
        // and the sorted order keeps batch composition reproducible.
        let ids: Vec<&String> = pmids.iter().collect::<BTreeSet<_>>().into_iter().collect();

        let batches: Vec<&[&String]> = ids.chunks(self.chunk_size).collect();
        let mut report = FetchReport {
            batches_total: batches.len(),
            ..Default::default()
        };

        if batches.is_empty() {
            return report;
        }

        tracing::info!(
            identifiers = ids.len(),
            batches = batches.len(),
            chunk_size = self.chunk_size,
            "Fetching article metadata from PubMed"
        );

        for (index, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    completed_batches = index,
                    total_batches = batches.len(),
                    "Metadata fetch cancelled between batches"
                );
                break;
            }

            // Pacing delay between consecutive batches only
            if index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            match self.fetch_batch(batch).await {
                Ok(articles) => {
                    tracing::debug!(
                        batch = index + 1,
                        total = batches.len(),
                        parsed = articles.len(),
                        "EFetch batch completed"
                    );
                    report.articles.extend(articles);
                }
                Err(e) => {
                    report.batches_failed += 1;
                    tracing::warn!(
                        batch = index + 1,
                        total = batches.len(),
                        error = %e,
                        "EFetch batch failed, continuing with next batch"
                    );
                }
            }

            let percent = (((index + 1) as f64 / batches.len() as f64) * 100.0).round() as u8;
            on_progress(percent);
        }

        report
    }

    /// Issue one EFetch request for a batch of identifiers
    async fn fetch_batch(
        &self,
        batch: &[&String],
    ) -> Result<Vec<(String, ArticleMetadata)>, PubMedError> {
        let url = format!("{}{}", self.base_url, EFETCH_PATH);
        let id_list = batch
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("id", id_list.as_str()),
                ("retmode", "xml"),
            ])
            .send()
            .await
            .map_err(|e| PubMedError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PubMedError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PubMedError::NetworkError(e.to_string()))?;

        Ok(self.parser.parse(&body, self.max_authors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_xml(pmid: &str, title: &str, surnames: &[&str], journal: &str, year: &str) -> String {
        let authors: String = surnames
            .iter()
            .map(|s| format!("<Author><LastName>{}</LastName><ForeName>X</ForeName></Author>", s))
            .collect();
        format!(
            "<PubmedArticle><MedlineCitation><PMID Version=\"1\">{pmid}</PMID>\
             <Article><Journal><Title>{journal}</Title>\
             <JournalIssue><PubDate>{year}</PubDate></JournalIssue></Journal>\
             <ArticleTitle>{title}</ArticleTitle>\
             <AuthorList>{authors}</AuthorList></Article>\
             </MedlineCitation></PubmedArticle>"
        )
    }

    fn parser() -> ResponseParser {
        ResponseParser::new()
    }

    #[test]
    fn test_parses_all_fields_from_article_container() {
        let body = format!(
            "<PubmedArticleSet>{}</PubmedArticleSet>",
            article_xml(
                "12345678",
                "Magnesium &amp; sleep quality",
                &["Smith", "Jones"],
                "Sleep Med",
                "<Year>2019</Year><Month>Mar</Month>"
            )
        );

        let parsed = parser().parse(&body, 3);
        assert_eq!(parsed.len(), 1);
        let (pmid, meta) = &parsed[0];
        assert_eq!(pmid, "12345678");
        assert_eq!(meta.title, "Magnesium & sleep quality");
        assert_eq!(meta.authors, "Smith, Jones");
        assert_eq!(meta.journal, "Sleep Med");
        assert_eq!(meta.year, 2019);
    }

    #[test]
    fn test_fourth_author_truncates_with_et_al() {
        let body = article_xml(
            "22334455",
            "T",
            &["Alpha", "Beta", "Gamma", "Delta"],
            "J",
            "<Year>2001</Year>",
        );
        let parsed = parser().parse(&body, 3);
        assert_eq!(parsed[0].1.authors, "Alpha, Beta, Gamma, et al.");
    }

    #[test]
    fn test_exactly_three_authors_no_et_al() {
        let body = article_xml(
            "22334455",
            "T",
            &["Alpha", "Beta", "Gamma"],
            "J",
            "<Year>2001</Year>",
        );
        let parsed = parser().parse(&body, 3);
        assert_eq!(parsed[0].1.authors, "Alpha, Beta, Gamma");
    }

    #[test]
    fn test_missing_year_parses_as_zero() {
        let body = article_xml("22334455", "T", &["Alpha"], "J", "<MedlineDate>spring</MedlineDate>");
        let parsed = parser().parse(&body, 3);
        assert_eq!(parsed[0].1.year, 0);
    }

    #[test]
    fn test_year_found_inside_medline_date_text() {
        let body = article_xml("22334455", "T", &["Alpha"], "J", "<MedlineDate>1998 Mar-Apr</MedlineDate>");
        let parsed = parser().parse(&body, 3);
        assert_eq!(parsed[0].1.year, 1998);
    }

    #[test]
    fn test_container_without_pmid_skipped_silently() {
        let body = "<PubmedArticleSet>\
            <PubmedArticle><MedlineCitation><Article>\
            <ArticleTitle>Orphan record</ArticleTitle>\
            </Article></MedlineCitation></PubmedArticle>\
            </PubmedArticleSet>";
        let parsed = parser().parse(body, 3);
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_missing_tags_yield_absent_fields_not_errors() {
        let body = "<PubmedArticle><MedlineCitation><PMID>999999</PMID>\
                    </MedlineCitation></PubmedArticle>";
        let parsed = parser().parse(body, 3);
        assert_eq!(parsed.len(), 1);
        let meta = &parsed[0].1;
        assert!(meta.title.is_empty());
        assert!(meta.authors.is_empty());
        assert!(meta.journal.is_empty());
        assert_eq!(meta.year, 0);
    }

    #[test]
    fn test_entity_decoding_covers_registry_entities() {
        assert_eq!(
            decode_entities("A &lt;B&gt; &quot;C&quot; &apos;D&apos; &amp; E"),
            "A <B> \"C\" 'D' & E"
        );
        // Double-encoded ampersand decodes one level only
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_author_formatting_respects_configured_cutoff() {
        let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_authors(&names, 2), "A, B, et al.");
        assert_eq!(format_authors(&names, 3), "A, B, C");
        assert_eq!(format_authors(&[], 3), "");
    }
}
