//! Accession number resolver
//!
//! Recovers a trustworthy PubMed accession number (PMID) from a citation
//! record: from the explicit field when it passes the format check, otherwise
//! from the free-text reference URL via an ordered pattern ladder. Resolution
//! is deterministic and never fails; a record with no recoverable identifier
//! resolves to `None`.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::CitationRecord;

/// A named URL extraction pattern. Patterns are tried in fixed priority
/// order, most specific first; order is a correctness requirement, not an
/// optimization.
struct UrlPattern {
    name: &'static str,
    regex: Regex,
}

fn url_patterns() -> &'static [UrlPattern] {
    static PATTERNS: OnceLock<Vec<UrlPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // Modern canonical host with the PMID as a path segment:
            // https://pubmed.ncbi.nlm.nih.gov/12345678/
            UrlPattern {
                name: "canonical-host-path",
                regex: Regex::new(r"pubmed\.ncbi\.nlm\.nih\.gov/(\d{6,9})(?:[/?#]|$)")
                    .expect("valid canonical-host-path pattern"),
            },
            // Legacy host with a /pubmed/ path segment:
            // https://www.ncbi.nlm.nih.gov/pubmed/23456789
            UrlPattern {
                name: "legacy-host-path",
                regex: Regex::new(r"ncbi\.nlm\.nih\.gov/pubmed/(\d{6,9})(?:[/?#]|$)")
                    .expect("valid legacy-host-path pattern"),
            },
            // Legacy host query-parameter form:
            // https://ncbi.nlm.nih.gov/pubmed/?term=34567890
            UrlPattern {
                name: "legacy-host-query",
                regex: Regex::new(r"ncbi\.nlm\.nih\.gov/pubmed/?\?term=(\d{6,9})")
                    .expect("valid legacy-host-query pattern"),
            },
            // NCBI host with the PMID somewhere below an arbitrary subpath
            UrlPattern {
                name: "host-subpath",
                regex: Regex::new(r"ncbi\.nlm\.nih\.gov/[^\s?]*[/=](\d{6,9})(?:[/?#]|$)")
                    .expect("valid host-subpath pattern"),
            },
            // Generic fallback: any 6-9 digit run bounded by path separators,
            // '?', '=' or end-of-string
            UrlPattern {
                name: "bare-digit-run",
                regex: Regex::new(r"(?:^|[/?=])(\d{6,9})(?:[/?&#]|$)")
                    .expect("valid bare-digit-run pattern"),
            },
        ]
    })
}

fn pmid_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{6,9}$").expect("valid PMID format pattern"))
}

/// Check the accession number format: 6-9 decimal digits.
///
/// Applied to every candidate regardless of which source produced it.
pub fn is_valid_pmid(candidate: &str) -> bool {
    pmid_format().is_match(candidate)
}

/// Accession number resolver service
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessionResolver;

impl AccessionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a citation record to an accession number, or `None`.
    ///
    /// A valid explicit field takes precedence over any URL-derived value.
    /// An invalid explicit field falls through to URL extraction.
    pub fn resolve(&self, record: &CitationRecord) -> Option<String> {
        if let Some(pmid) = &record.pmid {
            let pmid = pmid.trim();
            if is_valid_pmid(pmid) {
                return Some(pmid.to_string());
            }
            tracing::debug!(pmid = %pmid, "Explicit accession fails format check, trying URL");
        }
        self.extract_from_url(&record.url)
    }

    /// Extract an accession number from a free-text reference URL.
    ///
    /// The first pattern that matches decides the outcome: its captured value
    /// is returned when it passes the format check, and `None` otherwise.
    /// Later patterns are not consulted once an earlier one has matched.
    pub fn extract_from_url(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }

        for pattern in url_patterns() {
            if let Some(captures) = pattern.regex.captures(url) {
                let candidate = captures[1].to_string();
                if is_valid_pmid(&candidate) {
                    tracing::debug!(
                        pattern = pattern.name,
                        pmid = %candidate,
                        "Extracted accession number from URL"
                    );
                    return Some(candidate);
                }
                return None;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pmid: Option<&str>, url: &str) -> CitationRecord {
        CitationRecord {
            title: "A study".to_string(),
            authors: "Smith J".to_string(),
            journal: "J Test".to_string(),
            year: 2020,
            url: url.to_string(),
            pmid: pmid.map(str::to_string),
        }
    }

    #[test]
    fn test_explicit_pmid_takes_precedence_over_url() {
        let resolver = AccessionResolver::new();
        let rec = record(
            Some("99887766"),
            "https://pubmed.ncbi.nlm.nih.gov/12345678/",
        );
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("99887766"));
    }

    #[test]
    fn test_invalid_explicit_pmid_falls_back_to_url() {
        let resolver = AccessionResolver::new();
        let rec = record(Some("12ab34"), "https://pubmed.ncbi.nlm.nih.gov/12345678/");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("12345678"));

        let rec = record(Some("12345"), "https://pubmed.ncbi.nlm.nih.gov/12345678/");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("12345678"));
    }

    #[test]
    fn test_canonical_host_url_resolves() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://pubmed.ncbi.nlm.nih.gov/12345678/");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("12345678"));
    }

    #[test]
    fn test_legacy_path_url_resolves() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://www.ncbi.nlm.nih.gov/pubmed/23456789");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("23456789"));
    }

    #[test]
    fn test_legacy_query_url_resolves() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://ncbi.nlm.nih.gov/pubmed/?term=34567890");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("34567890"));
    }

    #[test]
    fn test_ncbi_subpath_url_resolves() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://www.ncbi.nlm.nih.gov/entrez/query/4455667/");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("4455667"));
    }

    #[test]
    fn test_generic_digit_run_resolves() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://example.com/papers/7654321");
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("7654321"));
    }

    #[test]
    fn test_short_digit_run_rejected() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://example.com/article/42");
        assert_eq!(resolver.resolve(&rec), None);
    }

    #[test]
    fn test_empty_and_garbled_urls_resolve_to_none() {
        let resolver = AccessionResolver::new();
        assert_eq!(resolver.resolve(&record(None, "")).as_deref(), None);
        assert_eq!(resolver.resolve(&record(None, "   ")).as_deref(), None);
        assert_eq!(
            resolver.resolve(&record(None, "not a url at all")).as_deref(),
            None
        );
    }

    #[test]
    fn test_ten_digit_run_is_not_a_pmid() {
        let resolver = AccessionResolver::new();
        let rec = record(None, "https://example.com/doc/1234567890/view");
        assert_eq!(resolver.resolve(&rec), None);
    }

    #[test]
    fn test_format_check_bounds() {
        assert!(!is_valid_pmid("12345"));
        assert!(is_valid_pmid("123456"));
        assert!(is_valid_pmid("123456789"));
        assert!(!is_valid_pmid("1234567890"));
        assert!(!is_valid_pmid("12a456"));
        assert!(!is_valid_pmid(""));
    }
}
