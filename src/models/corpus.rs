//! Citation corpus input types
//!
//! The corpus is supplied by the host application and is read-only to the
//! engine: the audit detects and scores drift, it never edits records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One locally stored claim that a research area is supported by a published
/// study. Identity is positional (subject, area, index within the area); there
/// is no stored key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Locally stored study title
    pub title: String,

    /// Locally stored author list (free text)
    pub authors: String,

    /// Locally stored journal name
    pub journal: String,

    /// Locally stored publication year
    #[serde(default)]
    pub year: u16,

    /// Free-text reference link, usually but not reliably a PubMed URL
    #[serde(default)]
    pub url: String,

    /// Explicit accession number, when the curator recorded one. Unreliable:
    /// it is only trusted after passing the 6-9 digit format check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
}

/// Named grouping of citation records under one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchArea {
    /// Area title (e.g. "Tissue repair")
    pub title: String,

    /// Citations claimed to support this area
    pub citations: Vec<CitationRecord>,
}

/// Full citation corpus, keyed by subject identifier.
///
/// A `BTreeMap` keeps subject traversal order deterministic, which the audit
/// relies on for reproducible result ordering.
pub type Corpus = BTreeMap<String, Vec<ResearchArea>>;
