//! Retrieval results: destination path to paper metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::Paper;
use crate::utils::cite::{citation_key, format_citation, normalize_bibtex};

/// Metadata recorded for a retrieved paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// Plain-text citation
    pub citation: String,

    /// BibTeX citation key
    pub key: String,

    /// BibTeX entry with normalized entry type
    pub bibtex: String,

    pub tldr: Option<String>,

    pub year: Option<i32>,

    pub url: Option<String>,

    pub paper_id: String,

    pub title: Option<String>,

    /// Id of the source that retrieved the PDF
    pub source: String,
}

impl PaperMetadata {
    /// Build the metadata for `paper`, retrieved by `source`.
    pub fn from_paper(paper: &Paper, source: &str) -> Self {
        let bibtex = paper.bibtex().map(normalize_bibtex).unwrap_or_default();
        let key = citation_key(&bibtex).unwrap_or_else(|| paper.paper_id.clone());
        let citation = if bibtex.is_empty() {
            paper
                .title
                .clone()
                .unwrap_or_else(|| format!("Ref {}", key))
        } else {
            format_citation(&bibtex, &key)
        };

        Self {
            citation,
            key,
            bibtex,
            tldr: paper.tldr_text().map(str::to_string),
            year: paper.year,
            url: paper.url.clone(),
            paper_id: paper.paper_id.clone(),
            title: paper.title.clone(),
            source: source.to_string(),
        }
    }
}

/// Accumulated results of a harvest, keyed by destination path.
///
/// Paths are unique: a path that already has an entry is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalResults {
    entries: BTreeMap<PathBuf, PaperMetadata>,
}

impl RetrievalResults {
    /// Create an empty result map
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retrieved papers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been retrieved
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `path` already has a result
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Metadata recorded for `path`
    pub fn get(&self, path: &Path) -> Option<&PaperMetadata> {
        self.entries.get(path)
    }

    /// Record a result. Returns `false` and keeps the existing entry if `path`
    /// is already present.
    pub fn insert(&mut self, path: PathBuf, metadata: PaperMetadata) -> bool {
        match self.entries.entry(path) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(metadata);
                true
            }
        }
    }

    /// Iterate over results in path order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &PaperMetadata)> {
        self.entries.iter()
    }

    /// Destination paths in path order
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> BTreeMap<PathBuf, PaperMetadata> {
        self.entries
    }
}

impl IntoIterator for RetrievalResults {
    type Item = (PathBuf, PaperMetadata);
    type IntoIter = std::collections::btree_map::IntoIter<PathBuf, PaperMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
