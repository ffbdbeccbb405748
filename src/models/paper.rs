//! Paper record as returned by the Semantic Scholar Graph API.
//!
//! The record is opaque to the orchestration layer. Every field is optional
//! and sources read only what they need.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// External identifier namespaces carried in `externalIds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalId {
    ArXiv,
    PubMed,
    PubMedCentral,
    Doi,
}

impl ExternalId {
    /// Key used in the `externalIds` map
    pub fn key(&self) -> &'static str {
        match self {
            ExternalId::ArXiv => "ArXiv",
            ExternalId::PubMed => "PubMed",
            ExternalId::PubMedCentral => "PubMedCentral",
            ExternalId::Doi => "DOI",
        }
    }
}

/// Open access PDF location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAccessPdf {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Machine-generated one sentence summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tldr {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Pre-rendered citation formats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationStyles {
    #[serde(default)]
    pub bibtex: Option<String>,
}

/// A paper record from the search API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Semantic Scholar paper id (40 hex characters)
    #[serde(default)]
    pub paper_id: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Semantic Scholar page URL
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub year: Option<i32>,

    /// Identifiers in other namespaces (`ArXiv`, `DOI`, `PubMed`, `CorpusId`, ...)
    #[serde(default)]
    pub external_ids: Option<HashMap<String, serde_json::Value>>,

    #[serde(default)]
    pub is_open_access: Option<bool>,

    #[serde(default)]
    pub open_access_pdf: Option<OpenAccessPdf>,

    #[serde(default)]
    pub influential_citation_count: Option<u64>,

    #[serde(default)]
    pub tldr: Option<Tldr>,

    #[serde(default)]
    pub citation_styles: Option<CitationStyles>,
}

impl Paper {
    /// Look up an external identifier, accepting string or numeric values
    pub fn external_id(&self, kind: ExternalId) -> Option<String> {
        let value = self.external_ids.as_ref()?.get(kind.key())?;
        let id = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }

    /// arXiv identifier, e.g. `2106.15928`
    pub fn arxiv_id(&self) -> Option<String> {
        self.external_id(ExternalId::ArXiv)
    }

    /// DOI, e.g. `10.1038/s41586-021-03819-2`
    pub fn doi(&self) -> Option<String> {
        self.external_id(ExternalId::Doi)
    }

    /// PubMed identifier
    pub fn pubmed_id(&self) -> Option<String> {
        self.external_id(ExternalId::PubMed)
    }

    /// PubMed Central identifier without the `PMC` prefix
    pub fn pmc_id(&self) -> Option<String> {
        self.external_id(ExternalId::PubMedCentral)
            .map(|id| id.trim_start_matches("PMC").to_string())
            .filter(|id| !id.is_empty())
    }

    /// Open access PDF URL, only when the paper is flagged open access
    pub fn open_access_url(&self) -> Option<&str> {
        if self.is_open_access != Some(true) {
            return None;
        }
        self.open_access_pdf
            .as_ref()?
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    /// Raw BibTeX entry, if the API returned one
    pub fn bibtex(&self) -> Option<&str> {
        self.citation_styles.as_ref()?.bibtex.as_deref()
    }

    /// TLDR summary text
    pub fn tldr_text(&self) -> Option<&str> {
        self.tldr.as_ref()?.text.as_deref()
    }

    /// Ranking signal used to order a page before dispatch
    pub fn influence(&self) -> u64 {
        self.influential_citation_count.unwrap_or(0)
    }

    /// File name the PDF is stored under
    pub fn pdf_file_name(&self) -> String {
        format!("{}.pdf", self.paper_id.replace(['/', '\\'], "_"))
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder for the given paper id
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper: Paper {
                paper_id: paper_id.into(),
                ..Default::default()
            },
        }
    }

    /// Set title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.paper.title = Some(title.into());
        self
    }

    /// Set Semantic Scholar URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.paper.url = Some(url.into());
        self
    }

    /// Set publication year
    pub fn year(mut self, year: i32) -> Self {
        self.paper.year = Some(year);
        self
    }

    /// Add an external identifier
    pub fn external_id(mut self, kind: ExternalId, id: impl Into<String>) -> Self {
        self.paper
            .external_ids
            .get_or_insert_with(HashMap::new)
            .insert(kind.key().to_string(), serde_json::Value::String(id.into()));
        self
    }

    /// Set arXiv id
    pub fn arxiv(self, id: impl Into<String>) -> Self {
        self.external_id(ExternalId::ArXiv, id)
    }

    /// Set DOI
    pub fn doi(self, doi: impl Into<String>) -> Self {
        self.external_id(ExternalId::Doi, doi)
    }

    /// Set PubMed id
    pub fn pubmed(self, id: impl Into<String>) -> Self {
        self.external_id(ExternalId::PubMed, id)
    }

    /// Set PubMed Central id
    pub fn pmc(self, id: impl Into<String>) -> Self {
        self.external_id(ExternalId::PubMedCentral, id)
    }

    /// Mark as open access with the given PDF URL
    pub fn open_access(mut self, url: impl Into<String>) -> Self {
        self.paper.is_open_access = Some(true);
        self.paper.open_access_pdf = Some(OpenAccessPdf {
            url: Some(url.into()),
            status: None,
        });
        self
    }

    /// Set influential citation count
    pub fn influential_citations(mut self, count: u64) -> Self {
        self.paper.influential_citation_count = Some(count);
        self
    }

    /// Set BibTeX citation
    pub fn bibtex(mut self, bibtex: impl Into<String>) -> Self {
        self.paper.citation_styles = Some(CitationStyles {
            bibtex: Some(bibtex.into()),
        });
        self
    }

    /// Set TLDR text
    pub fn tldr(mut self, text: impl Into<String>) -> Self {
        self.paper.tldr = Some(Tldr {
            model: None,
            text: Some(text.into()),
        });
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}
