//! Search request and response models.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Paper;

/// Publication year filter accepted by the search API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearFilter {
    /// A single year, e.g. `2020`
    Single(i32),
    /// An inclusive range with `start < end`, e.g. `2018-2022`
    Range { start: i32, end: i32 },
}

impl YearFilter {
    /// Parse a user supplied year filter.
    ///
    /// A range is accepted only when both ends are integers and the start is
    /// strictly before the end. Open ranges such as `2010-` are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.split_once('-') {
            Some((start, end)) => {
                let start: i32 = start.trim().parse().ok()?;
                let end: i32 = end.trim().parse().ok()?;
                (start < end).then_some(YearFilter::Range { start, end })
            }
            None => raw.parse().ok().map(YearFilter::Single),
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::Single(year) => write!(f, "{}", year),
            YearFilter::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

/// Search query parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Main search query string
    pub query: String,

    /// Normalized year filter
    pub year: Option<YearFilter>,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            year: None,
        }
    }

    /// Set year filter from user input.
    ///
    /// Input that does not parse is dropped with a warning and the search
    /// runs unfiltered.
    pub fn year(mut self, raw: &str) -> Self {
        self.year = YearFilter::parse(raw);
        if self.year.is_none() {
            tracing::warn!("Could not parse year {}", raw);
        }
        self
    }

    /// Set an already parsed year filter
    pub fn year_filter(mut self, year: YearFilter) -> Self {
        self.year = Some(year);
        self
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of matches reported by the API
    #[serde(default)]
    pub total: usize,

    /// Offset this page starts at, if echoed back
    #[serde(default)]
    pub offset: Option<usize>,

    /// Papers on this page, in API order
    #[serde(default)]
    pub data: Vec<Paper>,
}

impl SearchPage {
    /// Create a page
    pub fn new(total: usize, data: Vec<Paper>) -> Self {
        Self {
            total,
            offset: None,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_filter_parse() {
        assert_eq!(YearFilter::parse("2020"), Some(YearFilter::Single(2020)));
        assert_eq!(
            YearFilter::parse(" 2018-2022 "),
            Some(YearFilter::Range { start: 2018, end: 2022 })
        );
        assert_eq!(YearFilter::parse("2022-2018"), None);
        assert_eq!(YearFilter::parse("2020-2020"), None);
        assert_eq!(YearFilter::parse("2010-"), None);
        assert_eq!(YearFilter::parse("-2015"), None);
        assert_eq!(YearFilter::parse("recent"), None);
    }

    #[test]
    fn test_year_filter_display() {
        assert_eq!(YearFilter::Single(2020).to_string(), "2020");
        assert_eq!(YearFilter::Range { start: 2018, end: 2022 }.to_string(), "2018-2022");
    }

    #[test]
    fn test_unparseable_year_is_dropped() {
        let query = SearchQuery::new("protein folding").year("20x0");
        assert_eq!(query.query, "protein folding");
        assert!(query.year.is_none());

        let query = SearchQuery::new("protein folding").year("2019-2021");
        assert_eq!(query.year, Some(YearFilter::Range { start: 2019, end: 2021 }));
    }

    #[test]
    fn test_search_page_deserialize() {
        let page: SearchPage =
            serde_json::from_str(r#"{"total": 25, "offset": 0, "data": [{"paperId": "a"}]}"#)
                .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].paper_id, "a");
    }
}
