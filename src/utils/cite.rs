//! BibTeX cleanup and plain-text citation rendering.
//!
//! Semantic Scholar hands out BibTeX with non-standard entry types such as
//! `@None`, `@JournalArticle` or `@['JournalArticle', 'Review']`. These are
//! mapped back to standard types before the entry is parsed and rendered.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Semantic Scholar publication types and their BibTeX equivalents, checked in order
const ENTRY_TYPES: &[(&str, &str)] = &[
    ("None", "article"),
    ("JournalArticle", "article"),
    ("BookSection", "inbook"),
    ("ConferencePaper", "inproceedings"),
    ("Conference", "inproceedings"),
    ("Article", "article"),
    ("Review", "article"),
    ("Book", "book"),
    ("Dataset", "misc"),
    ("Dissertation", "phdthesis"),
    ("Journal", "article"),
    ("Patent", "patent"),
    ("Preprint", "article"),
    ("Report", "techreport"),
    ("Thesis", "phdthesis"),
    ("WebPage", "misc"),
    ("Plain", "article"),
];

static LIST_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\['([^\]]*)'\]").expect("valid regex"));
static PLAIN_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^{\s]*)\s*\{").expect("valid regex"));

/// A parsed BibTeX entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    /// Field values keyed by lowercase field name, outer braces/quotes removed
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    /// Look up a field by (case-insensitive) name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_lowercase())
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Rewrite Semantic Scholar entry types into standard BibTeX types.
pub fn normalize_bibtex(bibtex: &str) -> String {
    if bibtex.contains("@None") {
        return bibtex.replace("@None", "@article");
    }

    let (entry_type, current) = if let Some(caps) = LIST_TYPE.captures(bibtex) {
        (caps[1].to_string(), caps[0].to_string())
    } else if let Some(caps) = PLAIN_TYPE.captures(bibtex) {
        (caps[1].to_string(), format!("@{}", &caps[1]))
    } else {
        return bibtex.to_string();
    };

    match ENTRY_TYPES
        .iter()
        .find(|(name, _)| entry_type.contains(name))
    {
        Some((_, standard)) => bibtex.replacen(&current, &format!("@{}", standard), 1),
        None => bibtex.to_string(),
    }
}

/// The citation key: the text between the first `{` and the following `,`.
pub fn citation_key(bibtex: &str) -> Option<String> {
    let after_brace = bibtex.split_once('{')?.1;
    let key = after_brace.split(',').next()?.trim();
    (!key.is_empty()).then(|| key.to_string())
}

/// Parse a single BibTeX entry.
pub fn parse_bibtex(bibtex: &str) -> Option<BibEntry> {
    let normalized = normalize_bibtex(bibtex);
    let at = normalized.find('@')?;
    let rest = &normalized[at + 1..];
    let open = rest.find('{')?;
    let entry_type = rest[..open].trim().to_lowercase();
    if entry_type.is_empty() {
        return None;
    }

    let body = &rest[open + 1..];
    let comma = body.find(',')?;
    let key = body[..comma].trim().to_string();
    let fields = parse_fields(&body[comma + 1..])?;

    Some(BibEntry {
        entry_type,
        key,
        fields,
    })
}

fn parse_fields(input: &str) -> Option<BTreeMap<String, String>> {
    let chars: Vec<char> = input.chars().collect();
    let mut fields = BTreeMap::new();
    let mut i = 0;

    loop {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == ',') {
            i += 1;
        }
        if i >= chars.len() || chars[i] == '}' {
            return Some(fields);
        }

        let name_start = i;
        while i < chars.len() && chars[i] != '=' {
            i += 1;
        }
        if i >= chars.len() {
            return None;
        }
        let name: String = chars[name_start..i].iter().collect();
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let value = match chars.get(i)? {
            '{' => {
                let mut depth = 0usize;
                let start = i + 1;
                loop {
                    match chars.get(i)? {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                let value: String = chars[start..i].iter().collect();
                i += 1;
                value
            }
            '"' => {
                let start = i + 1;
                i += 1;
                while chars.get(i)? != &'"' || chars[i - 1] == '\\' {
                    i += 1;
                }
                let value: String = chars[start..i].iter().collect();
                i += 1;
                value
            }
            _ => {
                let start = i;
                while i < chars.len() && chars[i] != ',' && chars[i] != '}' {
                    i += 1;
                }
                chars[start..i].iter().collect::<String>().trim().to_string()
            }
        };

        fields.insert(name.trim().to_lowercase(), strip_braces(&value));
    }
}

fn strip_braces(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join BibTeX `and`-separated authors into "A", "A and B" or "A, B, and C".
fn format_authors(authors: &str) -> String {
    let names: Vec<&str> = authors
        .split(" and ")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    match names.as_slice() {
        [] => String::new(),
        [one] => one.to_string(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

/// Render a BibTeX entry as a one-line plain-text citation.
///
/// Produces "Authors. Title. Venue, Year." when the entry has a title and at
/// least an author or a year; otherwise falls back to the bare title, and to
/// `Ref <key>` when nothing can be parsed.
pub fn format_citation(bibtex: &str, key: &str) -> String {
    let Some(entry) = parse_bibtex(bibtex) else {
        return format!("Ref {}", key);
    };
    let Some(title) = entry.field("title") else {
        return format!("Ref {}", key);
    };

    let authors = entry.field("author").map(format_authors);
    let year = entry.field("year");
    if authors.is_none() && year.is_none() {
        return title.to_string();
    }

    let mut citation = String::new();
    if let Some(authors) = authors {
        citation.push_str(&authors);
        citation.push_str(". ");
    }
    citation.push_str(title.trim_end_matches('.'));
    citation.push('.');

    let venue = entry
        .field("journal")
        .or_else(|| entry.field("booktitle"))
        .or_else(|| entry.field("publisher"));
    match (venue, year) {
        (Some(venue), Some(year)) => citation.push_str(&format!(" {}, {}.", venue, year)),
        (Some(venue), None) => citation.push_str(&format!(" {}.", venue)),
        (None, Some(year)) => citation.push_str(&format!(" {}.", year)),
        (None, None) => {}
    }

    citation
}
