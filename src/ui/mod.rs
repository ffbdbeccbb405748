//! Terminal output for the command-line front end.
//!
//! Colored status lines, the results table and an `indicatif` progress bar
//! that follows a running harvest.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::harvest::{BatchStats, FetchOutcome, HarvestObserver, HarvestSummary, PageCursor};
use crate::models::{Paper, RetrievalResults};
use crate::sources::SourceRegistry;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Icon for a retrieval source id.
pub fn source_icon(source: &str) -> &'static str {
    match source {
        "arxiv" => "📝",
        "pmc" => "📚",
        "pubmed" => "🏥",
        "open_access" => "🔓",
        "doi" => "🔗",
        "local" => "💾",
        _ => "📄",
    }
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Download => "↓",
        Status::Search => "🔍",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Download,
    Search,
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Download => println!("{} {}", icon.magenta(), msg),
        Status::Search => println!("{} {}", icon.yellow(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    n.to_string()
        .chars()
        .rev()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect()
}

/// Truncate text to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Table of retrieved papers, one row per file.
pub fn results_table(results: &RetrievalResults) -> comfy_table::Table {
    use comfy_table::{Attribute, Cell, Table};

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["File", "Title", "Year", "Source"]);

    for (path, meta) in results.iter() {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let title = meta.title.as_deref().unwrap_or(&meta.citation);

        table.add_row(vec![
            Cell::new(file),
            Cell::new(truncate_with_ellipsis(title, 60)).add_attribute(Attribute::Bold),
            Cell::new(meta.year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(format!("{} {}", source_icon(&meta.source), meta.source)),
        ]);
    }

    table
}

/// Table of the registered source chain in execution order.
pub fn sources_table(registry: &SourceRegistry) -> comfy_table::Table {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Priority", "Source", "Name", "Rate limit", "Session"]);

    for entry in registry.ordered() {
        let priority = if entry.priority() == i32::MAX {
            "last".to_string()
        } else {
            entry.priority().to_string()
        };
        let limit = entry
            .rate_limit()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "none".to_string());

        table.add_row(vec![
            Cell::new(priority),
            Cell::new(format!("{} {}", source_icon(entry.id()), entry.id())),
            Cell::new(entry.source().name()),
            Cell::new(limit),
            Cell::new(if entry.requires_session() { "yes" } else { "no" }),
        ]);
    }

    table
}

/// Print the closing summary of a harvest.
pub fn print_summary(summary: &HarvestSummary, retrieved: usize) {
    print_section("Summary");
    println!(
        "  {} papers retrieved ({} attempted, {} unavailable, {} skipped)",
        retrieved.to_string().green().bold(),
        summary.attempted,
        summary.exhausted.to_string().yellow(),
        summary.skipped
    );
    println!(
        "  {} search pages, {} matches reported",
        summary.pages,
        format_number(summary.total_available)
    );
}

/// Progress bar driven by harvest events.
///
/// The bar length is the requested limit; its position is the number of
/// papers held in the result map.
pub struct ProgressObserver {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressObserver {
    pub fn new(limit: usize, verbose: bool) -> Self {
        let bar = ProgressBar::new(limit as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {msg}\n{bar:40.cyan/blue} {pos}/{len} ({elapsed})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .progress_chars("█▓▒░ ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar, verbose }
    }

    /// A progress observer that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            verbose: false,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl HarvestObserver for ProgressObserver {
    fn page_fetched(&self, cursor: &PageCursor, len: usize) {
        let (from, to) = cursor.span(len);
        let total = cursor.total.unwrap_or(0);
        self.bar.set_message(format!(
            "Analyzing papers {} to {} of {}",
            from,
            to,
            format_number(total)
        ));
    }

    fn item_finished(&self, paper: &Paper, outcome: &FetchOutcome) {
        if !self.verbose {
            return;
        }
        let title = truncate_with_ellipsis(paper.title.as_deref().unwrap_or(&paper.paper_id), 60);
        let line = match outcome.source_id() {
            Some(source) => format!(
                "{} {} {}",
                status_icon(Status::Download).magenta(),
                title,
                format!("({})", source).dimmed()
            ),
            None => format!("{} {}", status_icon(Status::Error).red(), title.dimmed()),
        };
        self.bar.println(line);
    }

    fn batch_finished(&self, _stats: &BatchStats, retrieved: usize) {
        self.bar.set_position(retrieved as u64);
    }
}
