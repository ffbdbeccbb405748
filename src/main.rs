use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paper_scraper::config::{load_config, Config};
use paper_scraper::harvest::{HarvestError, HarvestRequest, Harvester};
use paper_scraper::models::{RetrievalResults, SearchQuery};
use paper_scraper::sources::SourceRegistry;
use paper_scraper::ui::{self, ProgressObserver, Status};
use paper_scraper::utils::inspect_pdf;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Scraper - Search Semantic Scholar and download paper PDFs
#[derive(Parser, Debug)]
#[command(name = "paper-scraper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search Semantic Scholar and download paper PDFs through a chain of sources", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for papers and download their PDFs
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Number of PDFs to retrieve
        #[arg(long, short)]
        limit: Option<usize>,

        /// Directory to store PDFs in
        #[arg(long, short)]
        dir: Option<PathBuf>,

        /// Publication year or range (e.g. 2020 or 2018-2022)
        #[arg(long, short)]
        year: Option<String>,

        /// Papers retrieved concurrently
        #[arg(long)]
        batch_size: Option<usize>,

        /// Search results requested per page (max 100)
        #[arg(long)]
        page_size: Option<usize>,

        /// Semantic Scholar API key
        #[arg(long)]
        api_key: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List retrieval sources in the order they are tried
    Sources,

    /// Check that files are readable PDFs
    Verify {
        /// Files to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_scraper={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Search {
            query,
            limit,
            dir,
            year,
            batch_size,
            page_size,
            api_key,
            json,
        } => {
            let mut config = config;
            if api_key.is_some() {
                config.api_keys.semantic_scholar = api_key;
            }

            let mut search_query = SearchQuery::new(query);
            if let Some(year) = year.as_deref() {
                search_query = search_query.year(year);
            }

            let mut request =
                HarvestRequest::from_config(search_query, &config.harvest, &config.downloads);
            if let Some(limit) = limit {
                request = request.limit(limit);
            }
            if let Some(dir) = dir {
                request = request.directory(dir);
            }
            if let Some(batch_size) = batch_size {
                request = request.batch_size(batch_size);
            }
            if let Some(page_size) = page_size {
                request = request.page_size(page_size);
            }

            run_search(&config, &request, json, cli.quiet, cli.verbose > 0).await?;
        }

        Commands::Sources => {
            let registry = SourceRegistry::with_defaults(&config);
            println!("{}", ui::sources_table(&registry));
        }

        Commands::Verify { paths } => {
            let mut failed = 0;
            for path in &paths {
                match inspect_pdf(path) {
                    Ok(info) => {
                        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                        ui::print_status(
                            Status::Success,
                            &format!(
                                "{} ({} pages, {})",
                                path.display(),
                                info.pages,
                                ui::format_file_size(size)
                            ),
                        );
                    }
                    Err(e) => {
                        failed += 1;
                        ui::print_status(Status::Error, &e.to_string());
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} files are not readable PDFs", failed, paths.len());
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn run_search(
    config: &Config,
    request: &HarvestRequest,
    json: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    let show_progress = !quiet && !json && ui::is_terminal();
    let progress = Arc::new(if show_progress {
        ProgressObserver::new(request.limit, verbose)
    } else {
        ProgressObserver::hidden()
    });

    let harvester = Harvester::from_config(config)?.observer(progress.clone());

    if !quiet && !json {
        ui::print_status(
            Status::Search,
            &format!("Searching for \"{}\"", request.query.query),
        );
    }

    let outcome = harvester.harvest(request).await;
    progress.finish();

    match outcome {
        Ok(harvest) => {
            output_results(&harvest.results, json)?;
            if !quiet && !json {
                ui::print_summary(&harvest.summary, harvest.results.len());
            }
            Ok(())
        }
        Err(HarvestError::Interrupted { source, partial }) => {
            output_results(&partial, json)?;
            Err(anyhow::Error::new(source).context(format!(
                "Search stopped after {} papers were retrieved",
                partial.len()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn output_results(results: &RetrievalResults, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else if results.is_empty() {
        ui::print_status(Status::Warning, "No papers could be retrieved");
    } else {
        println!("{}", ui::results_table(results));
    }
    Ok(())
}
