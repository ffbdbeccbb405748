//! Integration tests for Paper Scraper
//!
//! These tests drive whole harvests through the public API against mocked
//! Semantic Scholar, DOI resolver and open access hosts.

use mockito::{Matcher, Mock, ServerGuard};
use nonzero_ext::nonzero;
use paper_scraper::harvest::{HarvestError, HarvestRequest, Harvester};
use paper_scraper::models::{Paper, PaperBuilder, PaperMetadata, RetrievalResults, SearchPage, SearchQuery};
use paper_scraper::search::SemanticScholarClient;
use paper_scraper::sources::{
    ArxivSource, DoiSource, LocalSource, MockBehavior, MockSource, OpenAccessSource, PmcSource,
    PubMedSource, SourceOptions, SourceRegistry, LAST_RESORT_PRIORITY,
};
use paper_scraper::utils::RateLimit;
use std::sync::Arc;

const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";

fn fast() -> RateLimit {
    RateLimit::per_second(nonzero!(100u32))
}

fn search_client(server: &ServerGuard) -> Arc<SemanticScholarClient> {
    Arc::new(
        SemanticScholarClient::new(None)
            .with_base_url(server.url())
            .with_rate_limit(fast()),
    )
}

fn page_body(total: usize, papers: Vec<Paper>) -> String {
    serde_json::to_string(&SearchPage::new(total, papers)).unwrap()
}

async fn mock_search(server: &mut ServerGuard, total: usize, papers: Vec<Paper>) -> Mock {
    server
        .mock("GET", "/graph/v1/paper/search")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(page_body(total, papers))
        .create_async()
        .await
}

async fn mock_pdf(server: &mut ServerGuard, path: &str) -> Mock {
    server
        .mock("GET", path)
        .with_header("content-type", "application/pdf")
        .with_body(PDF_BYTES)
        .create_async()
        .await
}

/// The built-in chain with every host pointed at `server`.
fn mocked_chain(server: &ServerGuard) -> SourceRegistry {
    let url = server.url();
    let mut registry = SourceRegistry::new();
    registry
        .register(
            Arc::new(ArxivSource::with_base_url(format!("{}/arxiv", url))),
            SourceOptions::new().priority(1).rate_limit(fast()),
        )
        .register(
            Arc::new(PmcSource::with_base_url(format!("{}/ncbi", url))),
            SourceOptions::new().priority(2).rate_limit(fast()),
        )
        .register(
            Arc::new(PubMedSource::with_base_urls(
                format!("{}/pubmed", url),
                format!("{}/ncbi", url),
            )),
            SourceOptions::new().priority(3).rate_limit(fast()),
        )
        .register(
            Arc::new(OpenAccessSource::new()),
            SourceOptions::new().priority(4).rate_limit(fast()),
        )
        .register(
            Arc::new(DoiSource::new().with_resolver(&format!("{}/doi", url))),
            SourceOptions::new().priority(90).rate_limit(fast()),
        )
        .register(
            Arc::new(LocalSource::new()),
            SourceOptions::new()
                .priority(LAST_RESORT_PRIORITY)
                .without_session(),
        );
    registry
}

fn request(query: &str, dir: &std::path::Path) -> HarvestRequest {
    HarvestRequest::new(SearchQuery::new(query)).directory(dir)
}

#[tokio::test]
async fn test_protein_folding_doi_only() {
    let mut server = mockito::Server::new_async().await;
    let papers = vec![
        PaperBuilder::new("fold1").title("Folding one").doi("10.1/a").build(),
        PaperBuilder::new("fold2").title("Folding two").doi("10.1/b").build(),
        PaperBuilder::new("fold3").title("Folding three").doi("10.1/c").build(),
    ];
    let search = mock_search(&mut server, 3, papers).await;
    mock_pdf(&mut server, "/doi/10.1/a").await;
    mock_pdf(&mut server, "/doi/10.1/b").await;
    server
        .mock("GET", "/doi/10.1/c")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let harvester = Harvester::new(search_client(&server), mocked_chain(&server));

    let harvest = harvester
        .harvest(&request("protein folding", dir.path()).limit(10))
        .await
        .unwrap();

    search.assert_async().await;
    assert_eq!(harvest.results.len(), 2);
    assert_eq!(harvest.summary.exhausted, 1);

    let first = harvest.results.get(&dir.path().join("fold1.pdf")).unwrap();
    assert_eq!(first.source, "doi");
    assert_eq!(first.title.as_deref(), Some("Folding one"));
    assert!(dir.path().join("fold2.pdf").exists());
    assert!(!dir.path().join("fold3.pdf").exists());
}

#[tokio::test]
async fn test_open_access_failure_falls_back_to_doi() {
    let mut server = mockito::Server::new_async().await;
    let papers = vec![
        PaperBuilder::new("gone")
            .open_access(format!("{}/oa/gone.pdf", server.url()))
            .doi("10.1/gone")
            .build(),
        PaperBuilder::new("open")
            .open_access(format!("{}/oa/open.pdf", server.url()))
            .build(),
    ];
    mock_search(&mut server, 2, papers).await;
    server
        .mock("GET", "/oa/gone.pdf")
        .with_status(404)
        .create_async()
        .await;
    mock_pdf(&mut server, "/oa/open.pdf").await;
    mock_pdf(&mut server, "/doi/10.1/gone").await;

    let dir = tempfile::tempdir().unwrap();
    let harvester = Harvester::new(search_client(&server), mocked_chain(&server));

    let harvest = harvester
        .harvest(&request("open access", dir.path()).batch_size(2))
        .await
        .unwrap();

    assert_eq!(harvest.results.len(), 2);
    assert_eq!(
        harvest.results.get(&dir.path().join("gone.pdf")).unwrap().source,
        "doi"
    );
    assert_eq!(
        harvest.results.get(&dir.path().join("open.pdf")).unwrap().source,
        "open_access"
    );
}

#[tokio::test]
async fn test_higher_priority_source_wins() {
    let mut server = mockito::Server::new_async().await;
    mock_search(&mut server, 4, (0..4).map(|i| PaperBuilder::new(format!("p{}", i)).build()).collect()).await;

    let primary = Arc::new(MockSource::new("primary", MockBehavior::Write(PDF_BYTES.to_vec())));
    let backup = Arc::new(MockSource::new("backup", MockBehavior::Write(PDF_BYTES.to_vec())));
    let mut registry = SourceRegistry::new();
    registry
        .register(backup.clone(), SourceOptions::new().priority(2))
        .register(primary.clone(), SourceOptions::new().priority(1));

    let dir = tempfile::tempdir().unwrap();
    let harvest = Harvester::new(search_client(&server), registry)
        .harvest(&request("priority", dir.path()))
        .await
        .unwrap();

    assert_eq!(primary.call_count(), 4);
    assert_eq!(backup.call_count(), 0);
    assert!(harvest.results.iter().all(|(_, meta)| meta.source == "primary"));
}

#[tokio::test]
async fn test_small_total_fetches_one_page() {
    let mut server = mockito::Server::new_async().await;
    let papers = (0..25).map(|i| PaperBuilder::new(format!("p{}", i)).build()).collect();
    let search = server
        .mock("GET", "/graph/v1/paper/search")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(page_body(25, papers))
        .expect(1)
        .create_async()
        .await;

    let none = Arc::new(MockSource::new("none", MockBehavior::NotApplicable));
    let mut registry = SourceRegistry::new();
    registry.register(none.clone(), SourceOptions::new());

    let dir = tempfile::tempdir().unwrap();
    let harvest = Harvester::new(search_client(&server), registry)
        .harvest(&request("rare topic", dir.path()).limit(50).page_size(100))
        .await
        .unwrap();

    search.assert_async().await;
    assert!(harvest.results.is_empty());
    assert_eq!(none.call_count(), 25);
    assert_eq!(harvest.summary.pages, 1);
}

#[tokio::test]
async fn test_preseeded_results_are_kept_and_counted() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("GET", "/graph/v1/paper/search")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(page_body(
            3,
            vec![
                PaperBuilder::new("a").build(),
                PaperBuilder::new("b").build(),
                PaperBuilder::new("c").build(),
            ],
        ))
        .expect(1)
        .create_async()
        .await;

    let source = Arc::new(MockSource::new("mock", MockBehavior::Write(PDF_BYTES.to_vec())));
    let mut registry = SourceRegistry::new();
    registry.register(source.clone(), SourceOptions::new());
    let harvester = Harvester::new(search_client(&server), registry);

    let dir = tempfile::tempdir().unwrap();
    let seeded_path = dir.path().join("a.pdf");
    let mut results = RetrievalResults::new();
    results.insert(
        seeded_path.clone(),
        PaperMetadata::from_paper(&PaperBuilder::new("a").build(), "earlier run"),
    );

    let harvest_request = request("resume", dir.path()).limit(3);
    harvester
        .harvest_into(&harvest_request, &mut results)
        .await
        .unwrap();

    assert_eq!(source.paper_ids(), vec!["b", "c"]);
    assert_eq!(results.len(), 3);
    assert_eq!(results.get(&seeded_path).unwrap().source, "earlier run");

    // A second run with the limit already met does nothing.
    let summary = harvester
        .harvest_into(&harvest_request, &mut results)
        .await
        .unwrap();
    assert_eq!(summary.pages, 0);
    assert_eq!(source.call_count(), 2);
    search.assert_async().await;
}

#[tokio::test]
async fn test_result_count_stays_within_bounds() {
    let mut server = mockito::Server::new_async().await;
    mock_search(&mut server, 12, (0..12).map(|i| PaperBuilder::new(format!("p{}", i)).build()).collect()).await;

    let source = Arc::new(
        MockSource::new("mock", MockBehavior::Write(PDF_BYTES.to_vec()))
            .with_override("p0", MockBehavior::Fail("timeout".to_string()))
            .with_override("p5", MockBehavior::ClaimOnly)
            .with_override("p6", MockBehavior::NotApplicable),
    );
    let mut registry = SourceRegistry::new();
    registry.register(source, SourceOptions::new());

    let dir = tempfile::tempdir().unwrap();
    let harvest = Harvester::new(search_client(&server), registry)
        .harvest(&request("bounds", dir.path()).limit(5).batch_size(4))
        .await
        .unwrap();

    let summary = harvest.summary;
    assert!(harvest.results.len() <= summary.attempted);
    assert_eq!(harvest.results.len(), summary.retrieved);
    // Batches of four: p0..p3 give 3, p4..p7 give 2 more and stop the harvest.
    assert_eq!(summary.attempted, 8);
    assert_eq!(harvest.results.len(), 5);
    for (path, _) in harvest.results.iter() {
        assert!(path.exists(), "{} missing", path.display());
    }
}

#[tokio::test]
async fn test_sources_without_identifiers_make_no_requests() {
    let mut server = mockito::Server::new_async().await;
    mock_search(&mut server, 1, vec![PaperBuilder::new("bare").title("No ids").build()]).await;
    let stray = server
        .mock("GET", Matcher::Regex(r"^/(arxiv|ncbi|pubmed|doi|oa)/".to_string()))
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let harvest = Harvester::new(search_client(&server), mocked_chain(&server))
        .harvest(&request("bare", dir.path()))
        .await
        .unwrap();

    stray.assert_async().await;
    assert!(harvest.results.is_empty());
    assert_eq!(harvest.summary.exhausted, 1);
}

#[tokio::test]
async fn test_search_failure_keeps_partial_results() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/graph/v1/paper/search")
        .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
        .with_header("content-type", "application/json")
        .with_body(page_body(
            300,
            vec![PaperBuilder::new("x").build(), PaperBuilder::new("y").build()],
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/graph/v1/paper/search")
        .match_query(Matcher::UrlEncoded("offset".into(), "100".into()))
        .with_status(500)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let source = Arc::new(MockSource::new("mock", MockBehavior::Write(PDF_BYTES.to_vec())));
    let mut registry = SourceRegistry::new();
    registry.register(source, SourceOptions::new());

    let dir = tempfile::tempdir().unwrap();
    let err = Harvester::new(search_client(&server), registry)
        .harvest(&request("flaky", dir.path()).limit(20))
        .await
        .unwrap_err();

    match err {
        HarvestError::Interrupted { source, partial } => {
            assert!(source.to_string().contains("500"));
            assert_eq!(partial.len(), 2);
            assert!(partial.contains(&dir.path().join("x.pdf")));
        }
        other => panic!("unexpected error: {other}"),
    }
}
