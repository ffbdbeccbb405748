//! Batched, concurrent retrieval of one search page.

use futures_util::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::executor::FallbackExecutor;
use super::HarvestObserver;
use crate::models::{Paper, PaperMetadata, RetrievalResults};

/// Counters for the batches run over one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batches: usize,
    pub attempted: usize,
    pub retrieved: usize,
    pub exhausted: usize,
    pub skipped: usize,
}

/// Runs a page of papers through the executor in fixed-size batches.
///
/// All papers of a batch are polled concurrently on the current task and the
/// whole batch is awaited before its results are merged. No batch starts once
/// the result map has reached the limit; a batch that has started always
/// runs to completion, so the map may overshoot by at most one batch.
pub struct BatchCoordinator<'a> {
    executor: FallbackExecutor<'a>,
    observer: &'a dyn HarvestObserver,
    batch_size: usize,
    limit: usize,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(
        executor: FallbackExecutor<'a>,
        observer: &'a dyn HarvestObserver,
        batch_size: usize,
        limit: usize,
    ) -> Self {
        Self {
            executor,
            observer,
            batch_size: batch_size.max(1),
            limit,
        }
    }

    /// Retrieve `papers` into `directory`, recording successes in `results`.
    pub async fn run(
        &self,
        papers: &[Paper],
        directory: &Path,
        results: &mut RetrievalResults,
    ) -> BatchStats {
        let mut stats = BatchStats::default();
        let pending = Self::pending(papers, directory, results, &mut stats);

        for batch in pending.chunks(self.batch_size) {
            if results.len() >= self.limit {
                break;
            }

            let outcomes = join_all(batch.iter().map(|(paper, destination)| async move {
                let outcome = self.executor.fetch(paper, destination).await;
                self.observer.item_finished(paper, &outcome);
                outcome
            }))
            .await;

            stats.batches += 1;
            let mut batch_stats = BatchStats {
                batches: 1,
                ..Default::default()
            };
            for ((paper, destination), outcome) in batch.iter().zip(outcomes) {
                batch_stats.attempted += 1;
                match outcome.source_id() {
                    Some(source_id) => {
                        let metadata = PaperMetadata::from_paper(paper, source_id);
                        if results.insert(destination.clone(), metadata) {
                            batch_stats.retrieved += 1;
                        }
                    }
                    None => batch_stats.exhausted += 1,
                }
            }

            stats.attempted += batch_stats.attempted;
            stats.retrieved += batch_stats.retrieved;
            stats.exhausted += batch_stats.exhausted;
            self.observer.batch_finished(&batch_stats, results.len());
        }

        stats
    }

    /// Papers still worth dispatching, paired with their destination.
    ///
    /// Papers without an id, papers whose path already has a result and
    /// repeats within the page are skipped.
    fn pending<'p>(
        papers: &'p [Paper],
        directory: &Path,
        results: &RetrievalResults,
        stats: &mut BatchStats,
    ) -> Vec<(&'p Paper, PathBuf)> {
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(papers.len());

        for paper in papers {
            if paper.paper_id.trim().is_empty() {
                tracing::debug!("Skipping search result without a paper id");
                stats.skipped += 1;
                continue;
            }

            let destination = directory.join(paper.pdf_file_name());
            if results.contains(&destination) || !seen.insert(destination.clone()) {
                stats.skipped += 1;
                continue;
            }
            pending.push((paper, destination));
        }

        pending
    }
}
