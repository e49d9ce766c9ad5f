use crate::fetcher::{FetchOutcome, Fetcher};
use crate::frontier::{Frontier, FrontierEntry};
use crate::identity::IdentityPool;
use anyhow::{anyhow, Result};
use querium_core::store::url_key;
use querium_core::{Document, LinkGraph, PageRank, PageRankConfig, PageStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_pages: usize,
    pub max_depth: usize,
    /// Upper bound on concurrent fetches.
    pub concurrency: usize,
    /// Per-attempt bound; a timed-out attempt is retried once like any transport failure.
    pub timeout: Duration,
    pub page_rank: PageRankConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_depth: 3,
            concurrency: 16,
            timeout: Duration::from_secs(10),
            page_rank: PageRankConfig::default(),
        }
    }
}

/// Final outcome of a URL after the retry policy ran.
#[derive(Debug)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub attempts: u32,
}

/// One attempt, then exactly one more with a different identity if the first
/// failed with a forbidden status, a transport error or a timeout.
pub async fn fetch_with_retry<F>(fetcher: &F, identities: &IdentityPool, url: &str, timeout: Duration) -> FetchReport
where
    F: Fetcher + ?Sized,
{
    let mut attempts = 0;
    loop {
        let identity = identities.choose(url, attempts);
        attempts += 1;
        let outcome = match tokio::time::timeout(timeout, fetcher.fetch(url, &identity)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::Timeout,
        };
        if attempts >= 2 || !outcome.is_retryable() {
            return FetchReport { outcome, attempts };
        }
        tracing::debug!(url, ?outcome, proxy = ?identity.proxy, "retrying with a new identity");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub stored: usize,
    pub skipped: usize,
    pub abandoned: usize,
    pub retried: usize,
}

pub struct CrawlOutput {
    pub store: Arc<PageStore>,
    pub page_rank: PageRank,
    pub stats: CrawlStats,
}

enum Visit {
    Stored,
    Skipped,
    Abandoned,
}

pub struct Crawler<F> {
    fetcher: Arc<F>,
    identities: Arc<IdentityPool>,
    config: CrawlConfig,
}

impl<F: Fetcher + 'static> Crawler<F> {
    pub fn new(fetcher: F, identities: IdentityPool, config: CrawlConfig) -> Self {
        Self { fetcher: Arc::new(fetcher), identities: Arc::new(identities), config }
    }

    /// Breadth-first crawl from `start_urls`, then PageRank over what was fetched.
    pub async fn run(&self, start_urls: &[String]) -> Result<CrawlOutput> {
        let frontier = Arc::new(Frontier::new(self.config.max_depth));
        for url in start_urls {
            if !frontier.enqueue(url, 0) {
                tracing::warn!(url = url.as_str(), "ignoring invalid or duplicate seed");
            }
        }
        if frontier.is_empty() {
            return Err(anyhow!("no valid seeds"));
        }
        tracing::info!(
            seeds = frontier.len(),
            max_pages = self.config.max_pages,
            max_depth = self.config.max_depth,
            concurrency = self.config.concurrency,
            "crawl starting"
        );

        let store = Arc::new(PageStore::new());
        let concurrency = self.config.concurrency.max(1);
        let mut stats = CrawlStats::default();
        let mut inflight: JoinSet<(Visit, u32)> = JoinSet::new();

        loop {
            // Fill workers without overshooting the page budget.
            while inflight.len() < concurrency && store.len() + inflight.len() < self.config.max_pages {
                let Some(entry) = frontier.dequeue() else { break };
                let fetcher = self.fetcher.clone();
                let identities = self.identities.clone();
                let frontier = frontier.clone();
                let store = store.clone();
                let timeout = self.config.timeout;
                inflight.spawn(async move {
                    visit(fetcher.as_ref(), &identities, &frontier, &store, entry, timeout).await
                });
            }

            let Some(joined) = inflight.join_next().await else { break };
            match joined {
                Ok((visit, attempts)) => {
                    if attempts > 1 { stats.retried += 1; }
                    match visit {
                        Visit::Stored => {
                            stats.stored += 1;
                            if stats.stored % 100 == 0 {
                                tracing::info!(stored = stats.stored, visited = frontier.visited(), frontier = frontier.len(), "progress");
                            }
                        }
                        Visit::Skipped => stats.skipped += 1,
                        Visit::Abandoned => stats.abandoned += 1,
                    }
                }
                Err(e) => tracing::error!(error = %e, "crawl worker failed"),
            }
        }

        tracing::info!(
            stored = stats.stored,
            skipped = stats.skipped,
            abandoned = stats.abandoned,
            retried = stats.retried,
            visited = frontier.visited(),
            frontier = frontier.len(),
            "crawl halted"
        );

        let graph = LinkGraph::from_store(&store);
        let page_rank = graph.pagerank(&self.config.page_rank);
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            iterations = page_rank.iterations,
            converged = page_rank.converged,
            "computed pagerank"
        );
        Ok(CrawlOutput { store, page_rank, stats })
    }
}

async fn visit<F>(
    fetcher: &F,
    identities: &IdentityPool,
    frontier: &Frontier,
    store: &PageStore,
    entry: FrontierEntry,
    timeout: Duration,
) -> (Visit, u32)
where
    F: Fetcher + ?Sized,
{
    let FrontierEntry { url, depth } = entry;
    let report = fetch_with_retry(fetcher, identities, &url, timeout).await;
    let visit = match report.outcome {
        FetchOutcome::Page(page) => {
            let outlinks: BTreeSet<String> = page.links.iter().filter_map(|l| url_key(l)).collect();
            if depth < frontier.max_depth() {
                let queued = frontier.enqueue_all(outlinks.iter().map(String::as_str), depth + 1);
                tracing::debug!(url = url.as_str(), depth, links = outlinks.len(), queued, "crawled");
            }
            store.insert(Document { id: url, title: page.title, body: page.body, outlinks });
            Visit::Stored
        }
        FetchOutcome::Status(code) => {
            tracing::info!(url = url.as_str(), status = code, "skipping page with non-success status");
            Visit::Skipped
        }
        FetchOutcome::Skipped(reason) => {
            tracing::debug!(url = url.as_str(), reason = reason.as_str(), "skipping page");
            Visit::Skipped
        }
        outcome => {
            tracing::warn!(url = url.as_str(), attempts = report.attempts, ?outcome, "abandoning url");
            Visit::Abandoned
        }
    };
    (visit, report.attempts)
}
