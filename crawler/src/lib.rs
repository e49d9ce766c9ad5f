pub mod crawl;
pub mod fetcher;
pub mod frontier;
pub mod identity;

pub use crawl::{fetch_with_retry, CrawlConfig, CrawlOutput, CrawlStats, Crawler, FetchReport};
pub use fetcher::{FetchOutcome, Fetcher, HttpFetcher, Page};
pub use frontier::{Frontier, FrontierEntry};
pub use identity::{HeaderSet, Identity, IdentityPool};
