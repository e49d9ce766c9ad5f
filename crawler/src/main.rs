use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crawler::{CrawlConfig, Crawler, HeaderSet, HttpFetcher, IdentityPool};
use querium_core::PageRankConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl breadth-first from seed URLs, score pages with PageRank, write JSONL")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: Option<String>,
    /// Seed URL given directly; may be repeated
    #[arg(long = "start-url")]
    start_urls: Vec<String>,
    /// Output JSONL file path
    #[arg(long, default_value = "./sample_data/crawl.jsonl")]
    output: String,
    /// Maximum number of pages to store
    #[arg(long, default_value_t = 100)]
    max_pages: usize,
    /// Maximum link depth from a seed
    #[arg(long, default_value_t = 3)]
    max_depth: usize,
    /// Concurrency (number of workers)
    #[arg(long, default_value_t = 16)]
    concurrency: usize,
    /// Per-attempt request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// File with proxy endpoints (one per line); direct connections when absent
    #[arg(long)]
    proxies: Option<String>,
    /// User-Agent to rotate through; may be repeated. Built-in browser identities when absent
    #[arg(long = "user-agent")]
    user_agents: Vec<String>,
    /// Accept-Language sent with the custom user agents
    #[arg(long, default_value = "en-US,en;q=0.9")]
    accept_language: String,
    /// PageRank damping factor
    #[arg(long, default_value_t = 0.85)]
    damping: f64,
}

#[derive(Serialize)]
struct OutDoc<'a> {
    id: &'a str,
    title: &'a str,
    body: &'a str,
    outlinks: &'a BTreeSet<String>,
    page_rank: f64,
    timestamp: &'a str,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let mut seeds = args.start_urls.clone();
    if let Some(path) = &args.seeds {
        seeds.extend(read_lines(path)?.into_iter().filter_map(|s| {
            Url::parse(&s).or_else(|_| Url::parse(&format!("https://{}", s))).ok().map(String::from)
        }));
    }
    if seeds.is_empty() { return Err(anyhow!("no valid seeds")); }

    let proxies = match &args.proxies { Some(path) => read_lines(path)?, None => Vec::new() };
    let header_sets = args
        .user_agents
        .iter()
        .map(|ua| HeaderSet::new(ua.clone(), args.accept_language.clone()))
        .collect();
    let identities = IdentityPool::new(proxies, header_sets)?;

    let timeout = Duration::from_secs(args.timeout_secs);
    let config = CrawlConfig {
        max_pages: args.max_pages,
        max_depth: args.max_depth,
        concurrency: args.concurrency,
        timeout,
        page_rank: PageRankConfig { damping: args.damping, ..PageRankConfig::default() },
    };
    let crawler = Crawler::new(HttpFetcher::new(timeout), identities, config);
    let output = crawler.run(&seeds).await?;

    if let Some(dir) = Path::new(&args.output).parent() {
        fs::create_dir_all(dir).ok();
    }
    let mut out = BufWriter::new(File::create(&args.output).with_context(|| format!("creating {}", args.output))?);
    let ts = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let docs = output.store.documents();
    for doc in &docs {
        let rec = OutDoc {
            id: &doc.id,
            title: &doc.title,
            body: &doc.body,
            outlinks: &doc.outlinks,
            page_rank: output.page_rank.authority(&doc.id),
            timestamp: &ts,
        };
        serde_json::to_writer(&mut out, &rec)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(emitted = docs.len(), output = args.output.as_str(), "done");
    Ok(())
}

fn read_lines(path: &str) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') { continue; }
        lines.push(s);
    }
    Ok(lines)
}
