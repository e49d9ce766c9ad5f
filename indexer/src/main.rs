use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use querium_core::persist::save_index;
use querium_core::{Document, Indexer, LinkGraph, PageRankConfig, PageStore, SearchIndex, DEFAULT_AUTHORITY};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

/// One crawled page as written by the crawler.
#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    #[serde(default)]
    title: String,
    body: String,
    #[serde(default)]
    outlinks: BTreeSet<String>,
    page_rank: Option<f64>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a BM25 + PageRank index snapshot from crawl output", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output snapshot file
        #[arg(long, default_value = "./index.json")]
        output: String,
        /// Recompute PageRank from the documents' outlinks instead of using stored scores
        #[arg(long, default_value_t = false)]
        recompute_pagerank: bool,
        /// Damping factor used with --recompute-pagerank
        #[arg(long, default_value_t = 0.85)]
        damping: f64,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, recompute_pagerank, damping } => {
            let page_rank = recompute_pagerank.then(|| PageRankConfig { damping, ..PageRankConfig::default() });
            let index = build_index(Path::new(&input), page_rank.as_ref())?;
            save_index(Path::new(&output), &index).with_context(|| format!("saving {output}"))?;
            tracing::info!(output, "index build complete");
            Ok(())
        }
    }
}

fn build_index(input: &Path, recompute: Option<&PageRankConfig>) -> Result<SearchIndex> {
    let mut docs = Vec::new();
    for file in input_files(input) {
        let before = docs.len();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
        tracing::debug!(file = %file.display(), docs = docs.len() - before, "read input file");
    }

    // Each document id is indexed exactly once; later copies are dropped.
    let mut seen = HashSet::new();
    let total = docs.len();
    docs.retain(|d| seen.insert(d.id.clone()));
    if docs.len() < total {
        tracing::warn!(dropped = total - docs.len(), "skipped duplicate document ids");
    }

    let recomputed = recompute.map(|config| {
        let store: PageStore = docs
            .iter()
            .map(|d| Document { id: d.id.clone(), title: String::new(), body: String::new(), outlinks: d.outlinks.clone() })
            .collect();
        LinkGraph::from_store(&store).pagerank(config)
    });

    let mut indexer = Indexer::new();
    let mut defaulted = 0usize;
    for doc in &docs {
        let authority = match (&recomputed, doc.page_rank) {
            (Some(pr), _) => pr.authority(&doc.id),
            (None, Some(score)) => score,
            (None, None) => {
                defaulted += 1;
                DEFAULT_AUTHORITY
            }
        };
        indexer.add_document(&doc.id, &doc.title, &doc.body, authority)?;
    }
    if defaulted > 0 {
        tracing::warn!(defaulted, "documents without a page_rank got the default authority");
    }
    tracing::info!(num_docs = indexer.len(), "ingested documents");

    let index = indexer.finalize().with_context(|| format!("indexing {}", input.display()))?;
    Ok(index)
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_jsonl(file: &Path, docs: &mut Vec<InputDoc>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed document", file.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<InputDoc>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use querium_core::Error;
    use std::fs;
    use tempfile::tempdir;

    const CRAWL: &str = r#"{"id":"https://a.test/","title":"A","body":"cat dog cat","outlinks":["https://b.test/"],"page_rank":0.4,"timestamp":"2024-01-01T00:00:00Z"}
{"id":"https://b.test/","title":"","body":"dog bird","outlinks":[],"page_rank":0.6}

{"id":"https://a.test/","title":"A again","body":"ignored","page_rank":0.1}
"#;

    #[test]
    fn builds_from_jsonl_and_skips_duplicates() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("crawl.jsonl");
        fs::write(&input, CRAWL).unwrap();
        let index = build_index(&input, None).unwrap();
        assert_eq!(index.total_documents(), 2);
        assert_eq!(index.page_rank("https://a.test/"), Some(0.4));
        assert_eq!(index.title("https://a.test/"), Some("A"));
    }

    #[test]
    fn recomputes_pagerank_from_outlinks() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("crawl.jsonl");
        fs::write(&input, CRAWL).unwrap();
        let index = build_index(&input, Some(&PageRankConfig::default())).unwrap();
        let a = index.page_rank("https://a.test/").unwrap();
        let b = index.page_rank("https://b.test/").unwrap();
        assert!(b > a);
        assert!((a + b - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reads_directories_of_json_and_jsonl() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.json"), r#"[{"id":"https://c.test/","body":"owl"}]"#).unwrap();
        fs::write(dir.path().join("two.jsonl"), CRAWL).unwrap();
        fs::write(dir.path().join("notes.txt"), "not indexed").unwrap();
        let index = build_index(dir.path(), None).unwrap();
        assert_eq!(index.total_documents(), 3);
        assert_eq!(index.page_rank("https://c.test/"), Some(DEFAULT_AUTHORITY));
    }

    #[test]
    fn empty_input_fails_explicitly() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("empty.jsonl");
        fs::write(&input, "\n").unwrap();
        let err = build_index(&input, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyCorpus)));
    }

    #[test]
    fn malformed_line_is_reported() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.jsonl");
        fs::write(&input, "{\"id\": 3}\n").unwrap();
        let err = build_index(&input, None).unwrap_err();
        assert!(err.to_string().contains("bad.jsonl:1"));
    }
}
