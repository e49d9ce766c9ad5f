//! Line-oriented query loop.

use crate::ranked_hits;
use anyhow::Result;
use querium_core::{RankingEngine, SearchOptions};
use std::io::{BufRead, Write};

pub const EXIT_TOKEN: &str = "quit";

/// Reads one query per line until `quit` (any case) or end of input, printing
/// the ranked hits for each. A failing query is reported and the loop goes on.
pub fn run<R: BufRead, W: Write>(engine: &RankingEngine, options: &SearchOptions, input: R, mut out: W) -> Result<()> {
    let mut lines = input.lines();
    loop {
        write!(out, "Enter your search query (or '{EXIT_TOKEN}' to exit): ")?;
        out.flush()?;
        let Some(line) = lines.next() else { break };
        let query = line?;
        let query = query.trim();
        if query.eq_ignore_ascii_case(EXIT_TOKEN) { break; }
        if query.is_empty() { continue; }

        match ranked_hits(engine, query, options) {
            Ok(hits) => {
                writeln!(out, "Results for '{query}':")?;
                if hits.is_empty() {
                    writeln!(out, "No matching documents.")?;
                }
                for (rank, hit) in hits.iter().enumerate() {
                    writeln!(out, "{}. {}", rank + 1, hit.doc_id)?;
                    writeln!(out, "   Score: {:.6}", hit.score)?;
                    writeln!(out, "   Title: {}", hit.title)?;
                    match hit.page_rank {
                        Some(pr) => writeln!(out, "   PageRank: {pr:.6}")?,
                        None => writeln!(out, "   PageRank: n/a")?,
                    }
                }
                writeln!(out, "---")?;
            }
            Err(e) => {
                tracing::warn!(error = %e, query, "query failed");
                writeln!(out, "Search failed: {e}")?;
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use querium_core::Indexer;
    use std::sync::Arc;

    fn engine() -> RankingEngine {
        let mut indexer = Indexer::new();
        indexer.add_document("https://a.test/", "Cats", "cat dog cat", 0.4).unwrap();
        indexer.add_document("https://b.test/", "Birds", "dog bird", 0.6).unwrap();
        RankingEngine::new(Arc::new(indexer.finalize().unwrap()))
    }

    fn session(input: &str) -> String {
        let mut out = Vec::new();
        run(&engine(), &SearchOptions::default(), input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn prints_rank_id_score_title_and_authority() {
        let out = session("cat\nquit\n");
        assert!(out.contains("Results for 'cat':"));
        assert!(out.contains("1. https://a.test/"));
        assert!(out.contains("Title: Cats"));
        assert!(out.contains("PageRank: 0.400000"));
        assert!(!out.contains("https://b.test/"));
    }

    #[test]
    fn stops_at_exit_token() {
        let out = session("QUIT\ncat\n");
        assert!(!out.contains("Results for"));
    }

    #[test]
    fn stops_at_end_of_input_and_reports_empty_results() {
        let out = session("zeppelin\n");
        assert!(out.contains("No matching documents."));
    }
}
