use criterion::{criterion_group, criterion_main, Criterion};
use querium_core::tokenizer::{Normalizer, StemmingNormalizer};
use querium_core::{Indexer, RankingEngine, SearchOptions};
use std::sync::Arc;

const TEXT: &str = "PageRank ranks pages by the links pointing at them. \
    BM25 scores documents by how often query terms appear, saturating term \
    frequency and normalizing by document length. Crawlers discover pages \
    breadth first from a set of seed URLs.";

fn bench_normalize(c: &mut Criterion) {
    let normalizer = StemmingNormalizer::default();
    c.bench_function("normalize_paragraph", |b| b.iter(|| normalizer.normalize(TEXT)));
}

fn bench_search(c: &mut Criterion) {
    let mut indexer = Indexer::new();
    for i in 0..500 {
        let body = format!("{TEXT} document number {i} topic{}", i % 17);
        indexer.add_document(&format!("https://bench.test/{i}"), "bench", &body, 0.5).unwrap();
    }
    let engine = RankingEngine::new(Arc::new(indexer.finalize().unwrap()));
    let options = SearchOptions::default();
    c.bench_function("search_500_docs", |b| b.iter(|| engine.search("pagerank query topic3", &options).unwrap()));
}

criterion_group!(benches, bench_normalize, bench_search);
criterion_main!(benches);
