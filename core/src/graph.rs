use crate::store::{is_valid_url, Document, PageStore};
use std::collections::{BTreeSet, HashMap};

/// Authority assigned to a document the PageRank run did not score.
pub const DEFAULT_AUTHORITY: f64 = 0.85;

#[derive(Debug, Clone, Copy)]
pub struct PageRankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    /// Per-node L1 tolerance; iteration stops once the total delta is below `n * tolerance`.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self { damping: 0.85, max_iterations: 100, tolerance: 1e-6 }
    }
}

/// Directed link graph over a crawled corpus.
///
/// Nodes are every fetched document plus every valid outlink target; targets that
/// were never fetched have no outgoing edges (dangling nodes). Node ids follow
/// ascending URL order.
#[derive(Debug, Default)]
pub struct LinkGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    out: Vec<Vec<usize>>,
}

impl LinkGraph {
    pub fn from_documents<'a, I>(docs: I) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let docs: Vec<&Document> = docs.into_iter().collect();
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for doc in &docs {
            names.insert(doc.id.as_str());
            names.extend(doc.outlinks.iter().map(String::as_str).filter(|l| is_valid_url(l)));
        }
        let nodes: Vec<String> = names.into_iter().map(str::to_string).collect();
        let index: HashMap<String, usize> = nodes.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();

        let mut out = vec![Vec::new(); nodes.len()];
        for doc in docs {
            let from = index[&doc.id];
            let targets: BTreeSet<usize> = doc.outlinks.iter().filter_map(|l| index.get(l).copied()).collect();
            out[from] = targets.into_iter().collect();
        }
        Self { nodes, index, out }
    }

    pub fn from_store(store: &PageStore) -> Self {
        let docs = store.documents();
        Self::from_documents(docs.iter())
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn edge_count(&self) -> usize { self.out.iter().map(Vec::len).sum() }

    pub fn contains(&self, url: &str) -> bool { self.index.contains_key(url) }

    pub fn outdegree(&self, url: &str) -> Option<usize> { self.index.get(url).map(|&i| self.out[i].len()) }

    /// Power-iteration PageRank. Mass held by dangling nodes is spread uniformly
    /// over all nodes every iteration, so scores always sum to one.
    pub fn pagerank(&self, config: &PageRankConfig) -> PageRank {
        let n = self.nodes.len();
        if n == 0 {
            return PageRank { scores: HashMap::new(), iterations: 0, converged: true };
        }
        let d = config.damping;
        let nf = n as f64;
        let mut x = vec![1.0 / nf; n];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < config.max_iterations {
            iterations += 1;
            let dangling: f64 = (0..n).filter(|&i| self.out[i].is_empty()).map(|i| x[i]).sum();
            let base = (1.0 - d) / nf + d * dangling / nf;
            let mut next = vec![base; n];
            for (u, targets) in self.out.iter().enumerate() {
                if targets.is_empty() { continue; }
                let share = d * x[u] / targets.len() as f64;
                for &v in targets { next[v] += share; }
            }
            let delta: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
            x = next;
            if delta < nf * config.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            tracing::debug!(nodes = n, iterations, "pagerank converged");
        } else {
            tracing::warn!(nodes = n, iterations, "pagerank hit the iteration cap before converging");
        }
        let scores = self.nodes.iter().cloned().zip(x).collect();
        PageRank { scores, iterations, converged }
    }
}

#[derive(Debug, Clone)]
pub struct PageRank {
    scores: HashMap<String, f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl PageRank {
    pub fn get(&self, url: &str) -> Option<f64> { self.scores.get(url).copied() }

    /// Score for `url`, or [`DEFAULT_AUTHORITY`] when the run did not include it.
    pub fn authority(&self, url: &str) -> f64 { self.get(url).unwrap_or(DEFAULT_AUTHORITY) }

    pub fn len(&self) -> usize { self.scores.len() }

    pub fn is_empty(&self) -> bool { self.scores.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, links: &[&str]) -> Document {
        Document {
            id: id.into(),
            title: String::new(),
            body: String::new(),
            outlinks: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    const A: &str = "https://a.test/";
    const B: &str = "https://b.test/";
    const C: &str = "https://c.test/";

    #[test]
    fn chain_with_dangling_tail() {
        let docs = vec![doc(A, &[B]), doc(B, &[C]), doc(C, &[])];
        let graph = LinkGraph::from_documents(&docs);
        assert_eq!(graph.outdegree(C), Some(0));

        let pr = graph.pagerank(&PageRankConfig::default());
        assert!(pr.converged);
        assert!(pr.iterations <= 100);

        let (a, b, c) = (pr.authority(A), pr.authority(B), pr.authority(C));
        // Fixed point with C's mass redistributed uniformly:
        // a = t, b = 1.85t, c = 2.5725t with t = 0.05 / 0.271125.
        let t = 0.05 / 0.271125;
        assert!((a - t).abs() < 1e-4);
        assert!((b - 1.85 * t).abs() < 1e-4);
        assert!((c - 2.5725 * t).abs() < 1e-4);
        assert!(c > b && b > a);
        assert!((a + b + c - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unfetched_targets_become_dangling_nodes() {
        let docs = vec![doc(A, &[B, "not a url"])];
        let graph = LinkGraph::from_documents(&docs);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains("not a url"));
        assert_eq!(graph.outdegree(B), Some(0));
    }

    #[test]
    fn missing_documents_get_default_authority() {
        let pr = LinkGraph::default().pagerank(&PageRankConfig::default());
        assert!(pr.is_empty());
        assert_eq!(pr.authority(A), DEFAULT_AUTHORITY);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let docs = vec![doc(A, &[B]), doc(B, &[A, C])];
        let config = PageRankConfig { max_iterations: 1, tolerance: 0.0, ..PageRankConfig::default() };
        let pr = LinkGraph::from_documents(&docs).pagerank(&config);
        assert!(!pr.converged);
        assert_eq!(pr.iterations, 1);
    }
}
