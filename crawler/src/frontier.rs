use parking_lot::Mutex;
use querium_core::store::url_key;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<FrontierEntry>,
    /// Every URL ever admitted, queued or already handed out.
    admitted: HashSet<String>,
    visited: usize,
}

/// Breadth-first work queue shared by all crawl workers.
///
/// All admission goes through one lock: the dedup check, the depth check and the
/// push happen together, so a URL is handed out at most once per crawl.
pub struct Frontier {
    max_depth: usize,
    inner: Mutex<Inner>,
}

impl Frontier {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth, inner: Mutex::new(Inner::default()) }
    }

    pub fn max_depth(&self) -> usize { self.max_depth }

    /// Admits `url` at `depth` unless it is invalid, too deep, or already seen.
    pub fn enqueue(&self, url: &str, depth: usize) -> bool {
        let mut inner = self.inner.lock();
        self.admit(&mut inner, url, depth)
    }

    /// Admits a batch of discovered links under a single lock. Returns how many were queued.
    pub fn enqueue_all<'a, I>(&self, urls: I, depth: usize) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut inner = self.inner.lock();
        urls.into_iter().filter(|url| self.admit(&mut inner, url, depth)).count()
    }

    fn admit(&self, inner: &mut Inner, url: &str, depth: usize) -> bool {
        if depth > self.max_depth { return false; }
        let Some(key) = url_key(url) else { return false };
        if !inner.admitted.insert(key.clone()) { return false; }
        inner.queue.push_back(FrontierEntry { url: key, depth });
        true
    }

    /// Next entry in FIFO order; the URL counts as visited from here on.
    pub fn dequeue(&self) -> Option<FrontierEntry> {
        let mut inner = self.inner.lock();
        let entry = inner.queue.pop_front()?;
        inner.visited += 1;
        Some(entry)
    }

    pub fn len(&self) -> usize { self.inner.lock().queue.len() }

    pub fn is_empty(&self) -> bool { self.inner.lock().queue.is_empty() }

    pub fn visited(&self) -> usize { self.inner.lock().visited }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fifo_order() {
        let f = Frontier::new(3);
        assert!(f.enqueue("https://a.test/1", 0));
        assert!(f.enqueue("https://a.test/2", 1));
        assert!(f.enqueue("https://a.test/3", 0));
        let urls: Vec<String> = std::iter::from_fn(|| f.dequeue()).map(|e| e.url).collect();
        assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
        assert_eq!(f.visited(), 3);
    }

    #[test]
    fn rejects_too_deep_and_invalid() {
        let f = Frontier::new(1);
        assert!(!f.enqueue("https://a.test/deep", 2));
        assert!(!f.enqueue("/relative", 0));
        assert!(!f.enqueue("mailto:x@y.z", 0));
        assert!(f.is_empty());
    }

    #[test]
    fn first_discovery_wins() {
        let f = Frontier::new(5);
        assert!(f.enqueue("https://a.test/x", 1));
        assert!(!f.enqueue("https://a.test/x", 0));
        assert!(!f.enqueue("https://a.test/x#section", 2));
        assert_eq!(f.dequeue(), Some(FrontierEntry { url: "https://a.test/x".into(), depth: 1 }));
        // Visited URLs are never re-admitted.
        assert!(!f.enqueue("https://a.test/x", 1));
        assert!(f.dequeue().is_none());
    }

    #[test]
    fn no_url_is_dequeued_twice() {
        let f = Frontier::new(2);
        let mut seen = HashSet::new();
        let mut rounds = 0;
        f.enqueue("https://a.test/0", 0);
        while let Some(entry) = f.dequeue() {
            assert!(seen.insert(entry.url.clone()), "{} dequeued twice", entry.url);
            assert!(entry.depth <= 2);
            // Every page links back to everything seen so far plus two new pages.
            let next = entry.depth + 1;
            let fresh = [format!("https://a.test/{}", rounds * 2 + 1), format!("https://a.test/{}", rounds * 2 + 2)];
            let links: Vec<&str> = seen.iter().map(String::as_str).chain(fresh.iter().map(String::as_str)).collect();
            f.enqueue_all(links, next);
            rounds += 1;
        }
        assert_eq!(seen.len(), 7);
    }
}
