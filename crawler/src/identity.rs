use anyhow::{anyhow, Result};
use sha1::{Digest, Sha1};
use url::Url;

/// Request headers presented for one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderSet {
    pub user_agent: String,
    pub accept_language: String,
}

impl HeaderSet {
    pub fn new(user_agent: impl Into<String>, accept_language: impl Into<String>) -> Self {
        Self { user_agent: user_agent.into(), accept_language: accept_language.into() }
    }
}

/// Proxy plus headers used for a single attempt. `proxy: None` connects directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub proxy: Option<String>,
    pub headers: HeaderSet,
}

/// Immutable pool the crawl workers draw identities from.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    proxies: Vec<String>,
    header_sets: Vec<HeaderSet>,
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self { proxies: Vec::new(), header_sets: default_header_sets() }
    }
}

impl IdentityPool {
    /// Validates every proxy endpoint. An empty `header_sets` falls back to the built-in list.
    pub fn new(proxies: Vec<String>, header_sets: Vec<HeaderSet>) -> Result<Self> {
        for proxy in &proxies {
            let parsed = Url::parse(proxy).map_err(|e| anyhow!("invalid proxy {proxy:?}: {e}"))?;
            if parsed.host_str().is_none() {
                return Err(anyhow!("proxy {proxy:?} has no host"));
            }
        }
        let header_sets = if header_sets.is_empty() { default_header_sets() } else { header_sets };
        Ok(Self { proxies, header_sets })
    }

    /// Identity for `attempt` (0-based) at `url`.
    ///
    /// Deterministic in its inputs. Consecutive attempts rotate to the next proxy
    /// and the next header set, so a retry never reuses either while the pool
    /// holds more than one.
    pub fn choose(&self, url: &str, attempt: u32) -> Identity {
        let proxy = if self.proxies.is_empty() {
            None
        } else {
            Some(self.proxies[slot(url, "proxy", attempt, self.proxies.len())].clone())
        };
        let headers = self.header_sets[slot(url, "headers", attempt, self.header_sets.len())].clone();
        Identity { proxy, headers }
    }
}

fn slot(url: &str, salt: &str, attempt: u32, len: usize) -> usize {
    let mut hasher = Sha1::new();
    hasher.update(salt.as_bytes());
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let start = u64::from_be_bytes(head) % len as u64;
    ((start + attempt as u64) % len as u64) as usize
}

fn default_header_sets() -> Vec<HeaderSet> {
    vec![
        HeaderSet::new(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            "en-US,en;q=0.9",
        ),
        HeaderSet::new(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
            "en-GB,en;q=0.8",
        ),
        HeaderSet::new(
            "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
            "pt-BR,pt;q=0.9,en;q=0.7",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> IdentityPool {
        IdentityPool::new(
            vec!["http://proxy1.test:8080".into(), "http://proxy2.test:8080".into(), "http://proxy3.test:8080".into()],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn choice_is_deterministic() {
        let pool = pool();
        assert_eq!(pool.choose("https://a.test/", 0), pool.choose("https://a.test/", 0));
    }

    #[test]
    fn retry_uses_different_proxy_and_headers() {
        let pool = pool();
        for url in ["https://a.test/", "https://b.test/page", "https://c.test/?q=1"] {
            let first = pool.choose(url, 0);
            let second = pool.choose(url, 1);
            assert_ne!(first.proxy, second.proxy);
            assert_ne!(first.headers, second.headers);
        }
    }

    #[test]
    fn empty_proxy_list_connects_directly() {
        let identity = IdentityPool::default().choose("https://a.test/", 1);
        assert!(identity.proxy.is_none());
        assert!(!identity.headers.user_agent.is_empty());
    }

    #[test]
    fn rejects_malformed_proxy() {
        assert!(IdentityPool::new(vec!["not a proxy".into()], vec![]).is_err());
    }
}
