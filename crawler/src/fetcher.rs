//! Page retrieval.
//!
//! [`Fetcher`] is the seam between the crawl loop and the network: the loop owns
//! retries and timeouts, a fetcher only performs one attempt with the identity it
//! is given. [`HttpFetcher`] is the reqwest-backed implementation.

use crate::identity::Identity;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, StatusCode, Url};
use scraper::{Html, Node, Selector};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Title, text and links extracted from a successfully fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub status: u16,
    pub title: String,
    pub body: String,
    /// Absolute http(s) links with fragments removed.
    pub links: Vec<String>,
}

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(Page),
    /// HTTP 403.
    Forbidden,
    /// Any other non-success status.
    Status(u16),
    /// Connection, proxy or protocol failure.
    Transport(String),
    Timeout,
    /// Fetched but not indexable (content type, size).
    Skipped(String),
}

impl FetchOutcome {
    /// Failures that earn one retry with a fresh identity.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchOutcome::Forbidden | FetchOutcome::Transport(_) | FetchOutcome::Timeout)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, identity: &Identity) -> FetchOutcome;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, url: &str, identity: &Identity) -> FetchOutcome {
        (**self).fetch(url, identity).await
    }
}

/// reqwest fetcher. Keeps one client per identity so proxies and default
/// headers are configured once.
pub struct HttpFetcher {
    timeout: Duration,
    clients: Mutex<HashMap<Identity, Client>>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, clients: Mutex::new(HashMap::new()) }
    }

    fn client_for(&self, identity: &Identity) -> Result<Client, String> {
        if let Some(client) = self.clients.lock().get(identity) {
            return Ok(client.clone());
        }
        let mut headers = HeaderMap::new();
        let lang = HeaderValue::from_str(&identity.headers.accept_language).map_err(|e| e.to_string())?;
        headers.insert(header::ACCEPT_LANGUAGE, lang);
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"));

        let mut builder = Client::builder()
            .user_agent(identity.headers.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(self.timeout);
        if let Some(proxy) = &identity.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str()).map_err(|e| e.to_string())?);
        }
        let client = builder.build().map_err(|e| e.to_string())?;
        self.clients.lock().insert(identity.clone(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, identity: &Identity) -> FetchOutcome {
        let base = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => return FetchOutcome::Skipped(format!("unparseable url: {e}")),
        };
        let client = match self.client_for(identity) {
            Ok(c) => c,
            Err(e) => return FetchOutcome::Transport(e),
        };

        let resp = match client.get(base.clone()).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return FetchOutcome::Timeout,
            Err(e) => return FetchOutcome::Transport(e.to_string()),
        };
        let status = resp.status();
        if status == StatusCode::FORBIDDEN { return FetchOutcome::Forbidden; }
        if !status.is_success() { return FetchOutcome::Status(status.as_u16()); }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            if let Ok(v) = ct.to_str() {
                if !v.starts_with("text/html") { return FetchOutcome::Skipped(format!("content type {v}")); }
            }
        }
        // Redirects move the base for relative links.
        let final_url = resp.url().clone();
        let bytes = match resp.bytes().await {
            Ok(b) => b,
            Err(e) if e.is_timeout() => return FetchOutcome::Timeout,
            Err(e) => return FetchOutcome::Transport(e.to_string()),
        };
        if bytes.len() > MAX_BODY_BYTES {
            return FetchOutcome::Skipped(format!("body of {} bytes", bytes.len()));
        }
        let html = String::from_utf8_lossy(&bytes);
        FetchOutcome::Page(extract_page(status.as_u16(), &html, &final_url))
    }
}

/// Pulls the title, visible body text and outbound links out of an HTML document.
pub fn extract_page(status: u16, html: &str, base: &Url) -> Page {
    let doc = Html::parse_document(html);
    let sel_title = Selector::parse("title").expect("valid selector");
    let sel_body = Selector::parse("body").expect("valid selector");
    let sel_a = Selector::parse("a[href]").expect("valid selector");

    let title = doc
        .select(&sel_title)
        .next()
        .map(|n| n.text().collect::<String>())
        .unwrap_or_default();
    let title = collapse_whitespace(&title);

    let mut text = String::new();
    if let Some(body) = doc.select(&sel_body).next() {
        for node in body.descendants() {
            let Node::Text(t) = node.value() else { continue };
            let hidden = node.ancestors().any(|a| {
                a.value().as_element().map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript"))
            });
            if !hidden {
                text.push_str(t);
                text.push(' ');
            }
        }
    }

    let mut links = BTreeSet::new();
    for a in doc.select(&sel_a) {
        let Some(href) = a.value().attr("href") else { continue };
        if let Ok(mut u) = base.join(href.trim()) {
            if !u.scheme().starts_with("http") || u.host_str().is_none() { continue; }
            u.set_fragment(None);
            links.insert(u.to_string());
        }
    }

    Page { status, title, body: collapse_whitespace(&text), links: links.into_iter().collect() }
}

fn collapse_whitespace(s: &str) -> String { s.split_whitespace().collect::<Vec<_>>().join(" ") }
