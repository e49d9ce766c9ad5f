use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use querium_core::persist::load_index;
use querium_core::{FieldBoosts, RankingEngine, SearchOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod repl;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_pagerank")]
    pub pagerank: bool,
    /// `title=4,body=3,url=1`
    pub boosts: Option<String>,
}
fn default_k() -> usize { 10 }

/// Largest `k` a single `/search` request may ask for.
pub const MAX_K: usize = 100;
fn default_pagerank() -> bool { true }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub title: String,
    pub page_rank: Option<f64>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: RankingEngine,
}

/// Runs `query` and attaches title and authority to every hit.
pub fn ranked_hits(engine: &RankingEngine, query: &str, options: &SearchOptions) -> querium_core::Result<Vec<SearchHit>> {
    let index = engine.index();
    let hits = engine
        .search(query, options)?
        .into_iter()
        .map(|r| SearchHit {
            title: index.title(&r.doc_id).unwrap_or_default().to_string(),
            page_rank: index.page_rank(&r.doc_id),
            doc_id: r.doc_id,
            score: r.score,
        })
        .collect();
    Ok(hits)
}

pub fn load_engine(index_path: &Path) -> Result<RankingEngine> {
    let index = load_index(index_path)?;
    Ok(RankingEngine::new(Arc::new(index)))
}

pub fn build_app(index_path: &Path) -> Result<Router> {
    let app_state = AppState { engine: load_engine(index_path)? };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    if params.k > MAX_K {
        return Err((StatusCode::BAD_REQUEST, format!("k must be at most {MAX_K}")));
    }
    let field_boosts = match params.boosts.as_deref() {
        Some(raw) => raw.parse::<FieldBoosts>().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => FieldBoosts::default(),
    };
    let options = SearchOptions { top_k: params.k, use_page_rank: params.pagerank, field_boosts };

    let hits = ranked_hits(&state.engine, &params.q, &options).map_err(|e| {
        tracing::error!(error = %e, query = params.q.as_str(), "search failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: hits.len(), results: hits }))
}
