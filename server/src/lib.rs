use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use termrank_core::persist::{load_meta, IndexPaths};
use termrank_core::store::{reindex, replace_corpus, DocumentStore, Snapshot, TermStore};
use termrank_core::tokenizer::words;
use termrank_core::{rank, DocId, Document, IndexConfig, IndexError, TermRecord};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Keep only the first `k` results; all documents are returned when absent
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    /// Documents with a score above zero
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub content: String,
    pub highlighted: String,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub num_docs: usize,
    pub num_terms: usize,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
    /// The corpus could not be indexed (empty corpus, duplicate ids, bad config)
    Unprocessable(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::StorageUnavailable(_) => ApiError::ServiceUnavailable(err.to_string()),
            IndexError::EmptyCorpus
            | IndexError::EmptyVocabulary
            | IndexError::DuplicateDocument(_)
            | IndexError::InvalidConfig(_) => ApiError::Unprocessable(err.to_string()),
        }
    }
}

/// Shared server state. Queries work on an `Arc` snapshot of the fitted index;
/// a rebuild fits a new snapshot and swaps it in under the write lock, so a
/// query never sees a half-built index.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentStore>,
    pub terms: Arc<dyn TermStore>,
    pub config: IndexConfig,
    pub admin_token: Option<String>,
    snapshot: Arc<RwLock<Option<Arc<Snapshot>>>>,
    rebuilding: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(documents: Arc<dyn DocumentStore>, terms: Arc<dyn TermStore>, config: IndexConfig, admin_token: Option<String>) -> Self {
        Self {
            documents,
            terms,
            config,
            admin_token,
            snapshot: Arc::new(RwLock::new(None)),
            rebuilding: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().clone()
    }

    /// Refit from the document store and publish the result. Blocking; one
    /// rebuild runs at a time. A failed rebuild keeps the previous snapshot.
    pub fn rebuild(&self) -> Result<Arc<Snapshot>, IndexError> {
        let _guard = self.rebuilding.lock();
        let snapshot = reindex(self.documents.as_ref(), self.terms.as_ref(), self.config.clone())?;
        Ok(self.publish(snapshot))
    }

    /// Fit `documents`, then store them with their term records and publish.
    /// Nothing is written when the fit fails, so the stores keep matching the
    /// snapshot in service.
    pub fn replace_corpus(&self, documents: Vec<Document>) -> Result<Arc<Snapshot>, IndexError> {
        let _guard = self.rebuilding.lock();
        let snapshot = replace_corpus(self.documents.as_ref(), self.terms.as_ref(), documents, self.config.clone())?;
        Ok(self.publish(snapshot))
    }

    fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write() = Some(snapshot.clone());
        snapshot
    }

    fn require_snapshot(&self) -> Result<Arc<Snapshot>, ApiError> {
        self.snapshot().ok_or_else(|| ApiError::ServiceUnavailable("index has not been built".into()))
    }
}

/// Index settings recorded by the last indexer build, so the server's rebuilds
/// write term records the same way. Defaults when no build has run yet.
pub fn stored_config(paths: &IndexPaths) -> IndexConfig {
    match load_meta(paths) {
        Ok(meta) => {
            tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, created_at = %meta.created_at, "found index metadata");
            meta.config
        }
        Err(e) => {
            tracing::info!(error = %e, "no index metadata, using default settings");
            IndexConfig::default()
        }
    }
}

pub fn build_app(state: AppState) -> Router {
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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/terms/:term", get(term_handler))
        .route("/documents", post(replace_documents))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let snapshot = state.require_snapshot()?;
    let ranked = rank(&params.q, &snapshot.index, &snapshot.documents);
    let total_hits = ranked.iter().filter(|r| r.score > 0.0).count();

    let highlighter = highlighter(&params.q);
    let results = ranked
        .into_iter()
        .take(params.k.unwrap_or(usize::MAX))
        .map(|r| {
            let highlighted = match &highlighter {
                Some(re) => re.replace_all(&r.content, "<em>$0</em>").into_owned(),
                None => r.content.clone(),
            };
            SearchHit { doc_id: r.doc_id, score: r.score, content: r.content, highlighted }
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits, "search");
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<Document>, ApiError> {
    let snapshot = state.require_snapshot()?;
    snapshot
        .document(doc_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id} not found")))
}

pub async fn term_handler(State(state): State<AppState>, Path(term): Path<String>) -> Result<Json<TermRecord>, ApiError> {
    let snapshot = state.require_snapshot()?;
    snapshot
        .index
        .term_record(&term)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("term '{term}' is not in the vocabulary")))
}

/// Case-insensitive whole-word matcher for the normalized query words.
fn highlighter(query: &str) -> Option<regex::Regex> {
    let words = words(query, 1);
    if words.is_empty() {
        return None;
    }
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    regex::RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .ok()
}

// --- Admin endpoints ---
async fn replace_documents(State(state): State<AppState>, headers: HeaderMap, Json(docs): Json<Vec<Document>>) -> Result<Json<RebuildResponse>, ApiError> {
    authorize(&state, &headers)?;
    let worker = state.clone();
    let snapshot = run_blocking(move || worker.replace_corpus(docs)).await?;
    Ok(Json(rebuild_response(&snapshot)))
}

async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<RebuildResponse>, ApiError> {
    authorize(&state, &headers)?;
    let worker = state.clone();
    let snapshot = run_blocking(move || worker.rebuild()).await?;
    Ok(Json(rebuild_response(&snapshot)))
}

async fn run_blocking<F>(f: F) -> Result<Arc<Snapshot>, ApiError>
where
    F: FnOnce() -> Result<Arc<Snapshot>, IndexError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::Internal(format!("rebuild task failed: {e}"))),
    }
}

fn rebuild_response(snapshot: &Snapshot) -> RebuildResponse {
    RebuildResponse { num_docs: snapshot.index.num_docs(), num_terms: snapshot.index.vocabulary().len() }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
