//! HTTP handlers — spec §6's full external surface: the two agent-driven
//! recommendation endpoints, single-shot retrieval, catalog maintenance
//! (ingest/clear/refresh), and status/health probes.
//!
//! Grounded on the teacher's `http.rs` (axum router shape, `State`/`Json`
//! extractors, one handler per route, `CorsLayer` built from config).

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mbs_agent::Mode;
use mbs_core::VerifiedItem;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.server.cors_origins, state.settings.server.cors_enabled);

    Router::new()
        .route("/rag/agentic", post(agentic))
        .route("/rag/smart", post(smart))
        .route("/rag/query", post(query))
        .route("/rag/ingest", post(ingest))
        .route("/rag/clear", post(clear))
        .route("/rag/refresh", post(refresh))
        .route("/rag/status", get(status))
        .route("/rag/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (not for production)");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to permissive GET/POST");
        return CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST]);
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect();
    if parsed.is_empty() {
        tracing::warn!("all configured CORS origins were invalid, falling back to permissive");
        return CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST]);
    }

    CorsLayer::new().allow_origin(AllowOrigin::list(parsed)).allow_methods([Method::GET, Method::POST])
}

/// The wire shape every recommendation endpoint returns (spec §6):
/// `{ itemNum, title, match_reason, match_score, fee }`.
#[derive(Debug, Serialize)]
struct ResultItem {
    #[serde(rename = "itemNum")]
    item_num: String,
    title: String,
    match_reason: Option<String>,
    match_score: Option<f32>,
    fee: Option<f64>,
}

impl From<VerifiedItem> for ResultItem {
    fn from(item: VerifiedItem) -> Self {
        Self { item_num: item.code, title: item.display, match_reason: item.match_reason, match_score: item.score, fee: item.fee }
    }
}

fn default_top_n() -> usize {
    5
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    note: String,
    #[serde(default = "default_top_n")]
    top: usize,
}

fn require_non_empty_note(note: &str) -> Result<(), ServerError> {
    if note.trim().is_empty() {
        return Err(ServerError::InvalidRequest("note must not be empty".to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct AgentResponse {
    results: Vec<ResultItem>,
}

/// `POST /rag/agentic` — Deep mode (spec §6).
async fn agentic(State(state): State<AppState>, Json(req): Json<NoteRequest>) -> Result<Json<AgentResponse>, ServerError> {
    require_non_empty_note(&req.note)?;
    let result = state.orchestrator.run(&req.note, req.top, Mode::Deep).await?;
    Ok(Json(AgentResponse { results: result.items.into_iter().map(ResultItem::from).collect() }))
}

#[derive(Debug, Serialize)]
struct SmartResponse {
    results: Vec<ResultItem>,
    mode: &'static str,
}

/// `POST /rag/smart` — Smart mode (spec §6): same body shape, `mode:
/// "smart"` added to the response.
async fn smart(State(state): State<AppState>, Json(req): Json<NoteRequest>) -> Result<Json<SmartResponse>, ServerError> {
    require_non_empty_note(&req.note)?;
    let result = state.orchestrator.run(&req.note, req.top, Mode::Smart).await?;
    Ok(Json(SmartResponse { results: result.items.into_iter().map(ResultItem::from).collect(), mode: "smart" }))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default = "default_top_n")]
    top: usize,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    results: Vec<ResultItem>,
}

/// `POST /rag/query` — single-shot retrieval, no verification (spec §6).
async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Result<Json<QueryResponse>, ServerError> {
    require_non_empty_note(&req.query)?;
    let documents = state.retriever.search(&req.query, req.top, &BTreeSet::new()).await?;
    let results = documents
        .into_iter()
        .map(|doc| ResultItem {
            item_num: doc.id,
            title: doc.content,
            match_reason: Some("Matched by hybrid retrieval and rerank".to_string()),
            match_score: Some(doc.score),
            fee: doc.metadata.get("schedule_fee").and_then(|v| v.as_f64()),
        })
        .collect();
    Ok(Json(QueryResponse { results }))
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    filename: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    ingested: usize,
}

/// `POST /rag/ingest` — authorized by the configured shared secret (spec
/// §6/§7: "ingestion operations fail hard" — a read or parse failure here
/// is a 500, not a best-effort downgrade).
async fn ingest(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> Result<Json<IngestResponse>, ServerError> {
    state.check_ingest_token(&req.token)?;
    let contents = std::fs::read_to_string(&req.filename)
        .map_err(|e| ServerError::Internal(format!("failed to read catalog file {}: {e}", req.filename)))?;
    let count = mbs_rag::ingest_catalog(state.catalog.as_ref(), &contents).await?;
    Ok(Json(IngestResponse { ingested: count }))
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    token: String,
}

/// `POST /rag/clear` — wipes the index namespace (spec §6).
async fn clear(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> Result<StatusCode, ServerError> {
    state.check_clear_token(&req.token)?;
    state.catalog.clear_index().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    filename: Option<String>,
    token: String,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    ingested: usize,
}

/// `POST /rag/refresh` — clear + ingest (spec §6). Authorized by the
/// clear token since the destructive half (wiping the namespace) is what
/// gates this call; a missing `filename` is a no-op ingest, not an error.
async fn refresh(State(state): State<AppState>, Json(req): Json<RefreshRequest>) -> Result<Json<RefreshResponse>, ServerError> {
    state.check_clear_token(&req.token)?;
    state.catalog.clear_index().await?;

    let Some(filename) = req.filename else {
        return Ok(Json(RefreshResponse { ingested: 0 }));
    };

    let contents = std::fs::read_to_string(&filename)
        .map_err(|e| ServerError::Internal(format!("failed to read catalog file {filename}: {e}")))?;
    let count = mbs_rag::ingest_catalog(state.catalog.as_ref(), &contents).await?;
    Ok(Json(RefreshResponse { ingested: count }))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    index_name: String,
    embedding_provider: &'static str,
    reranker_model: Option<String>,
    reflection_llm_rerank_enabled: bool,
    ingest_configured: bool,
    clear_configured: bool,
}

/// `GET /rag/status` — which external services are configured, plus index
/// name and reranker model (spec §6).
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let provider = match state.settings.embedding_provider {
        mbs_config::EmbeddingProvider::Mistral => "mistral",
        mbs_config::EmbeddingProvider::Openai => "openai",
    };
    Json(StatusResponse {
        index_name: state.settings.index_name.clone(),
        embedding_provider: provider,
        reranker_model: state.settings.reranker_model.clone(),
        reflection_llm_rerank_enabled: state.settings.enable_reflection_llm_rerank,
        ingest_configured: state.settings.ingest_token.is_some(),
        clear_configured: state.settings.clear_token.is_some(),
    })
}

/// `GET /rag/health` — liveness probe (spec §6).
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::Document;
    use mbs_facts::NoOpFactCompleter;
    use mbs_rag::{InMemoryVectorIndex, RetrieverConfig};
    use mbs_reflect::NoOpQueryRewriter;

    /// `PrometheusBuilder::install_recorder` panics if a global recorder is
    /// already installed, so every test in this process must share one
    /// handle rather than each calling `init_metrics()`.
    static METRICS_HANDLE: once_cell::sync::Lazy<metrics_exporter_prometheus::PrometheusHandle> =
        once_cell::sync::Lazy::new(crate::metrics::init_metrics);

    fn test_state() -> AppState {
        let index = Arc::new(InMemoryVectorIndex::new());
        index.upsert(Document::new("23", "Professional attendance, at least 20 min and less than 40 min", 0.0).with_metadata("group", "A1"));
        let retriever = Arc::new(mbs_rag::Retriever::new(index.clone(), RetrieverConfig::default()));
        let orchestrator =
            Arc::new(mbs_agent::Orchestrator::new(retriever.clone(), Arc::new(NoOpFactCompleter), Arc::new(NoOpQueryRewriter)));
        AppState::new(mbs_config::Settings::default(), retriever, orchestrator, index, METRICS_HANDLE.clone())
    }

    #[test]
    fn router_builds_with_seeded_state() {
        let _ = create_router(test_state());
    }

    #[tokio::test]
    async fn empty_note_is_rejected() {
        let state = test_state();
        let result = agentic(State(state), Json(NoteRequest { note: "".to_string(), top: 3 })).await;
        assert!(matches!(result, Err(ServerError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn query_endpoint_returns_results() {
        let state = test_state();
        let result = query(State(state), Json(QueryRequest { query: "general practitioner attendance".to_string(), top: 5 })).await.unwrap();
        assert!(!result.0.results.is_empty());
    }

    #[tokio::test]
    async fn ingest_with_no_configured_secret_fails_closed() {
        let state = test_state();
        let result = ingest(State(state), Json(IngestRequest { filename: "nope.jsonl".to_string(), token: "x".to_string() })).await;
        assert!(matches!(result, Err(ServerError::Internal(_))));
    }
}
