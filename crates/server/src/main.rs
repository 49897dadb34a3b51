//! Agentic MBS billing-code recommender — server entry point.
//!
//! Grounded on the teacher's `main.rs` (`voice-agent/backend/crates/server`):
//! load layered config, init tracing + metrics, build the long-lived
//! collaborators once, then serve. No persistence layer to initialize —
//! spec Non-goals exclude it.

use std::net::SocketAddr;
use std::sync::Arc;

use mbs_config::{load_settings, Settings};
use mbs_facts::NoOpFactCompleter;
use mbs_llm::{LlmConfig, LlmFactCompleter, LlmQueryRewriter, OllamaBackend};
use mbs_rag::{CatalogIndex, InMemoryVectorIndex, LexicalIndex, QdrantIndexConfig, QdrantVectorIndex, Retriever, RetrieverConfig};
use mbs_reflect::NoOpQueryRewriter;
use mbs_server::{create_router, init_metrics, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("MBS_AGENT_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("warning: failed to load configuration ({e}), using defaults");
            Settings::default()
        }
    };

    init_tracing(&settings);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting mbs-agent-server");

    let metrics_handle = init_metrics();
    tracing::info!(port = settings.observability.metrics_port, "initialized prometheus metrics");

    let llm_endpoint = std::env::var("MBS_AGENT_LLM_ENDPOINT").ok();
    let (fact_completer, query_rewriter): (Arc<dyn mbs_facts::FactCompleter>, Arc<dyn mbs_reflect::QueryRewriter>) =
        match &llm_endpoint {
            Some(endpoint) => {
                let config = LlmConfig { model: settings.chat_model.clone(), endpoint: endpoint.clone(), ..LlmConfig::default() };
                match OllamaBackend::new(config) {
                    Ok(backend) => {
                        let backend: Arc<dyn mbs_llm::LlmBackend> = Arc::new(backend);
                        tracing::info!(endpoint = %endpoint, model = %settings.chat_model, "LLM backend configured");
                        (Arc::new(LlmFactCompleter::new(backend.clone())), Arc::new(LlmQueryRewriter::new(backend)))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "LLM backend init failed, running heuristic-only");
                        (Arc::new(NoOpFactCompleter), Arc::new(NoOpQueryRewriter))
                    }
                }
            }
            None => {
                tracing::warn!("no LLM endpoint configured (MBS_AGENT_LLM_ENDPOINT unset); running heuristic-only");
                (Arc::new(NoOpFactCompleter), Arc::new(NoOpQueryRewriter))
            }
        };

    let router = match std::env::var("MBS_AGENT_QDRANT_URL").ok() {
        Some(endpoint) => {
            let config = QdrantIndexConfig { endpoint, collection: settings.index_name.clone(), ..QdrantIndexConfig::default() };
            match QdrantVectorIndex::connect(config).await {
                Ok(index) => {
                    if let Err(e) = index.ensure_collection().await {
                        tracing::warn!(error = %e, "failed to ensure qdrant collection exists");
                    }
                    tracing::info!(index = %settings.index_name, "connected to qdrant vector index");
                    build_router(Arc::new(index), settings.clone(), fact_completer, query_rewriter, metrics_handle)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "qdrant connect failed, falling back to in-memory index (vector search degraded)");
                    build_router(Arc::new(InMemoryVectorIndex::new()), settings.clone(), fact_completer, query_rewriter, metrics_handle)
                }
            }
        }
        None => {
            tracing::warn!("no vector index backend configured (MBS_AGENT_QDRANT_URL unset); using in-memory index");
            build_router(Arc::new(InMemoryVectorIndex::new()), settings.clone(), fact_completer, query_rewriter, metrics_handle)
        }
    };

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Build the retriever, orchestrator, and router around one concrete index
/// type that implements both `VectorIndex` (the dense search leg) and
/// `CatalogIndex` (the ingest/clear write side) — generic so the in-memory
/// and Qdrant backends share this wiring instead of duplicating it per
/// branch.
fn build_router<I>(
    index: Arc<I>,
    settings: Settings,
    fact_completer: Arc<dyn mbs_facts::FactCompleter>,
    query_rewriter: Arc<dyn mbs_reflect::QueryRewriter>,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> axum::Router
where
    I: mbs_core::VectorIndex + CatalogIndex + 'static,
{
    let dense: Arc<dyn mbs_core::VectorIndex> = index.clone();
    let catalog: Arc<dyn CatalogIndex> = index;

    let mut retriever_config = RetrieverConfig::with_candidate_pool(settings.rerank_candidates);
    retriever_config.enable_llm_reflection_rerank = settings.enable_reflection_llm_rerank;
    retriever_config.reflection_rerank_top = settings.reflection_rerank_top;

    let mut retriever = Retriever::new(dense, retriever_config);
    match LexicalIndex::new() {
        Ok(lexical) => retriever = retriever.with_lexical(Arc::new(lexical)),
        Err(e) => tracing::warn!(error = %e, "lexical index init failed, running dense-only retrieval"),
    }
    let retriever = Arc::new(retriever);

    let orchestrator = Arc::new(mbs_agent::Orchestrator::new(retriever.clone(), fact_completer, query_rewriter));

    let state = AppState::new(settings, retriever, orchestrator, catalog, metrics_handle);
    create_router(state)
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.observability.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if settings.observability.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
