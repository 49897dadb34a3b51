//! Shared application state — grounded on the teacher's `AppState`
//! (`voice-agent/backend/crates/server/src/state.rs` pattern referenced by
//! its `lib.rs`): one cloneable handle threading the config and the
//! long-lived collaborators through every handler via axum's `State`
//! extractor.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use mbs_config::Settings;
use mbs_rag::{CatalogIndex, Retriever};

use crate::auth::check_shared_secret;
use crate::ServerError;

/// Everything a handler needs, cloned cheaply (every field is an `Arc` or
/// `Clone`-able config struct).
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub retriever: Arc<Retriever>,
    pub orchestrator: Arc<mbs_agent::Orchestrator>,
    pub catalog: Arc<dyn CatalogIndex>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        settings: Settings,
        retriever: Arc<Retriever>,
        orchestrator: Arc<mbs_agent::Orchestrator>,
        catalog: Arc<dyn CatalogIndex>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self { settings, retriever, orchestrator, catalog, metrics_handle }
    }

    /// Verify a request-body token against the configured ingest secret
    /// (spec §6: `POST /rag/ingest` "authorized by a shared secret").
    pub fn check_ingest_token(&self, provided: &str) -> Result<(), ServerError> {
        check_shared_secret(self.settings.ingest_token.as_deref(), provided)
    }

    /// Verify a request-body token against the configured clear secret
    /// (spec §6: `POST /rag/clear` "wipes the index namespace").
    pub fn check_clear_token(&self, provided: &str) -> Result<(), ServerError> {
        check_shared_secret(self.settings.clear_token.as_deref(), provided)
    }
}
