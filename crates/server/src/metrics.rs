//! Prometheus metrics exporter — ambient stack per SPEC_FULL.md ("metrics
//! + metrics-exporter-prometheus"), carried regardless of the spec's
//! Non-goals the same way `tracing` is: an observability layer, not a
//! scoped-out feature.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global recorder once at startup; the returned handle is
/// stashed in `AppState` so the `/metrics` handler can render it on demand.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install prometheus recorder")
}

pub async fn metrics_handler(axum::extract::State(state): axum::extract::State<crate::state::AppState>) -> String {
    state.metrics_handle.render()
}
