//! HTTP surface for the agentic MBS billing-code recommender — spec §6.
//!
//! Everything outside this crate (auth details aside) is an internal
//! collaborator: the router wires `POST /rag/agentic`/`smart` to the
//! `mbs-agent` orchestrator, `POST /rag/query` to the bare `mbs-rag`
//! retriever, and the catalog-maintenance endpoints to a `CatalogIndex`.

pub mod auth;
pub mod metrics;
pub mod routes;
pub mod state;

pub use metrics::init_metrics;
pub use routes::create_router;
pub use state::AppState;

mod error;
pub use error::ServerError;
