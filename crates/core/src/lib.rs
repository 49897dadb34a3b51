//! Shared domain types for the MBS agentic RAG pipeline.
//!
//! This crate has no async I/O of its own; it only defines the data that
//! flows between `mbs-rules`, `mbs-facts`, `mbs-verify`, `mbs-reflect`,
//! `mbs-rag`, `mbs-llm`, and `mbs-agent`, plus the `VectorIndex` trait seam
//! those crates share.

pub mod agent_state;
pub mod catalog;
pub mod error;
pub mod facts;
pub mod retriever;
pub mod rule;
pub mod verify;

pub use agent_state::{AgentState, VerifiedItem};
pub use catalog::{parse_catalog_record, CatalogRecord, LegacySchemaRecord, NewSchemaRecord};
pub use error::{Error, Result};
pub use facts::{FirstOrReview, Interval, Modality, NoteFacts, Setting};
pub use retriever::{Document, FilterOp, MetadataFilter, VectorIndex, VectorSearchOptions};
pub use rule::{AgeRange, Condition, ConditionKind, ItemCategory, ItemFlags, ItemRule};
pub use verify::{CheckRecord, Outcome, VerifyReport};
