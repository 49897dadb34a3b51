//! Fact Extractor — spec §4.2.
//!
//! A deterministic heuristic pass (`extract`) that always runs, plus an
//! optional LLM completion seam (`completer`) for fields the heuristics
//! couldn't determine.

pub mod completer;
pub mod extract;

pub use completer::{extract_with_completion, merge_facts, FactCompleter, NoOpFactCompleter};
pub use extract::extract_facts;
