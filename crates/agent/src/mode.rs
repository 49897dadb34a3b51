//! The two operating modes spec §4.6 names.

/// `Deep` runs the full propose → verify → critic → refine_propose loop
/// (bounded to 3 propose rounds total). `Smart` is a single retrieval pass
/// that enhances the query but skips verification entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Deep,
    Smart,
}
