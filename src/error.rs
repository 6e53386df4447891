//! Error taxonomy for the mining pipeline
//!
//! Failures at the provider/resolver boundary are contained there and
//! logged; they never abort the surrounding refresh cycle.

use thiserror::Error;

/// Errors surfaced by providers, resolvers and the anchor resolver.
#[derive(Debug, Error)]
pub enum MiningError {
    /// A line index exceeded the document's line count. Callers must treat
    /// this as "anchor no longer valid" and drop the candidate.
    #[error("line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    /// The backing document went away mid-cycle.
    #[error("document closed")]
    DocumentClosed,

    /// A provider failed to produce its contribution. Isolated per provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// A resolver failed to produce a label. Isolated per item.
    #[error("resolver error: {0}")]
    Resolver(String),
}

impl MiningError {
    /// Wrap an arbitrary provider failure.
    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }

    /// Wrap an arbitrary resolver failure.
    pub fn resolver(err: impl std::fmt::Display) -> Self {
        Self::Resolver(err.to_string())
    }
}
