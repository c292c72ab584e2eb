//! Error types for geoprof-ingest

use crate::types::{FetchError, SourceFamily};
use thiserror::Error;

/// Pipeline error: a place-scoped failure from the shared taxonomy, or a
/// fetch failure from one of the source clients
#[derive(Debug, Error)]
pub enum IngestError {
    /// A source client failed to deliver rows or a no-data signal
    #[error("fetch error from {family} source: {source}")]
    Fetch {
        family: SourceFamily,
        #[source]
        source: FetchError,
    },

    /// Shared geoprof error taxonomy
    #[error(transparent)]
    Common(#[from] geoprof_common::Error),
}

impl IngestError {
    /// Short failure-kind name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Fetch { .. } => "Fetch",
            IngestError::Common(e) => e.kind(),
        }
    }
}

/// Result type for pipeline operations
pub type IngestResult<T> = Result<T, IngestError>;
