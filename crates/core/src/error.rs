//! Error taxonomy for the screener.

use thiserror::Error;

/// Errors raised by the evaluation pipeline.
///
/// Per-symbol data conditions (`DataMissing`, `DataStale`,
/// `ProviderUnavailable`) are caught by the orchestrator and recorded
/// against that symbol only. `Validation` signals a caller bug and is never
/// swallowed. `NoUsableChain` blocks an entire run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("required field missing: {0}")]
    DataMissing(String),

    #[error("data stale: {0}")]
    DataStale(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("evaluation budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("no usable options chain across the run: {0}")]
    NoUsableChain(String),
}

impl ScanError {
    /// True for errors that are contained to a single symbol rather than
    /// aborting the batch or run.
    #[must_use]
    pub fn is_per_symbol(&self) -> bool {
        matches!(
            self,
            Self::DataMissing(_) | Self::DataStale(_) | Self::ProviderUnavailable(_)
        )
    }
}
