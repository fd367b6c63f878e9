// src/error.rs

use thiserror::Error;

/// Failures the analysis pipeline can report.
///
/// A cleanly exhausted source is not an error; see [`crate::pipeline::StreamOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Rejected at construction time, before any buffer is processed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Upstream I/O or decode failure. Aborts the running stream.
    #[error("source failure: {0}")]
    SourceFailure(String),
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn source(err: impl std::fmt::Display) -> Self {
        Self::SourceFailure(err.to_string())
    }
}
