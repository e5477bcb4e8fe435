//! Failure taxonomy for the response pipeline.
//!
//! Each stage fails with a distinct variant so the caller can decide between
//! degrade, retry, and abort: retrieval failures degrade to a zero-source
//! context, generation failures abort the turn, persistence failures must not
//! discard an already-generated response.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Embedding provider or vector backend unreachable or errored.
    #[error("retrieval failed: {0}")]
    Retrieval(anyhow::Error),

    /// Language-model provider error or timeout. Fatal for the current turn.
    #[error("generation failed: {0}")]
    Generation(anyhow::Error),

    /// Ticket or agent store error. Fatal for ticket creation only.
    #[error("persistence failed: {0}")]
    Persistence(anyhow::Error),

    /// No usable model configuration; the turn cannot proceed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Whether the pipeline can continue the turn after this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Retrieval(_) | Self::Persistence(_))
    }
}
