//! Error types for the Nightfall engine.

use thiserror::Error;

/// Engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced game, agent, or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller supplied something the rules reject.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Two callers raced on the same transition and this one lost.
    #[error("transition conflict: {0}")]
    Conflict(String),

    /// Persisted state contradicts an engine invariant. The caller gets the
    /// last known-good state; the defect is logged for operators.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
