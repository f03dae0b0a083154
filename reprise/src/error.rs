//! Error types for the replay engine.

use thiserror::Error;

/// Convenience alias for engine results.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised inside the replay engine.
///
/// None of these cross the public cache surface: storage failures read
/// as misses, replay failures abandon the replay, clone failures drop a
/// single recorded step. The cache logs and degrades instead of
/// aborting its host.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serialization or deserialization failure.
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// Filesystem failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A collaborator needed for the operation was not configured.
    #[error("not configured: {0}")]
    NotConfigured(&'static str),
    /// Deterministic replay of a recorded step failed.
    #[error("replay failed: {0}")]
    Replay(String),
    /// The injected action executor reported a failure.
    #[error("executor error: {0}")]
    Executor(String),
    /// The model client reported a failure.
    #[error("model client error: {0}")]
    Model(String),
    /// Page interaction failed.
    #[error("page error: {0}")]
    Page(String),
    /// Generic error message.
    #[error("{0}")]
    Msg(String),
}

impl CacheError {
    /// Create a generic error from any message.
    pub fn msg(msg: impl Into<String>) -> Self {
        CacheError::Msg(msg.into())
    }
}
