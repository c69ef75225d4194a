use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// An error recorded during a chain run.
///
/// Cloneable so that a prebuilt error action can record the same error on
/// every run; wrapped sources are shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("action failed: {0}")]
    Action(String),

    #[error(transparent)]
    Source(Arc<dyn StdError + Send + Sync + 'static>),

    #[error("failed to load resources: {0}")]
    Load(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("{} errors recorded: [{}]", .0.len(), join(.0))]
    Multiple(Vec<ChainError>),
}

impl ChainError {
    /// Wraps any error type.
    pub fn from_source<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ChainError::Source(Arc::new(err))
    }

    /// Individual errors, flattening [`ChainError::Multiple`].
    pub fn errors(&self) -> Vec<&ChainError> {
        match self {
            ChainError::Multiple(errs) => errs.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }
}

impl From<&str> for ChainError {
    fn from(msg: &str) -> Self {
        ChainError::Action(msg.to_string())
    }
}

impl From<String> for ChainError {
    fn from(msg: String) -> Self {
        ChainError::Action(msg)
    }
}

fn join(errs: &[ChainError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
