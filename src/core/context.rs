use crate::core::error::ChainError;
use crate::core::predicate::{Predicate, PredicateCache};
use crate::core::state::{ErrorPolicy, RunOutcome, RunState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything an action or predicate can touch during one run.
///
/// Cheap to clone: the cache, the run state and the cancellation token are
/// shared with every branch spawned by a parallel action. A sub-chain gets a
/// context of its own.
#[derive(Debug, Clone)]
pub struct RunContext {
    cache: Arc<PredicateCache>,
    state: Arc<RunState>,
    token: CancellationToken,
}

impl RunContext {
    /// A fresh cache and a reset state for a new run.
    pub fn new(policy: ErrorPolicy, token: CancellationToken) -> Self {
        RunContext {
            cache: Arc::new(PredicateCache::new()),
            state: Arc::new(RunState::new(policy)),
            token,
        }
    }

    /// Context for a nested chain: independent cache and state, cancelled
    /// together with this one.
    pub fn child(&self, policy: ErrorPolicy) -> Self {
        Self::new(policy, self.token.child_token())
    }

    pub fn eval(&self, pred: &Predicate) -> bool {
        self.cache.eval(pred)
    }

    pub fn cache(&self) -> &PredicateCache {
        &self.cache
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn request_stop(&self) {
        self.state.request_stop();
    }

    pub fn record_error(&self, err: impl Into<ChainError>) {
        self.state.record_error(err.into());
    }

    pub fn request_requeue(&self, delay: Duration) {
        self.state.request_requeue(delay);
    }

    /// Folds a nested run's outcome into this run. The child's stop flag
    /// stays with the child.
    pub fn absorb(&self, outcome: RunOutcome) {
        if let Some(err) = outcome.error {
            self.record_error(err);
        }
        self.request_requeue(outcome.requeue_after);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Records [`ChainError::Cancelled`] if the caller cancelled the run and
    /// returns whether it did.
    pub fn check_cancelled(&self) -> bool {
        let cancelled = self.is_cancelled();
        if cancelled {
            self.record_error(ChainError::Cancelled);
        }
        cancelled
    }

    /// Resolves when the caller cancels the run.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
