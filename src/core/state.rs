use crate::core::error::ChainError;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How concurrent or repeated `record_error` calls within one run resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// The last error recorded under the lock is reported.
    #[default]
    LastWins,
    /// The first error recorded is reported; later ones are dropped.
    FirstWins,
    /// Every recorded error is reported, in the order the lock saw them.
    Collect,
}

/// The result of a chain run, handed back to the host.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Always `true`: the host should schedule the chain again.
    pub requeue: bool,
    /// Minimum delay requested during the run. Zero means as soon as possible.
    pub requeue_after: Duration,
    pub error: Option<ChainError>,
}

impl RunOutcome {
    pub(crate) fn new(requeue_after: Duration, error: Option<ChainError>) -> Self {
        RunOutcome {
            requeue: true,
            requeue_after,
            error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Duration, ChainError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.requeue_after),
        }
    }
}

#[derive(Debug, Default)]
struct StateInner {
    stop: bool,
    errors: Vec<ChainError>,
    requeue_after: Duration,
}

/// Run-scoped stop/error/requeue aggregate.
///
/// Every field sits behind a single lock that is held for one read or write
/// only, never while user code runs.
#[derive(Debug, Default)]
pub struct RunState {
    policy: ErrorPolicy,
    inner: Mutex<StateInner>,
}

impl RunState {
    pub fn new(policy: ErrorPolicy) -> Self {
        RunState {
            policy,
            inner: Mutex::new(StateInner::default()),
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn request_stop(&self) {
        self.lock().stop = true;
        log::trace!("stop requested");
    }

    pub fn record_error(&self, err: ChainError) {
        let mut inner = self.lock();
        match self.policy {
            ErrorPolicy::LastWins => {
                inner.errors.clear();
                inner.errors.push(err);
            }
            ErrorPolicy::FirstWins => {
                if inner.errors.is_empty() {
                    inner.errors.push(err);
                } else {
                    log::debug!("dropping error after the first one was recorded: {}", err);
                }
            }
            ErrorPolicy::Collect => inner.errors.push(err),
        }
    }

    /// Lowers the requeue delay to `delay` if it is nonzero and shorter than
    /// what is already requested. Zero is a no-op.
    pub fn request_requeue(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let mut inner = self.lock();
        if inner.requeue_after.is_zero() || delay < inner.requeue_after {
            log::trace!("requeue after {:?}", delay);
            inner.requeue_after = delay;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stop
    }

    pub fn has_error(&self) -> bool {
        !self.lock().errors.is_empty()
    }

    pub fn requeue_after(&self) -> Duration {
        self.lock().requeue_after
    }

    /// True once stop was requested or an error was recorded.
    pub fn should_halt(&self) -> bool {
        let inner = self.lock();
        inner.stop || !inner.errors.is_empty()
    }

    /// Snapshot of the state as a [`RunOutcome`].
    pub fn outcome(&self) -> RunOutcome {
        let inner = self.lock();
        let error = match inner.errors.len() {
            0 => None,
            1 => inner.errors.first().cloned(),
            _ => Some(ChainError::Multiple(inner.errors.clone())),
        };
        RunOutcome::new(inner.requeue_after, error)
    }

    // Mutations are single assignments, so a poisoned lock still holds a
    // coherent state.
    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
