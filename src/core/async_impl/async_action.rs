use crate::core::context::RunContext;
use crate::core::error::ChainError;
use crate::core::sync_impl::action::Action;
use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::panic;
use std::sync::Arc;
use std::time::Duration;

/// Defines the behaviour of an asynchronous action.
///
/// Implementations that wait on I/O should race it against
/// [`RunContext::cancelled`] if they want to honour cancellation.
#[async_trait]
pub trait AsyncActionLogic: Send + Sync + 'static {
    async fn exec(&self, ctx: &RunContext);
}

/// A shareable asynchronous unit of work run by a rule.
#[derive(Clone)]
pub struct AsyncAction(Arc<dyn AsyncActionLogic>);

impl AsyncAction {
    pub fn new<L: AsyncActionLogic>(logic: L) -> Self {
        AsyncAction(Arc::new(logic))
    }

    /// Wraps an async closure. The closure gets its own handle on the context.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        AsyncAction::new(FnLogic(f))
    }

    pub async fn exec(&self, ctx: &RunContext) {
        self.0.exec(ctx).await
    }
}

struct FnLogic<F>(F);

#[async_trait]
impl<F, Fut> AsyncActionLogic for FnLogic<F>
where
    F: Fn(RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn exec(&self, ctx: &RunContext) {
        (self.0)(ctx.clone()).await
    }
}

pub fn stop() -> AsyncAction {
    AsyncAction::from_fn(|ctx| async move { ctx.request_stop() })
}

pub fn error(err: impl Into<ChainError>) -> AsyncAction {
    let err = err.into();
    AsyncAction::from_fn(move |ctx| {
        let err = err.clone();
        async move { ctx.record_error(err) }
    })
}

pub fn requeue(delay: Duration) -> AsyncAction {
    AsyncAction::from_fn(move |ctx| async move { ctx.request_requeue(delay) })
}

/// Runs a synchronous action on tokio's blocking pool.
///
/// A panic inside the action is resumed on the awaiting task.
#[derive(Clone)]
pub struct BlockingLogic {
    action: Action,
}

#[async_trait]
impl AsyncActionLogic for BlockingLogic {
    async fn exec(&self, ctx: &RunContext) {
        let action = self.action.clone();
        let branch_ctx = ctx.clone();
        match tokio::task::spawn_blocking(move || action.exec(&branch_ctx)).await {
            Ok(()) => {}
            Err(join_error) if join_error.is_panic() => panic::resume_unwind(join_error.into_panic()),
            Err(join_error) => {
                log::error!("A blocking action was cancelled: {:?}", join_error);
                ctx.record_error(ChainError::Cancelled);
            }
        }
    }
}

pub fn blocking(action: Action) -> AsyncAction {
    AsyncAction::new(BlockingLogic { action })
}

#[derive(Clone)]
pub struct SequentialLogic {
    actions: Vec<AsyncAction>,
}

#[async_trait]
impl AsyncActionLogic for SequentialLogic {
    async fn exec(&self, ctx: &RunContext) {
        for action in &self.actions {
            action.exec(ctx).await;
        }
    }
}

/// Awaits each action in order.
pub fn sequential<I: IntoIterator<Item = AsyncAction>>(actions: I) -> AsyncAction {
    AsyncAction::new(SequentialLogic {
        actions: actions.into_iter().collect(),
    })
}

const UNBOUNDED: usize = 0;

/// Polls the actions concurrently and completes once all of them have.
#[derive(Clone)]
pub struct ParallelLogic {
    actions: Vec<AsyncAction>,
    max_concurrency: usize,
}

impl ParallelLogic {
    pub fn new(actions: Vec<AsyncAction>) -> Self {
        ParallelLogic {
            actions,
            max_concurrency: UNBOUNDED,
        }
    }

    pub fn with_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        ParallelLogic {
            actions: self.actions,
            max_concurrency,
        }
    }
}

#[async_trait]
impl AsyncActionLogic for ParallelLogic {
    async fn exec(&self, ctx: &RunContext) {
        if self.max_concurrency == UNBOUNDED {
            join_all(self.actions.iter().map(|action| action.exec(ctx))).await;
        } else {
            stream::iter(&self.actions)
                .for_each_concurrent(self.max_concurrency, |action| action.exec(ctx))
                .await;
        }
    }
}

pub fn parallel<I: IntoIterator<Item = AsyncAction>>(actions: I) -> AsyncAction {
    AsyncAction::new(ParallelLogic::new(actions.into_iter().collect()))
}

/// Like [`parallel`], but with at most `max_concurrency` branches in flight.
///
/// # Panics
/// If `max_concurrency` is zero.
pub fn parallel_bounded<I: IntoIterator<Item = AsyncAction>>(
    max_concurrency: usize,
    actions: I,
) -> AsyncAction {
    AsyncAction::new(
        ParallelLogic::new(actions.into_iter().collect()).with_concurrency(max_concurrency),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::ErrorPolicy;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    fn ctx() -> RunContext {
        RunContext::new(ErrorPolicy::default(), CancellationToken::new())
    }

    fn sleeper(ms: u64, log: &Arc<Mutex<Vec<u64>>>) -> AsyncAction {
        let log = log.clone();
        AsyncAction::from_fn(move |_| {
            let log = log.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                log.lock().unwrap().push(ms);
            }
        })
    }

    #[tokio::test]
    async fn test_signal_actions() {
        let ctx = ctx();
        requeue(Duration::from_secs(3)).exec(&ctx).await;
        stop().exec(&ctx).await;
        error("bad").exec(&ctx).await;
        let outcome = ctx.state().outcome();
        assert_eq!(outcome.requeue_after, Duration::from_secs(3));
        assert!(ctx.state().is_stopped());
        assert!(!outcome.is_ok());
    }

    #[tokio::test]
    async fn test_sequential_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        sequential([sleeper(20, &log), sleeper(1, &log), sleeper(5, &log)])
            .exec(&ctx())
            .await;
        assert_eq!(*log.lock().unwrap(), vec![20, 1, 5]);
    }

    #[tokio::test]
    async fn test_parallel_overlaps_branches() {
        let log = Arc::new(Mutex::new(Vec::new()));
        parallel([sleeper(40, &log), sleeper(1, &log)]).exec(&ctx()).await;
        // The short branch finishes first because both were in flight.
        assert_eq!(*log.lock().unwrap(), vec![1, 40]);
    }

    #[tokio::test]
    async fn test_parallel_minimum_delay() {
        let ctx = ctx();
        parallel([requeue(Duration::from_secs(5)), requeue(Duration::from_secs(2))])
            .exec(&ctx)
            .await;
        assert_eq!(ctx.state().requeue_after(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_parallel_bounded_limits_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let branches: Vec<_> = (0..6)
            .map(|_| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                AsyncAction::from_fn(move |_| {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        parallel_bounded(2, branches).exec(&ctx()).await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic(expected = "Max concurrency must be greater than 0")]
    fn test_parallel_bounded_zero_panics() {
        let _ = parallel_bounded(0, [stop()]);
    }

    #[tokio::test]
    async fn test_blocking_runs_sync_action() {
        let ctx = ctx();
        blocking(Action::from_fn(|ctx| {
            std::thread::sleep(Duration::from_millis(2));
            ctx.request_requeue(Duration::from_secs(1));
        }))
        .exec(&ctx)
        .await;
        assert_eq!(ctx.state().requeue_after(), Duration::from_secs(1));
    }

    #[tokio::test]
    #[should_panic(expected = "blocking branch exploded")]
    async fn test_blocking_resumes_panic() {
        blocking(Action::from_fn(|_| panic!("blocking branch exploded")))
            .exec(&ctx())
            .await;
    }
}
