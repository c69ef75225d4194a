use crate::core::context::RunContext;
use crate::core::error::ChainError;
use std::panic;
use std::sync::Arc;
use std::time::Duration;

/// Defines the behaviour of a synchronous action.
pub trait ActionLogic: Send + Sync + 'static {
    fn exec(&self, ctx: &RunContext);
}

/// A shareable unit of work run by a rule.
#[derive(Clone)]
pub struct Action(Arc<dyn ActionLogic>);

impl Action {
    pub fn new<L: ActionLogic>(logic: L) -> Self {
        Action(Arc::new(logic))
    }

    /// Wraps a closure as an action.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RunContext) + Send + Sync + 'static,
    {
        Action::new(FnLogic(f))
    }

    pub fn exec(&self, ctx: &RunContext) {
        self.0.exec(ctx)
    }
}

struct FnLogic<F>(F);

impl<F> ActionLogic for FnLogic<F>
where
    F: Fn(&RunContext) + Send + Sync + 'static,
{
    fn exec(&self, ctx: &RunContext) {
        (self.0)(ctx)
    }
}

/// An action that halts the run after the current rule.
pub fn stop() -> Action {
    Action::from_fn(|ctx| ctx.request_stop())
}

/// An action that records `err` on the run.
pub fn error(err: impl Into<ChainError>) -> Action {
    let err = err.into();
    Action::from_fn(move |ctx| ctx.record_error(err.clone()))
}

/// An action that asks for the chain to run again no earlier than `delay`.
pub fn requeue(delay: Duration) -> Action {
    Action::from_fn(move |ctx| ctx.request_requeue(delay))
}

/// Runs each action in order on the calling thread.
#[derive(Clone)]
pub struct SequentialLogic {
    actions: Vec<Action>,
}

impl ActionLogic for SequentialLogic {
    fn exec(&self, ctx: &RunContext) {
        for action in &self.actions {
            action.exec(ctx);
        }
    }
}

pub fn sequential<I: IntoIterator<Item = Action>>(actions: I) -> Action {
    Action::new(SequentialLogic {
        actions: actions.into_iter().collect(),
    })
}

/// Runs every action on its own scoped thread and joins them all.
///
/// A panicking branch is re-raised on the caller once it is joined.
#[derive(Clone)]
pub struct ParallelLogic {
    actions: Vec<Action>,
}

impl ActionLogic for ParallelLogic {
    fn exec(&self, ctx: &RunContext) {
        std::thread::scope(|s| {
            let handles: Vec<_> = self
                .actions
                .iter()
                .map(|action| s.spawn(move || action.exec(ctx)))
                .collect();
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }
        });
    }
}

pub fn parallel<I: IntoIterator<Item = Action>>(actions: I) -> Action {
    Action::new(ParallelLogic {
        actions: actions.into_iter().collect(),
    })
}
