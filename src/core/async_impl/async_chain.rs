use crate::core::DEFAULT_CHAIN_NAME;
use crate::core::async_impl::async_action::{AsyncAction, AsyncActionLogic};
use crate::core::context::RunContext;
use crate::core::rule::Rule;
use crate::core::state::{ErrorPolicy, RunOutcome};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub type AsyncRule = Rule<AsyncAction>;

/// The asynchronous twin of [`Chain`](crate::Chain).
///
/// Rules are still evaluated strictly in order; only actions are awaited.
#[derive(Clone)]
pub struct AsyncChain {
    name: String,
    rules: Vec<AsyncRule>,
    policy: ErrorPolicy,
}

impl AsyncChain {
    pub fn new(rules: Vec<AsyncRule>) -> Self {
        if rules.is_empty() {
            log::warn!("AsyncChain created without rules, every run will be a no-op.");
        }
        AsyncChain {
            name: DEFAULT_CHAIN_NAME.to_string(),
            rules,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn push(&mut self, rule: AsyncRule) {
        self.rules.push(rule);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[AsyncRule] {
        &self.rules
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub async fn run(&self) -> RunOutcome {
        self.run_with_token(CancellationToken::new()).await
    }

    pub async fn run_with_token(&self, token: CancellationToken) -> RunOutcome {
        self.run_in(&RunContext::new(self.policy, token)).await
    }

    pub(crate) async fn run_in(&self, ctx: &RunContext) -> RunOutcome {
        log::debug!("chain {}: run started ({} rules)", self.name, self.rules.len());
        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.when.as_ref().is_none_or(|p| ctx.eval(p)) {
                log::trace!("chain {}: rule {} skipped", self.name, index);
                continue;
            }
            log::trace!("chain {}: rule {} matched", self.name, index);
            rule.action.exec(ctx).await;
            if ctx.state().should_halt() {
                log::debug!("chain {}: halted after rule {}", self.name, index);
                break;
            }
        }
        let outcome = ctx.state().outcome();
        log::debug!(
            "chain {}: run finished, requeue after {:?}, error: {:?}",
            self.name,
            outcome.requeue_after,
            outcome.error
        );
        outcome
    }
}

#[derive(Clone)]
pub struct AsyncSubchainLogic {
    chain: AsyncChain,
}

#[async_trait]
impl AsyncActionLogic for AsyncSubchainLogic {
    async fn exec(&self, ctx: &RunContext) {
        let child = ctx.child(self.chain.policy);
        let outcome = self.chain.run_in(&child).await;
        ctx.absorb(outcome);
    }
}

/// Runs `chain` to completion with its own cache and state, then folds its
/// error and requeue delay into the caller's run.
pub fn subchain(chain: AsyncChain) -> AsyncAction {
    AsyncAction::new(AsyncSubchainLogic { chain })
}
