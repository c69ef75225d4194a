use crate::core::context::RunContext;
use crate::core::rule::Rule;
use crate::core::state::{ErrorPolicy, RunOutcome};
use crate::core::sync_impl::action::{Action, ActionLogic};
use crate::core::DEFAULT_CHAIN_NAME;
use tokio_util::sync::CancellationToken;

pub type SyncRule = Rule<Action>;

/// An ordered list of rules evaluated against a fresh predicate cache on
/// every run.
///
/// A chain holds no run state of its own, so one instance may be run
/// repeatedly or from several threads at once.
#[derive(Clone)]
pub struct Chain {
    name: String,
    rules: Vec<SyncRule>,
    policy: ErrorPolicy,
}

impl Chain {
    pub fn new(rules: Vec<SyncRule>) -> Self {
        if rules.is_empty() {
            log::warn!("Chain created without rules, every run will be a no-op.");
        }
        Chain {
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

    pub fn push(&mut self, rule: SyncRule) {
        self.rules.push(rule);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[SyncRule] {
        &self.rules
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Runs the chain with a token nobody else holds.
    pub fn run(&self) -> RunOutcome {
        self.run_with_token(CancellationToken::new())
    }

    pub fn run_with_token(&self, token: CancellationToken) -> RunOutcome {
        self.run_in(&RunContext::new(self.policy, token))
    }

    /// Evaluates the rules in order against `ctx`, halting after the first
    /// executed action that leaves the run stopped or failed.
    pub(crate) fn run_in(&self, ctx: &RunContext) -> RunOutcome {
        log::debug!("chain {}: run started ({} rules)", self.name, self.rules.len());
        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.when.as_ref().is_none_or(|p| ctx.eval(p)) {
                log::trace!("chain {}: rule {} skipped", self.name, index);
                continue;
            }
            log::trace!("chain {}: rule {} matched", self.name, index);
            rule.action.exec(ctx);
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

/// Runs a nested chain with its own cache and state, then folds its error
/// and requeue delay into the caller's run.
#[derive(Clone)]
pub struct SubchainLogic {
    chain: Chain,
}

impl ActionLogic for SubchainLogic {
    fn exec(&self, ctx: &RunContext) {
        let child = ctx.child(self.chain.policy);
        ctx.absorb(self.chain.run_in(&child));
    }
}

pub fn subchain(chain: Chain) -> Action {
    Action::new(SubchainLogic { chain })
}
