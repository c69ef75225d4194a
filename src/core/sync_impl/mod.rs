//! Synchronous implementation of the rule-chain engine.
//!
//! - [`Action`] and [`ActionLogic`] for the work a rule performs
//! - [`Chain`] for evaluating an ordered rule list
//! - [`sequential`], [`parallel`] and [`subchain`] for composing actions
//!
//! Parallel branches run on scoped OS threads.

pub mod action;
pub mod chain;

pub use action::{Action, ActionLogic, error, parallel, requeue, sequential, stop};
pub use chain::{Chain, SyncRule, subchain};
