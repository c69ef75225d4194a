//! Asynchronous implementation of the rule-chain engine.
//!
//! - [`AsyncAction`] and [`AsyncActionLogic`] for async rule actions
//! - [`AsyncChain`] for evaluating an ordered rule list
//! - [`sequential`], [`parallel`], [`parallel_bounded`], [`subchain`] and
//!   [`blocking`] for composing actions
//! - [`Reconciler`], [`ResourceLoader`] and [`ResourceSlot`] for running a
//!   chain over freshly loaded resources

pub mod async_action;
pub mod async_chain;
pub mod loader;

pub use async_action::{
    AsyncAction, AsyncActionLogic, blocking, error, parallel, parallel_bounded, requeue,
    sequential, stop,
};
pub use async_chain::{AsyncChain, AsyncRule, subchain};
pub use loader::{Reconciler, ResourceLoader, ResourceSlot};
