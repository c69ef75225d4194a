//! # rulechain
//!
//! An ordered rule-chain engine for reconcile loops: each rule pairs a
//! memoized predicate with an action, and actions raise stop, error and
//! requeue-delay signals that the chain aggregates into a single outcome.
//!
//! ## Features
//!
//! - **Memoized Predicates**: every predicate is computed at most once per run, keyed by identity
//! - **Short-circuit Composition**: `and`/`or`/`not` predicates that never touch children they skip
//! - **Sync & Async Support**: a thread-based [`Chain`] and a future-based [`AsyncChain`]
//! - **Composable Actions**: sequential, parallel and nested sub-chain actions
//! - **Minimum Requeue**: the shortest requested delay wins, across every branch
//!
//! ## Quick Start
//!
//! ```rust
//! use rulechain::sync_prelude::*;
//! use std::time::Duration;
//!
//! let degraded = Predicate::new(|| true);
//! let chain = Chain::new(vec![
//!     Rule::new(degraded, parallel([
//!         requeue(Duration::from_secs(30)),
//!         requeue(Duration::from_secs(5)),
//!     ])),
//!     Rule::always(stop()),
//! ]);
//!
//! let outcome = chain.run();
//! assert!(outcome.is_ok());
//! assert_eq!(outcome.requeue_after, Duration::from_secs(5));
//! ```
//!
//! ## Module Organization
//!
//! - [`sync_impl`]: synchronous actions and chain
//! - [`async_impl`]: asynchronous actions, chain and resource loading
//! - [`prelude`]: shared types (import with `use rulechain::prelude::*`)
//! - [`sync_prelude`]: shared types plus the sync engine
//! - [`async_prelude`]: shared types plus the async engine
//!
//! The composition helpers (`sequential`, `parallel`, `stop`, ...) exist in
//! both engines under the same names, so import one engine's prelude at a time.

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use crate::core::DEFAULT_CHAIN_NAME;
pub use crate::core::context::RunContext;
pub use crate::core::error::ChainError;
pub use crate::core::predicate::{Predicate, PredicateCache, PredicateId};
pub use crate::core::rule::Rule;
pub use crate::core::state::{ErrorPolicy, RunOutcome, RunState};

pub use crate::core::async_impl::{AsyncAction, AsyncActionLogic, AsyncChain, AsyncRule};
pub use crate::core::async_impl::{Reconciler, ResourceLoader, ResourceSlot};
pub use crate::core::sync_impl::{Action, ActionLogic, Chain, SyncRule};

/// The synchronous engine with its composition helpers.
pub mod sync_impl {
    pub use crate::core::sync_impl::*;
}

/// The asynchronous engine with its composition helpers.
pub mod async_impl {
    pub use crate::core::async_impl::*;
}

/// Predicate composition as free functions.
pub mod predicate {
    pub use crate::core::predicate::{always_false, always_true, and, not, or};
}

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// Types shared by both engines.
///
/// # Example
/// ```rust
/// use rulechain::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        ChainError, ErrorPolicy, Predicate, PredicateCache, PredicateId, Rule, RunContext,
        RunOutcome, RunState,
    };
    pub use super::predicate::{always_false, always_true, and, not, or};
    pub use tokio_util::sync::CancellationToken;
}

/// Prelude for synchronous chains.
///
/// # Example
/// ```rust
/// use rulechain::sync_prelude::*;
/// ```
pub mod sync_prelude {
    pub use super::prelude::*;
    pub use super::sync_impl::{
        Action, ActionLogic, Chain, SyncRule, error, parallel, requeue, sequential, stop,
        subchain,
    };
}

/// Prelude for asynchronous chains.
///
/// # Example
/// ```rust
/// use rulechain::async_prelude::*;
/// ```
pub mod async_prelude {
    pub use super::prelude::*;
    pub use super::async_impl::{
        AsyncAction, AsyncActionLogic, AsyncChain, AsyncRule, Reconciler, ResourceLoader,
        ResourceSlot, blocking, error, parallel, parallel_bounded, requeue, sequential, stop,
        subchain,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
