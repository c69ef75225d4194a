pub mod async_impl;
pub mod context;
pub mod error;
pub mod predicate;
pub mod rule;
pub mod state;
pub mod sync_impl;

/// Name given to chains built without [`with_name`](sync_impl::Chain::with_name).
pub const DEFAULT_CHAIN_NAME: &str = "chain";
