//! The seam between a host that fetches domain objects and the chain that
//! reasons about them.
//!
//! The host implements [`ResourceLoader`]; rules capture a [`ResourceSlot`]
//! and read whatever the loader produced for the current reconcile.

use crate::core::async_impl::async_chain::AsyncChain;
use crate::core::error::ChainError;
use crate::core::state::RunOutcome;
use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetches the resources a chain works on, keyed by whatever identifies a
/// reconcile request.
///
/// Objects that may legitimately be absent should be modelled inside
/// `Resources` (for instance as `Option` fields) rather than as errors.
#[async_trait]
pub trait ResourceLoader: Send + Sync + 'static {
    type Key: Send + Sync;
    type Resources: Send + Sync + 'static;
    type Error: StdError + Send + Sync + 'static;

    async fn load(&self, key: &Self::Key) -> Result<Self::Resources, Self::Error>;
}

/// A shared cell holding the resources of the reconcile in progress.
///
/// Empty before the first load and whenever a load fails. Readers get an
/// `Arc` snapshot, so no lock is held while their code runs.
pub struct ResourceSlot<R> {
    inner: Arc<RwLock<Option<Arc<R>>>>,
}

impl<R> Clone for ResourceSlot<R> {
    fn clone(&self) -> Self {
        ResourceSlot {
            inner: self.inner.clone(),
        }
    }
}

impl<R> Default for ResourceSlot<R> {
    fn default() -> Self {
        ResourceSlot {
            inner: Arc::new(RwLock::new(None)),
        }
    }
}

impl<R> ResourceSlot<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, resources: R) {
        *self.write() = Some(Arc::new(resources));
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// The current resources, shared with the slot.
    pub fn snapshot(&self) -> Option<Arc<R>> {
        self.read().clone()
    }

    /// Borrows a snapshot of the current resources for the duration of `f`.
    ///
    /// `f` may set or clear the slot; it keeps seeing the snapshot.
    pub fn with<T>(&self, f: impl FnOnce(Option<&R>) -> T) -> T {
        let snapshot = self.snapshot();
        f(snapshot.as_deref())
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<R>>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<R>>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R: Clone> ResourceSlot<R> {
    pub fn get(&self) -> Option<R> {
        self.snapshot().map(|r| R::clone(&r))
    }
}

/// Loads resources for a key, then runs a chain over them.
pub struct Reconciler<L: ResourceLoader> {
    loader: L,
    slot: ResourceSlot<L::Resources>,
    chain: AsyncChain,
}

impl<L: ResourceLoader> Reconciler<L> {
    /// `build` receives the slot the rules should read resources from.
    pub fn new<F>(loader: L, build: F) -> Self
    where
        F: FnOnce(&ResourceSlot<L::Resources>) -> AsyncChain,
    {
        let slot = ResourceSlot::new();
        let chain = build(&slot);
        Reconciler {
            loader,
            slot,
            chain,
        }
    }

    pub fn chain(&self) -> &AsyncChain {
        &self.chain
    }

    pub fn slot(&self) -> &ResourceSlot<L::Resources> {
        &self.slot
    }

    pub async fn reconcile(&mut self, key: &L::Key) -> RunOutcome {
        self.reconcile_with_token(key, CancellationToken::new()).await
    }

    /// Clears the slot, loads fresh resources and runs the chain.
    ///
    /// A load failure is reported as [`ChainError::Load`] with no requeue
    /// delay, and no rule runs.
    pub async fn reconcile_with_token(
        &mut self,
        key: &L::Key,
        token: CancellationToken,
    ) -> RunOutcome {
        self.slot.clear();
        match self.loader.load(key).await {
            Ok(resources) => self.slot.set(resources),
            Err(err) => {
                log::warn!("chain {}: resource load failed: {}", self.chain.name(), err);
                return RunOutcome::new(Duration::ZERO, Some(ChainError::Load(err.to_string())));
            }
        }
        self.chain.run_with_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::async_impl::async_action::{AsyncAction, requeue};
    use crate::core::predicate::Predicate;
    use crate::core::rule::Rule;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq)]
    struct Deployment {
        replicas: u32,
    }

    #[derive(Debug, Error)]
    #[error("backend unavailable")]
    struct Unavailable;

    struct MapLoader {
        objects: Mutex<HashMap<String, Deployment>>,
        fail: bool,
    }

    #[async_trait]
    impl ResourceLoader for MapLoader {
        type Key = String;
        type Resources = Option<Deployment>;
        type Error = Unavailable;

        async fn load(&self, key: &String) -> Result<Option<Deployment>, Unavailable> {
            if self.fail {
                return Err(Unavailable);
            }
            Ok(self.objects.lock().unwrap().get(key).cloned())
        }
    }

    fn loader(fail: bool) -> MapLoader {
        let mut objects = HashMap::new();
        objects.insert("web".to_string(), Deployment { replicas: 3 });
        objects.insert("idle".to_string(), Deployment { replicas: 0 });
        MapLoader {
            objects: Mutex::new(objects),
            fail,
        }
    }

    fn build(slot: &ResourceSlot<Option<Deployment>>, scaled: Arc<AtomicUsize>) -> AsyncChain {
        let s = slot.clone();
        let running = Predicate::new(move || {
            s.with(|r| r.and_then(|d| d.as_ref()).is_some_and(|d| d.replicas > 0))
        });
        AsyncChain::new(vec![
            Rule::new(
                running,
                AsyncAction::from_fn(move |_| {
                    let scaled = scaled.clone();
                    async move {
                        scaled.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            ),
            Rule::always(requeue(Duration::from_secs(60))),
        ])
        .with_name("deployments")
    }

    #[test]
    fn test_slot_basics() {
        let slot = ResourceSlot::new();
        assert!(!slot.is_loaded());
        slot.set(7u32);
        assert_eq!(slot.get(), Some(7));
        assert_eq!(slot.with(|v| v.map(|n| n * 2)), Some(14));
        slot.clear();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn test_with_can_replace_the_slot() {
        let slot = ResourceSlot::new();
        slot.set(1u32);
        let seen = slot.with(|v| {
            slot.clear();
            slot.set(2);
            v.copied()
        });
        assert_eq!(seen, Some(1));
        assert_eq!(slot.get(), Some(2));
    }

    #[tokio::test]
    async fn test_reconcile_reads_loaded_resources() {
        let scaled = Arc::new(AtomicUsize::new(0));
        let sc = scaled.clone();
        let mut reconciler = Reconciler::new(loader(false), move |slot| build(slot, sc));

        let outcome = reconciler.reconcile(&"web".to_string()).await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.requeue_after, Duration::from_secs(60));
        assert_eq!(scaled.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.slot().get(), Some(Some(Deployment { replicas: 3 })));

        reconciler.reconcile(&"idle".to_string()).await;
        reconciler.reconcile(&"missing".to_string()).await;
        assert_eq!(scaled.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.slot().get(), Some(None));
    }

    #[tokio::test]
    async fn test_load_failure_skips_rules() {
        let scaled = Arc::new(AtomicUsize::new(0));
        let sc = scaled.clone();
        let mut reconciler = Reconciler::new(loader(true), move |slot| build(slot, sc));

        let outcome = reconciler.reconcile(&"web".to_string()).await;
        assert_eq!(outcome.requeue_after, Duration::ZERO);
        assert!(matches!(outcome.error, Some(ChainError::Load(ref m)) if m == "backend unavailable"));
        assert_eq!(scaled.load(Ordering::SeqCst), 0);
        assert!(!reconciler.slot().is_loaded());
    }
}
