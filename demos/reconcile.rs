//! A complete example showing how to reconcile a resource with rulechain.
//!
//! This example demonstrates:
//! - Implementing a `ResourceLoader` for the host's storage
//! - Building predicates over the loaded resources
//! - Composing sequential, parallel and sub-chain actions
//! - Reading the aggregated requeue delay and error of each run

use async_trait::async_trait;
use rulechain::async_prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Step 1: The resources and where they come from
// ============================================================================

#[derive(Debug, Clone)]
struct Service {
    desired: u32,
    running: u32,
    paused: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("store is offline")]
struct StoreOffline;

/// An in-memory stand-in for whatever the host would query.
struct ServiceStore {
    services: Mutex<HashMap<String, Service>>,
}

#[async_trait]
impl ResourceLoader for ServiceStore {
    type Key = String;
    type Resources = Option<Service>;
    type Error = StoreOffline;

    async fn load(&self, key: &String) -> Result<Option<Service>, StoreOffline> {
        if key == "offline" {
            return Err(StoreOffline);
        }
        Ok(self.services.lock().map_err(|_| StoreOffline)?.get(key).cloned())
    }
}

// ============================================================================
// Step 2: The rules
// ============================================================================

fn build_chain(slot: &ResourceSlot<Option<Service>>) -> AsyncChain {
    let read = |f: fn(&Service) -> bool| {
        let slot = slot.clone();
        Predicate::new(move || slot.with(|s| s.and_then(|s| s.as_ref()).is_some_and(f)))
    };

    let missing = {
        let slot = slot.clone();
        Predicate::new(move || slot.with(|s| s.and_then(|s| s.as_ref()).is_none()))
    };
    let paused = read(|s| s.paused);
    let under = read(|s| s.running < s.desired);
    let over = read(|s| s.running > s.desired);

    // Health checks live in their own chain so their stop cannot end the parent.
    let health = AsyncChain::new(vec![
        Rule::new(
            under.clone(),
            sequential([
                AsyncAction::from_fn(|_| async { println!("[health] below desired count") }),
                requeue(Duration::from_secs(10)),
                stop(),
            ]),
        ),
        Rule::always(requeue(Duration::from_secs(300))),
    ])
    .with_name("health");

    AsyncChain::new(vec![
        Rule::new(missing, sequential([
            AsyncAction::from_fn(|_| async { println!("[service] not found, nothing to do") }),
            stop(),
        ])),
        Rule::new(paused, stop()),
        Rule::new(
            or([under, over]),
            parallel([
                AsyncAction::from_fn(|_| async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    println!("[scale] adjusting replicas");
                }),
                requeue(Duration::from_secs(30)),
            ]),
        ),
        Rule::always(subchain(health)),
    ])
    .with_name("service")
}

// ============================================================================
// Step 3: Run it
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut services = HashMap::new();
    services.insert("web".to_string(), Service { desired: 3, running: 1, paused: false });
    services.insert("batch".to_string(), Service { desired: 2, running: 2, paused: false });
    services.insert("legacy".to_string(), Service { desired: 1, running: 0, paused: true });

    let store = ServiceStore {
        services: Mutex::new(services),
    };
    let mut reconciler = Reconciler::new(store, build_chain);

    for key in ["web", "batch", "legacy", "ghost", "offline"] {
        let outcome = reconciler.reconcile(&key.to_string()).await;
        match outcome.error {
            Some(err) => println!("{key}: failed ({err}), retry immediately"),
            None => println!("{key}: ok, run again in {:?}", outcome.requeue_after),
        }
    }
}
