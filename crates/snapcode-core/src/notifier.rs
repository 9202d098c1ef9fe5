//! Credential change notifications
//!
//! Payload-less "the active key may have changed, resolve again" signal.
//! Observers run synchronously inside `notify()`, so by the time a vault
//! operation returns every observer has seen the event. Dropping the
//! `Subscription` unsubscribes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use tracing::debug;

type Observer = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    observers: Mutex<BTreeMap<u64, Observer>>,
}

#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Registry>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide notifier
    pub fn global() -> &'static ChangeNotifier {
        static GLOBAL: OnceLock<ChangeNotifier> = OnceLock::new();
        GLOBAL.get_or_init(ChangeNotifier::new)
    }

    /// Register an observer for as long as the returned guard lives.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut observers) = self.registry.observers.lock() {
            observers.insert(id, Arc::new(observer));
        }
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every current observer once. No-op without observers.
    pub fn notify(&self) {
        // Snapshot first: an observer may subscribe or unsubscribe while running
        let snapshot: Vec<Observer> = match self.registry.observers.lock() {
            Ok(observers) => observers.values().cloned().collect(),
            Err(_) => return,
        };
        debug!(observers = snapshot.len(), "credential change");
        for observer in snapshot {
            observer();
        }
    }

    pub fn observer_count(&self) -> usize {
        self.registry.observers.lock().map(|o| o.len()).unwrap_or(0)
    }
}

/// Keeps one observer registered; unsubscribes on drop.
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut observers) = registry.observers.lock() {
                observers.remove(&self.id);
            }
        }
    }
}
