//! Key manager - cached key status for front ends
//!
//! Remembers the last resolution so repeated status checks don't probe the
//! authority every time. Any change event marks the cache stale; the next
//! `status()` resolves again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use snapcode_crypto::ApiKey;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::notifier::Subscription;
use crate::resolver::{KeyResolver, ResolvedKey};

pub const INVALID_KEY_MESSAGE: &str = "The API key was rejected. Check it and try again.";

pub struct KeyManager {
    resolver: Arc<KeyResolver>,
    cached: Mutex<Option<ResolvedKey>>,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl KeyManager {
    pub fn new(resolver: Arc<KeyResolver>) -> Self {
        let stale = Arc::new(AtomicBool::new(true));
        let flag = stale.clone();
        let subscription = resolver.vault().notifier().subscribe(move || {
            flag.store(true, Ordering::SeqCst);
        });
        Self {
            resolver,
            cached: Mutex::new(None),
            stale,
            _subscription: subscription,
        }
    }

    /// Current resolution, re-resolving if a change event arrived since the last one.
    pub async fn status(&self) -> Result<ResolvedKey> {
        let mut cached = self.cached.lock().await;
        // Clear the flag before resolving so an event during resolution is not lost
        if self.stale.swap(false, Ordering::SeqCst) || cached.is_none() {
            match self.resolver.resolve().await {
                Ok(resolved) => *cached = Some(resolved),
                Err(e) => {
                    self.stale.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }
        Ok(cached.clone().unwrap_or(ResolvedKey::Absent))
    }

    pub async fn has_valid_key(&self) -> Result<bool> {
        Ok(self.status().await?.key().is_some())
    }

    /// Store a user key. `Err(message)` when the authority rejects it.
    pub async fn set_user_key(&self, key: &ApiKey) -> Result<std::result::Result<(), &'static str>> {
        if self.resolver.vault().store(key).await? {
            Ok(Ok(()))
        } else {
            Ok(Err(INVALID_KEY_MESSAGE))
        }
    }

    pub fn remove_user_key(&self) -> Result<()> {
        self.resolver.vault().remove()
    }

    /// Force the next `status()` to resolve again
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }
}
