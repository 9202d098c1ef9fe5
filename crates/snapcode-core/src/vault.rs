//! Credential vault - the user's key, sealed at rest
//!
//! Holds at most one user-supplied key. The record is written and cleared as
//! a pair of storage entries in one batch. A record that fails to decode,
//! decrypt, or carry its prefix is purged on sight and reported as absent.

use std::sync::Arc;

use snapcode_crypto::{ApiKey, KeyValueStore, SealedCredential};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::notifier::ChangeNotifier;
use crate::validator::KeyValidator;

/// Storage entry holding `{"ciphertext", "iv"}`
pub const SEALED_ENTRY: &str = "snapcode.credential.sealed";
/// Storage entry holding the exported wrapping key
pub const KEY_ENTRY: &str = "snapcode.credential.key";

const RECORD_ENTRIES: [&str; 2] = [SEALED_ENTRY, KEY_ENTRY];

pub struct CredentialVault {
    store: Arc<dyn KeyValueStore>,
    validator: Arc<dyn KeyValidator>,
    notifier: ChangeNotifier,
    prefix: String,
}

impl CredentialVault {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        validator: Arc<dyn KeyValidator>,
        notifier: ChangeNotifier,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            validator,
            notifier,
            prefix: prefix.into(),
        }
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Validate, seal and persist `key`, replacing any previous record.
    ///
    /// Returns `Ok(false)` without touching storage if the key is rejected.
    pub async fn store(&self, key: &ApiKey) -> Result<bool> {
        if !self.validator.is_valid(key).await {
            debug!("refusing to store a rejected key");
            return Ok(false);
        }

        let sealed = SealedCredential::seal(&self.prefix, key)?;
        let (payload, exported_key) = sealed.to_entries()?;
        self.store
            .set_many(&[(SEALED_ENTRY, payload.as_str()), (KEY_ENTRY, exported_key)])?;

        info!(key_len = key.len(), "credential stored");
        self.notifier.notify();
        Ok(true)
    }

    /// The stored key, if there is one and the authority still accepts it.
    pub async fn resolve(&self) -> Result<Option<ApiKey>> {
        let entries = self.store.get_many(&RECORD_ENTRIES)?;
        let (payload, exported_key) = match (&entries[0], &entries[1]) {
            (None, None) => return Ok(None),
            (Some(p), Some(k)) => (p, k),
            _ => {
                warn!("credential record is incomplete; purging");
                self.remove()?;
                return Ok(None);
            }
        };

        let opened = SealedCredential::from_entries(payload, exported_key)
            .and_then(|sealed| sealed.open(&self.prefix));
        let key = match opened {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "credential record is corrupt; purging");
                self.remove()?;
                return Ok(None);
            }
        };

        if self.validator.is_valid(&key).await {
            Ok(Some(key))
        } else {
            debug!("stored key is no longer accepted");
            Ok(None)
        }
    }

    /// Delete the record. Observers are told only if something was deleted.
    pub fn remove(&self) -> Result<()> {
        let existed = self.store.remove_many(&RECORD_ENTRIES)?;
        if existed {
            info!("credential removed");
            self.notifier.notify();
        }
        Ok(())
    }

    /// Whether a record is present, without decrypting or validating it
    pub fn has_record(&self) -> Result<bool> {
        let entries = self.store.get_many(&RECORD_ENTRIES)?;
        Ok(entries.iter().any(Option::is_some))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::testing::StaticValidator;
    use snapcode_crypto::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        store: Arc<MemoryStore>,
        validator: Arc<StaticValidator>,
        vault: CredentialVault,
    }

    fn fixture(accepted: &[&str]) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let validator = Arc::new(StaticValidator::accepting(accepted));
        let vault = CredentialVault::new(
            store.clone(),
            validator.clone(),
            ChangeNotifier::new(),
            "GEMINI_",
        );
        Fixture { store, validator, vault }
    }

    fn count_events(notifier: &ChangeNotifier) -> (Arc<AtomicUsize>, crate::notifier::Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = notifier.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    #[tokio::test]
    async fn test_store_then_resolve() {
        let f = fixture(&["AIza-user"]);
        assert!(f.vault.store(&ApiKey::new("AIza-user")).await.unwrap());

        let resolved = f.vault.resolve().await.unwrap().unwrap();
        assert_eq!(resolved.expose(), "AIza-user");
        assert_eq!(f.store.len(), 2);
    }

    #[tokio::test]
    async fn test_plaintext_never_persisted() {
        let f = fixture(&["AIza-user"]);
        f.vault.store(&ApiKey::new("AIza-user")).await.unwrap();

        let entries = f.store.get_many(&RECORD_ENTRIES).unwrap();
        for entry in entries.into_iter().flatten() {
            assert!(!entry.contains("AIza-user"));
        }
    }

    #[tokio::test]
    async fn test_rejected_key_is_not_stored() {
        let f = fixture(&[]);
        let (events, _sub) = count_events(f.vault.notifier());

        assert!(!f.vault.store(&ApiKey::new("nope")).await.unwrap());
        assert!(f.store.is_empty());
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_key_keeps_previous_record() {
        let f = fixture(&["first"]);
        f.vault.store(&ApiKey::new("first")).await.unwrap();

        assert!(!f.vault.store(&ApiKey::new("second")).await.unwrap());
        assert_eq!(f.vault.resolve().await.unwrap().unwrap().expose(), "first");
    }

    #[tokio::test]
    async fn test_store_overwrites_with_fresh_key_material() {
        let f = fixture(&["first", "second"]);
        f.vault.store(&ApiKey::new("first")).await.unwrap();
        let first_key = f.store.get(KEY_ENTRY).unwrap();

        f.vault.store(&ApiKey::new("second")).await.unwrap();
        assert_ne!(f.store.get(KEY_ENTRY).unwrap(), first_key);
        assert_eq!(f.vault.resolve().await.unwrap().unwrap().expose(), "second");
    }

    #[tokio::test]
    async fn test_store_notifies() {
        let f = fixture(&["k"]);
        let (events, _sub) = count_events(f.vault.notifier());
        f.vault.store(&ApiKey::new("k")).await.unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_empty() {
        let f = fixture(&[]);
        assert!(f.vault.resolve().await.unwrap().is_none());
        assert_eq!(f.validator.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_revoked_key_resolves_absent_but_is_kept() {
        let f = fixture(&["k"]);
        f.vault.store(&ApiKey::new("k")).await.unwrap();
        f.validator.revoke("k");

        assert!(f.vault.resolve().await.unwrap().is_none());
        assert!(f.vault.has_record().unwrap());

        f.validator.accept("k");
        assert!(f.vault.resolve().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_is_purged() {
        let f = fixture(&["k"]);
        f.vault.store(&ApiKey::new("k")).await.unwrap();

        let mut payload: serde_json::Value =
            serde_json::from_str(&f.store.get(SEALED_ENTRY).unwrap().unwrap()).unwrap();
        let ct = payload["ciphertext"].as_str().unwrap().to_string();
        let flipped = if ct.starts_with('A') { format!("B{}", &ct[1..]) } else { format!("A{}", &ct[1..]) };
        payload["ciphertext"] = serde_json::Value::String(flipped);
        f.store.put_raw(SEALED_ENTRY, &payload.to_string());

        let (events, _sub) = count_events(f.vault.notifier());
        assert!(f.vault.resolve().await.unwrap().is_none());
        assert!(f.store.is_empty());
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(f.vault.resolve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tampered_key_material_is_purged() {
        let f = fixture(&["k"]);
        f.vault.store(&ApiKey::new("k")).await.unwrap();
        f.store.put_raw(KEY_ENTRY, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=");

        assert!(f.vault.resolve().await.unwrap().is_none());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_prefix_is_purged() {
        let f = fixture(&["k"]);
        let foreign = SealedCredential::seal("OTHER_", &ApiKey::new("k")).unwrap();
        let (payload, key) = foreign.to_entries().unwrap();
        f.store.set_many(&[(SEALED_ENTRY, payload.as_str()), (KEY_ENTRY, key)]).unwrap();

        assert!(f.vault.resolve().await.unwrap().is_none());
        assert!(f.store.is_empty());
        assert_eq!(f.validator.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_half_record_is_purged() {
        let f = fixture(&["k"]);
        f.vault.store(&ApiKey::new("k")).await.unwrap();
        f.store.remove_many(&[KEY_ENTRY]).unwrap();

        assert!(f.vault.resolve().await.unwrap().is_none());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_notifies_all_observers_once() {
        let f = fixture(&["k"]);
        f.vault.store(&ApiKey::new("k")).await.unwrap();

        let (a, _sa) = count_events(f.vault.notifier());
        let (b, _sb) = count_events(f.vault.notifier());
        f.vault.remove().unwrap();

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_on_empty_vault_is_silent() {
        let f = fixture(&[]);
        let (a, _sa) = count_events(f.vault.notifier());
        let (b, _sb) = count_events(f.vault.notifier());

        f.vault.remove().unwrap();
        f.vault.remove().unwrap();
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_entries_untouched() {
        let f = fixture(&["k"]);
        f.store.put_raw("snapcode.session.snapshot", "{}");
        f.vault.store(&ApiKey::new("k")).await.unwrap();
        f.vault.remove().unwrap();
        assert_eq!(f.store.get("snapcode.session.snapshot").unwrap().as_deref(), Some("{}"));
    }
}
