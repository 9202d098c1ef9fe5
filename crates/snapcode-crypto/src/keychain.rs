//! Hardware keychain backend
//!
//! Each storage key becomes one keychain entry under the service name.
//! The OS offers no multi-entry transaction, so batches are serialized
//! in-process and `set_many` restores the previous values if any write in
//! the batch fails.

use std::sync::Mutex;

use tracing::warn;

use crate::storage::{KeyValueStore, StorageError};

/// Single-entry access to a secret store
pub(crate) trait EntryBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Returns false if there was nothing to delete
    fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

struct OsKeychain {
    service_name: String,
}

impl OsKeychain {
    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service_name, key).map_err(|e| StorageError::Keychain(e.to_string()))
    }
}

impl EntryBackend for OsKeychain {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keychain(e.to_string())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Keychain(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        match self.entry(key)?.delete_password() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(StorageError::Keychain(e.to_string())),
        }
    }
}

pub struct KeychainStore {
    backend: Box<dyn EntryBackend>,
    lock: Mutex<()>,
}

impl KeychainStore {
    pub fn new(service_name: &str) -> Self {
        Self::with_backend(Box::new(OsKeychain {
            service_name: service_name.to_string(),
        }))
    }

    pub(crate) fn with_backend(backend: Box<dyn EntryBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    fn restore(&self, key: &str, previous: Option<&str>) {
        let result = match previous {
            Some(value) => self.backend.write(key, value),
            None => self.backend.delete(key).map(|_| ()),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "keychain rollback failed");
        }
    }
}

impl KeyValueStore for KeychainStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        keys.iter().map(|k| self.backend.read(k)).collect()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let previous: Vec<Option<String>> = entries
            .iter()
            .map(|(k, _)| self.backend.read(k))
            .collect::<Result<_, _>>()?;

        for (done, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.backend.write(key, value) {
                for ((k, _), old) in entries[..done].iter().zip(&previous) {
                    self.restore(k, old.as_deref());
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut existed = false;
        let mut first_error = None;
        // Keep going after a failure so one stuck entry doesn't strand the rest
        for key in keys {
            match self.backend.delete(key) {
                Ok(found) => existed |= found,
                Err(e) => {
                    warn!(key, error = %e, "keychain delete failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(existed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// In-memory entries with a slow write and injectable failures.
    #[derive(Default)]
    struct FakeKeychain {
        entries: Mutex<BTreeMap<String, String>>,
        fail_writes: Mutex<HashSet<String>>,
        fail_deletes: Mutex<HashSet<String>>,
        write_delay: Duration,
    }

    impl EntryBackend for Arc<FakeKeychain> {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            thread::sleep(self.write_delay);
            if self.fail_writes.lock().unwrap().contains(key) {
                return Err(StorageError::Keychain(format!("denied: {key}")));
            }
            self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<bool, StorageError> {
            if self.fail_deletes.lock().unwrap().contains(key) {
                return Err(StorageError::Keychain(format!("denied: {key}")));
            }
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }
    }

    fn keychain(fake: &Arc<FakeKeychain>) -> KeychainStore {
        KeychainStore::with_backend(Box::new(fake.clone()))
    }

    #[test]
    fn test_batch_roundtrip() {
        let fake = Arc::new(FakeKeychain::default());
        let store = keychain(&fake);

        store.set_many(&[("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(
            store.get_many(&["a", "b", "c"]).unwrap(),
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
        assert!(store.remove_many(&["a", "b"]).unwrap());
        assert!(!store.remove_many(&["a", "b"]).unwrap());
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let fake = Arc::new(FakeKeychain::default());
        let store = keychain(&fake);
        store.set_many(&[("a", "old-a"), ("b", "old-b")]).unwrap();
        fake.fail_writes.lock().unwrap().insert("b".to_string());

        assert!(store.set_many(&[("a", "new-a"), ("b", "new-b")]).is_err());
        assert_eq!(
            store.get_many(&["a", "b"]).unwrap(),
            vec![Some("old-a".to_string()), Some("old-b".to_string())]
        );
    }

    #[test]
    fn test_readers_never_see_half_a_pair() {
        let fake = Arc::new(FakeKeychain {
            write_delay: Duration::from_millis(5),
            ..Default::default()
        });
        let store = Arc::new(keychain(&fake));
        store.set_many(&[("sealed", "v0"), ("key", "v0")]).unwrap();

        let writer = thread::spawn({
            let store = store.clone();
            move || {
                for round in 1..=10 {
                    let value = format!("v{round}");
                    store.set_many(&[("sealed", value.as_str()), ("key", value.as_str())]).unwrap();
                }
            }
        });

        while !writer.is_finished() {
            let pair = store.get_many(&["sealed", "key"]).unwrap();
            assert_eq!(pair[0], pair[1], "read a mixed record");
            thread::sleep(Duration::from_millis(1));
        }
        writer.join().unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("v10"));
    }

    #[test]
    fn test_remove_attempts_every_entry() {
        let fake = Arc::new(FakeKeychain::default());
        let store = keychain(&fake);
        store.set_many(&[("a", "1"), ("b", "2")]).unwrap();
        fake.fail_deletes.lock().unwrap().insert("a".to_string());

        assert!(matches!(store.remove_many(&["a", "b"]), Err(StorageError::Keychain(_))));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
