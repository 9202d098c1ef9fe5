//! Snapcode Crypto - credential sealing and local storage
//!
//! This crate provides:
//! - `ApiKey`, a redacting wrapper around a user or operator secret
//! - ChaCha20-Poly1305 sealing with caller-visible nonces
//! - The sealed credential record and its storage encoding
//! - Key-value storage backends (memory, JSON file, OS keychain)
//!
//! Nothing in here talks to the network.

pub mod cipher;
pub mod keychain;
pub mod record;
pub mod secret;
pub mod storage;

pub use cipher::CipherError;
pub use keychain::KeychainStore;
pub use record::{RecordError, SealedCredential, SealedPayload};
pub use secret::ApiKey;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
