//! Wires config, storage, validator, vault, resolver and generator together.

use std::sync::Arc;

use snapcode_crypto::{FileStore, KeyValueStore, KeychainStore};
use tracing::debug;

use crate::config::{Config, StoreKind};
use crate::error::Result;
use crate::gemini::{GeminiClient, GenerationBackend};
use crate::generator::HtmlGenerator;
use crate::manager::KeyManager;
use crate::notifier::ChangeNotifier;
use crate::resolver::KeyResolver;
use crate::validator::{GeminiKeyValidator, KeyValidator};
use crate::vault::CredentialVault;

/// OS keychain service name
pub const KEYCHAIN_SERVICE: &str = "snapcode";

pub struct Snapcode {
    pub config: Config,
    pub manager: KeyManager,
    pub generator: HtmlGenerator,
}

impl Snapcode {
    /// Build the production stack. Uses the process-wide notifier.
    pub fn from_config(config: Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.store {
            StoreKind::File => Arc::new(FileStore::open(config.store_path())?),
            StoreKind::Keychain => Arc::new(KeychainStore::new(KEYCHAIN_SERVICE)),
        };
        debug!(store = ?config.store, model = %config.model, "building pipeline");

        let validator = Arc::new(GeminiKeyValidator::new(&config.api_base, config.probe_timeout)?);
        let backend = Arc::new(GeminiClient::new(&config.api_base, &config.model, config.request_timeout)?);
        Ok(Self::assemble(config, store, validator, backend, ChangeNotifier::global().clone()))
    }

    /// Build from explicit parts.
    pub fn assemble(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        validator: Arc<dyn KeyValidator>,
        backend: Arc<dyn GenerationBackend>,
        notifier: ChangeNotifier,
    ) -> Self {
        let vault = Arc::new(CredentialVault::new(
            store,
            validator.clone(),
            notifier,
            config.key_prefix.clone(),
        ));
        let resolver = Arc::new(KeyResolver::new(config.env_api_key.clone(), vault, validator));
        Self {
            manager: KeyManager::new(resolver.clone()),
            generator: HtmlGenerator::new(backend, resolver),
            config,
        }
    }
}
