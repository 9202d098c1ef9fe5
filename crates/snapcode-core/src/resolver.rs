//! Key resolution policy
//!
//! Operator key first, stored user key second, nothing third. Each call
//! re-validates: a key's value is fixed but its validity is not.

use std::sync::Arc;

use snapcode_crypto::ApiKey;
use tracing::debug;

use crate::error::Result;
use crate::validator::KeyValidator;
use crate::vault::CredentialVault;

/// Outcome of one resolution. Never persisted.
#[derive(Debug, Clone)]
pub enum ResolvedKey {
    Environment(ApiKey),
    Local(ApiKey),
    Absent,
}

impl ResolvedKey {
    pub fn key(&self) -> Option<&ApiKey> {
        match self {
            ResolvedKey::Environment(key) | ResolvedKey::Local(key) => Some(key),
            ResolvedKey::Absent => None,
        }
    }

    pub fn into_key(self) -> Option<ApiKey> {
        match self {
            ResolvedKey::Environment(key) | ResolvedKey::Local(key) => Some(key),
            ResolvedKey::Absent => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            ResolvedKey::Environment(_) => "environment",
            ResolvedKey::Local(_) => "local",
            ResolvedKey::Absent => "none",
        }
    }
}

pub struct KeyResolver {
    env_key: Option<ApiKey>,
    vault: Arc<CredentialVault>,
    validator: Arc<dyn KeyValidator>,
}

impl KeyResolver {
    pub fn new(env_key: Option<ApiKey>, vault: Arc<CredentialVault>, validator: Arc<dyn KeyValidator>) -> Self {
        Self {
            env_key,
            vault,
            validator,
        }
    }

    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    pub fn has_env_key(&self) -> bool {
        self.env_key.is_some()
    }

    pub async fn resolve(&self) -> Result<ResolvedKey> {
        if let Some(env_key) = &self.env_key {
            if self.validator.is_valid(env_key).await {
                debug!(source = "environment", "key resolved");
                return Ok(ResolvedKey::Environment(env_key.clone()));
            }
            debug!("environment key rejected; falling back to stored key");
        }

        match self.vault.resolve().await? {
            Some(key) => {
                debug!(source = "local", "key resolved");
                Ok(ResolvedKey::Local(key))
            }
            None => {
                debug!("no usable key");
                Ok(ResolvedKey::Absent)
            }
        }
    }

    /// The key to use right now, if any
    pub async fn active_key(&self) -> Result<Option<ApiKey>> {
        Ok(self.resolve().await?.into_key())
    }
}
