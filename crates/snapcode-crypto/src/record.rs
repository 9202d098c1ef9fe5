//! Sealed credential record
//!
//! A stored key is two storage entries that only make sense together:
//! - the sealed payload, JSON `{"ciphertext": <b64>, "iv": <b64>}`
//! - the exported wrapping key, plain base64
//!
//! The plaintext under the seal is `prefix + key`. A record that decrypts
//! without its prefix is treated as corrupt, same as one that fails to decrypt.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::cipher::{self, CipherError, KEY_SIZE};
use crate::secret::ApiKey;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("Decrypted record is missing its integrity prefix")]
    MissingPrefix,

    #[error("Decrypted record is not valid UTF-8")]
    NotUtf8,
}

/// The JSON half of the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub ciphertext: String,
    pub iv: String,
}

/// Both halves of one stored credential
pub struct SealedCredential {
    pub payload: SealedPayload,
    exported_key: Zeroizing<String>,
}

impl SealedCredential {
    /// Seal `prefix + key` under a freshly generated wrapping key and nonce.
    pub fn seal(prefix: &str, key: &ApiKey) -> Result<Self, CipherError> {
        let wrapping_key = cipher::generate_key();
        let nonce = cipher::generate_nonce();

        let mut plaintext = Zeroizing::new(String::with_capacity(prefix.len() + key.len()));
        plaintext.push_str(prefix);
        plaintext.push_str(key.expose());

        let ciphertext = cipher::seal(&wrapping_key[..], &nonce, plaintext.as_bytes())?;

        Ok(Self {
            payload: SealedPayload {
                ciphertext: STANDARD.encode(ciphertext),
                iv: STANDARD.encode(nonce),
            },
            exported_key: Zeroizing::new(STANDARD.encode(&wrapping_key[..])),
        })
    }

    /// Rebuild a record from its two stored entries.
    pub fn from_entries(payload_json: &str, exported_key: &str) -> Result<Self, RecordError> {
        let payload: SealedPayload = serde_json::from_str(payload_json)
            .map_err(|e| RecordError::Malformed(format!("payload: {}", e)))?;
        Ok(Self {
            payload,
            exported_key: Zeroizing::new(exported_key.to_string()),
        })
    }

    /// The two entries to persist: (payload JSON, exported key).
    pub fn to_entries(&self) -> Result<(String, &str), RecordError> {
        let json = serde_json::to_string(&self.payload)
            .map_err(|e| RecordError::Malformed(format!("payload: {}", e)))?;
        Ok((json, self.exported_key.as_str()))
    }

    pub fn exported_key(&self) -> &str {
        &self.exported_key
    }

    /// Decrypt and strip the prefix.
    pub fn open(&self, prefix: &str) -> Result<ApiKey, RecordError> {
        let key = decode("key", &self.exported_key)?;
        if key.len() != KEY_SIZE {
            return Err(RecordError::Cipher(CipherError::InvalidKeySize(key.len())));
        }
        let nonce = decode("iv", &self.payload.iv)?;
        let ciphertext = decode("ciphertext", &self.payload.ciphertext)?;

        let plaintext = cipher::open(&key, &nonce, &ciphertext)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| RecordError::NotUtf8)?;

        text.strip_prefix(prefix)
            .map(ApiKey::new)
            .ok_or(RecordError::MissingPrefix)
    }
}

fn decode(field: &str, value: &str) -> Result<Zeroizing<Vec<u8>>, RecordError> {
    STANDARD
        .decode(value)
        .map(Zeroizing::new)
        .map_err(|e| RecordError::Malformed(format!("{}: {}", field, e)))
}
