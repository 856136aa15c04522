//! AES-256-GCM encryption/decryption
//!
//! Provides authenticated encryption for secret parameter values using
//! AES-256-GCM. Each encryption operation generates a unique nonce, so the
//! same plaintext never encrypts to the same text twice.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{ParamError, ParamResult};

use super::DerivedKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Current ciphertext format version
const VERSION: u8 = 1;

/// Encrypted data with associated metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// The nonce used for this encryption (base64 encoded)
    pub nonce: String,
    /// The encrypted ciphertext with authentication tag (base64 encoded)
    pub ciphertext: String,
    /// Version for future algorithm upgrades
    #[serde(default = "default_version")]
    pub version: u8,
}

fn default_version() -> u8 {
    VERSION
}

impl EncryptedData {
    /// Create a new EncryptedData from raw bytes
    fn new(nonce: &[u8], ciphertext: &[u8]) -> Self {
        Self {
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
            version: VERSION,
        }
    }

    /// Single-string form stored in a parameter's `value`: `v1:<nonce>:<ciphertext>`
    pub fn to_token(&self) -> String {
        format!("v{}:{}:{}", self.version, self.nonce, self.ciphertext)
    }

    /// Parse the single-string form produced by `to_token`
    pub fn from_token(token: &str) -> ParamResult<Self> {
        let mut parts = token.splitn(3, ':');
        let (version, nonce, ciphertext) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(n), Some(c)) => (v, n, c),
            _ => {
                return Err(ParamError::Cipher(
                    "Malformed ciphertext: expected v<version>:<nonce>:<data>".to_string(),
                ))
            }
        };

        let version = version
            .strip_prefix('v')
            .and_then(|v| v.parse::<u8>().ok())
            .ok_or_else(|| ParamError::Cipher(format!("Invalid ciphertext version: {}", version)))?;

        Ok(Self {
            nonce: nonce.to_string(),
            ciphertext: ciphertext.to_string(),
            version,
        })
    }

    /// Decode the nonce from base64
    fn decode_nonce(&self) -> ParamResult<Vec<u8>> {
        STANDARD
            .decode(&self.nonce)
            .map_err(|e| ParamError::Cipher(format!("Invalid nonce encoding: {}", e)))
    }

    /// Decode the ciphertext from base64
    fn decode_ciphertext(&self) -> ParamResult<Vec<u8>> {
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|e| ParamError::Cipher(format!("Invalid ciphertext encoding: {}", e)))
    }
}

/// Encrypt plaintext data using AES-256-GCM
///
/// Generates a random nonce for each encryption operation.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> ParamResult<EncryptedData> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| ParamError::Cipher(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| ParamError::Cipher(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedData::new(&nonce_bytes, &ciphertext))
}

/// Decrypt ciphertext using AES-256-GCM
pub fn decrypt(encrypted: &EncryptedData, key: &DerivedKey) -> ParamResult<Vec<u8>> {
    if encrypted.version != VERSION {
        return Err(ParamError::Cipher(format!(
            "Unsupported encryption version: {}",
            encrypted.version
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| ParamError::Cipher(format!("Failed to create cipher: {}", e)))?;

    let nonce_bytes = encrypted.decode_nonce()?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(ParamError::Cipher(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = encrypted.decode_ciphertext()?;

    cipher.decrypt(nonce, ciphertext.as_ref()).map_err(|_| {
        ParamError::Cipher("Decryption failed: invalid key or corrupted data".to_string())
    })
}

/// Encrypt a string
pub fn encrypt_string(plaintext: &str, key: &DerivedKey) -> ParamResult<EncryptedData> {
    encrypt(plaintext.as_bytes(), key)
}

/// Decrypt to a string
pub fn decrypt_string(encrypted: &EncryptedData, key: &DerivedKey) -> ParamResult<String> {
    let plaintext = decrypt(encrypted, key)?;
    String::from_utf8(plaintext)
        .map_err(|e| ParamError::Cipher(format!("Invalid UTF-8 in decrypted data: {}", e)))
}
