//! Secret cipher used by the reconciliation engine
//!
//! Wraps the AES-GCM primitives behind a value-level API. The key is handed
//! in from outside; without one the cipher is "locked" and refuses to work
//! rather than letting plaintext through.

use crate::error::{ParamError, ParamResult};

use super::encryption::{decrypt_string, encrypt_string, EncryptedData};
use super::key_derivation::{derive_key, DerivedKey, KeyDerivationParams};

/// Known plaintext encrypted under the key to detect a wrong passphrase
const VERIFY_PLAINTEXT: &str = "paramsync_verify";

/// Reversible encryption of secret parameter values
#[derive(Debug, Clone)]
pub struct SecretCipher {
    key: Option<DerivedKey>,
}

impl SecretCipher {
    /// A cipher backed by key material
    pub fn new(key: DerivedKey) -> Self {
        Self { key: Some(key) }
    }

    /// A cipher with no key material; every operation fails
    pub fn locked() -> Self {
        Self { key: None }
    }

    /// Derive the key from a passphrase and check it against a verification token
    pub fn unlock(
        passphrase: &str,
        params: &KeyDerivationParams,
        verification_token: Option<&str>,
    ) -> ParamResult<Self> {
        let cipher = Self::new(derive_key(passphrase, params)?);

        if let Some(token) = verification_token {
            match cipher.decrypt(token) {
                Ok(plain) if plain == VERIFY_PLAINTEXT => {}
                _ => return Err(ParamError::Cipher("Invalid passphrase".to_string())),
            }
        }

        Ok(cipher)
    }

    /// Produce a verification token for the current key
    pub fn verification_token(&self) -> ParamResult<String> {
        self.encrypt(VERIFY_PLAINTEXT)
    }

    /// Whether key material is present
    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    fn key(&self) -> ParamResult<&DerivedKey> {
        self.key.as_ref().ok_or_else(|| {
            ParamError::Cipher("No key material available for secret values".to_string())
        })
    }

    /// Encrypt a plaintext value into its stored text form
    pub fn encrypt(&self, plaintext: &str) -> ParamResult<String> {
        let key = self.key()?;
        Ok(encrypt_string(plaintext, key)?.to_token())
    }

    /// Decrypt a stored value back into plaintext
    pub fn decrypt(&self, ciphertext: &str) -> ParamResult<String> {
        let key = self.key()?;
        let encrypted = EncryptedData::from_token(ciphertext)?;
        decrypt_string(&encrypted, key)
    }

    /// Plaintext of a stored value: decrypt if secret, pass through otherwise
    pub fn reveal(&self, value: &str, secret: bool) -> ParamResult<String> {
        if secret {
            self.decrypt(value)
        } else {
            Ok(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, SaltString};

    fn test_cipher() -> SecretCipher {
        SecretCipher::new(DerivedKey::from_bytes([9; 32]))
    }

    fn fast_params() -> KeyDerivationParams {
        KeyDerivationParams::with_values(SaltString::generate(&mut OsRng).to_string(), 1024, 1, 1)
    }

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        let ciphertext = cipher.encrypt("xyz").unwrap();

        assert_ne!(ciphertext, "xyz");
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), "xyz");
    }

    #[test]
    fn test_not_deterministic() {
        let cipher = test_cipher();
        assert_ne!(cipher.encrypt("xyz").unwrap(), cipher.encrypt("xyz").unwrap());
    }

    #[test]
    fn test_locked_cipher_never_passes_plaintext() {
        let cipher = SecretCipher::locked();
        assert!(!cipher.is_unlocked());
        assert!(matches!(cipher.encrypt("xyz"), Err(ParamError::Cipher(_))));
        assert!(matches!(cipher.decrypt("v1:a:b"), Err(ParamError::Cipher(_))));
    }

    #[test]
    fn test_reveal_passes_through_non_secret() {
        let cipher = SecretCipher::locked();
        assert_eq!(cipher.reveal("10.0.0.1", false).unwrap(), "10.0.0.1");
        assert!(cipher.reveal("v1:a:b", true).is_err());
    }

    #[test]
    fn test_unlock_with_verification() {
        let params = fast_params();
        let first = SecretCipher::unlock("correct horse", &params, None).unwrap();
        let token = first.verification_token().unwrap();

        let again = SecretCipher::unlock("correct horse", &params, Some(&token)).unwrap();
        assert!(again.is_unlocked());

        let wrong = SecretCipher::unlock("wrong horse", &params, Some(&token));
        assert!(matches!(wrong, Err(ParamError::Cipher(_))));
    }
}
