//! Cryptographic functions for paramsync
//!
//! Provides AES-256-GCM encryption with Argon2id key derivation
//! for at-rest encryption of secret parameter values.

pub mod cipher;
pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;

pub use cipher::SecretCipher;
pub use encryption::{decrypt, decrypt_string, encrypt, encrypt_string, EncryptedData};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecureString;
