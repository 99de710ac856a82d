//! AES-256-GCM encryption/decryption of a whole payload
//!
//! Output format: `[N bytes: ciphertext][16 bytes: GCM tag]`.
//! No associated data is authenticated; the container header sits outside
//! the AEAD boundary.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::error::{VaultError, VaultResult};
use crate::kdf::DerivedKey;
use crate::NONCE_SIZE;

/// The tag check failed. Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthenticationError;

/// Generate a random 96-bit nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` and `nonce`.
///
/// Returns `ciphertext || tag`. Callers must never reuse a nonce with the same key.
pub fn encrypt(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| VaultError::Encryption(format!("AES-256-GCM: {e}")))
}

/// Decrypt and authenticate `ciphertext || tag`.
///
/// A wrong key, wrong nonce, or any modified byte yields [`AuthenticationError`];
/// no plaintext is released unless the tag verifies.
pub fn decrypt(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, AuthenticationError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| AuthenticationError)
}
