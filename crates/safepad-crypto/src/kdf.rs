//! Key derivation: Argon2id password → per-container AES key

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{VaultError, VaultResult};
use crate::{KEY_SIZE, SALT_SIZE};

/// A 256-bit key derived from a password and a container's salt.
///
/// Lives only for one seal/open call. Zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id cost parameters.
///
/// Not stored in containers: whoever opens a container must pass the same
/// parameters that sealed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostParams {
    /// Memory cost in KiB
    pub mem_cost_kib: u32,
    /// Time cost / iterations
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
}

impl CostParams {
    pub const fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        }
    }
}

impl fmt::Display for CostParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={} KiB, t={}, p={}",
            self.mem_cost_kib, self.time_cost, self.parallelism
        )
    }
}

/// Derive a 256-bit key from a password and salt using Argon2id (v0x13).
///
/// Deterministic in all three inputs. Parameters the primitive rejects (for
/// example a memory cost below 8 KiB per lane) fail with
/// [`VaultError::KeyDerivation`]; no defaults are substituted.
pub fn derive_key(
    password: &SecretString,
    salt: &[u8; SALT_SIZE],
    cost: &CostParams,
) -> VaultResult<DerivedKey> {
    let params = Params::new(
        cost.mem_cost_kib,
        cost.time_cost,
        cost.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| VaultError::KeyDerivation(format!("invalid Argon2id params ({cost}): {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| VaultError::KeyDerivation(format!("Argon2id failed: {e}")))?;

    Ok(DerivedKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fast params for testing
    const FAST: CostParams = CostParams::new(1024, 1, 1);

    #[test]
    fn test_kdf_deterministic() {
        let password = SecretString::from("test-password-123");
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_key(&password, &salt, &FAST).unwrap();
        let key2 = derive_key(&password, &salt, &FAST).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passwords() {
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_key(&SecretString::from("password-a"), &salt, &FAST).unwrap();
        let key2 = derive_key(&SecretString::from("password-b"), &salt, &FAST).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let password = SecretString::from("same-password");

        let key1 = derive_key(&password, &[1u8; SALT_SIZE], &FAST).unwrap();
        let key2 = derive_key(&password, &[2u8; SALT_SIZE], &FAST).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_cost_changes_key() {
        let password = SecretString::from("same-password");
        let salt = [7u8; SALT_SIZE];

        let key1 = derive_key(&password, &salt, &FAST).unwrap();
        let key2 = derive_key(&password, &salt, &CostParams::new(1024, 2, 1)).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "a different preset must not open the same container"
        );
    }

    #[test]
    fn test_kdf_rejects_memory_below_lane_minimum() {
        let password = SecretString::from("pw");
        let result = derive_key(&password, &[0u8; SALT_SIZE], &CostParams::new(8, 1, 4));

        assert!(matches!(result, Err(VaultError::KeyDerivation(_))));
    }

    #[test]
    fn test_kdf_rejects_zero_time_cost() {
        let password = SecretString::from("pw");
        let result = derive_key(&password, &[0u8; SALT_SIZE], &CostParams::new(1024, 0, 1));

        assert!(matches!(result, Err(VaultError::KeyDerivation(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = DerivedKey::from_bytes([0xAB; KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"));
    }
}
