//! Single-document seal/open
//!
//! `seal`: fresh salt + nonce → Argon2id key → AES-256-GCM → V2.0 container bytes.
//! `open`: V2.0 container bytes → key from the embedded salt → authenticated plaintext.
//!
//! Both are pure transforms over byte buffers; the `*_path` helpers add file I/O.

use std::path::Path;

use rand::RngCore;
use secrecy::SecretString;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::aead;
use crate::container::{self, ContainerHeader};
use crate::error::{VaultError, VaultResult};
use crate::kdf::{derive_key, CostParams};
use crate::output::{write_atomic, PartialOutput};
use crate::SALT_SIZE;

/// Generate a random 128-bit salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Encrypt `plaintext` into a new V2.0 container.
///
/// Every call draws a new salt and nonce, so sealing identical input twice
/// yields unrelated containers.
pub fn seal(plaintext: &[u8], password: &SecretString, cost: &CostParams) -> VaultResult<Vec<u8>> {
    let salt = generate_salt();
    let nonce = aead::generate_nonce();

    let key = derive_key(password, &salt, cost)?;
    let ciphertext = aead::encrypt(&key, &nonce, plaintext)?;

    let container = ContainerHeader::v2(salt, nonce, ciphertext).encode();
    debug!(
        plaintext_len = plaintext.len(),
        container_len = container.len(),
        "sealed container"
    );
    Ok(container)
}

/// Decrypt a V2.0 container.
///
/// Format problems are reported before any key is derived. Every
/// cryptographic failure, whether a wrong password, a cost-parameter mismatch,
/// or tampering, is reported as [`VaultError::InvalidPasswordOrCorrupt`].
pub fn open(
    container_bytes: &[u8],
    password: &SecretString,
    cost: &CostParams,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let header = container::decode(container_bytes)?;
    open_header(&header, password, cost)
}

pub(crate) fn open_header(
    header: &ContainerHeader,
    password: &SecretString,
    cost: &CostParams,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let key = derive_key(password, &header.salt, cost)?;
    let plaintext = aead::decrypt(&key, &header.nonce, &header.ciphertext)
        .map_err(|_| VaultError::InvalidPasswordOrCorrupt)?;
    debug!(plaintext_len = plaintext.len(), "opened container");
    Ok(Zeroizing::new(plaintext))
}

/// Re-seal a container under a new password.
///
/// The old password is verified (the container opens) before anything new is
/// produced; on failure the caller's original bytes are untouched.
pub fn change_password(
    container_bytes: &[u8],
    old_password: &SecretString,
    new_password: &SecretString,
    cost: &CostParams,
) -> VaultResult<Vec<u8>> {
    let plaintext = open(container_bytes, old_password, cost)?;
    seal(&plaintext, new_password, cost)
}

/// Seal `plaintext` and write the container to `path`.
///
/// A partially written file is removed if the write fails.
pub fn seal_to_path(
    path: &Path,
    plaintext: &[u8],
    password: &SecretString,
    cost: &CostParams,
) -> VaultResult<()> {
    let container = seal(plaintext, password, cost)?;
    let mut out = PartialOutput::create(path)?;
    out.write_all(&container)?;
    out.commit()?;
    info!(path = %path.display(), bytes = container.len(), "container written");
    Ok(())
}

/// Read and open the container at `path`.
pub fn open_path(
    path: &Path,
    password: &SecretString,
    cost: &CostParams,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let bytes = read_container(path)?;
    open(&bytes, password, cost)
}

/// Change the password of the container stored at `path`.
///
/// The file is replaced atomically, and only after the old password has
/// been verified.
pub fn change_password_at(
    path: &Path,
    old_password: &SecretString,
    new_password: &SecretString,
    cost: &CostParams,
) -> VaultResult<()> {
    let bytes = read_container(path)?;
    let resealed = change_password(&bytes, old_password, new_password, cost)?;
    write_atomic(path, &resealed)?;
    info!(path = %path.display(), "container password changed");
    Ok(())
}

pub(crate) fn read_container(path: &Path) -> VaultResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| VaultError::io(format!("reading {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::HEADER_SIZE;
    use crate::TAG_SIZE;

    const FAST: CostParams = CostParams::new(1024, 1, 1);

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = seal(b"[{\"type\":\"text\",\"content\":\"hi\"}]", &pw("hunter22"), &FAST).unwrap();
        let opened = open(&sealed, &pw("hunter22"), &FAST).unwrap();
        assert_eq!(opened.as_slice(), b"[{\"type\":\"text\",\"content\":\"hi\"}]");
    }

    #[test]
    fn test_sealed_size() {
        let sealed = seal(&[7u8; 100], &pw("pw"), &FAST).unwrap();
        assert_eq!(sealed.len(), HEADER_SIZE + 100 + TAG_SIZE);
        assert_eq!(&sealed[..4], b"V2.0");
    }

    #[test]
    fn test_open_wrong_password() {
        let sealed = seal(b"secret", &pw("right"), &FAST).unwrap();
        let result = open(&sealed, &pw("wrong"), &FAST);
        assert!(matches!(result, Err(VaultError::InvalidPasswordOrCorrupt)));
    }

    #[test]
    fn test_open_with_other_preset_is_indistinguishable_from_wrong_password() {
        let sealed = seal(b"secret", &pw("right"), &FAST).unwrap();
        let result = open(&sealed, &pw("right"), &CostParams::new(2048, 1, 1));
        assert!(matches!(result, Err(VaultError::InvalidPasswordOrCorrupt)));
    }

    #[test]
    fn test_open_rejects_format_before_kdf() {
        // Invalid cost params would fail the KDF; a format error must win.
        let bad_cost = CostParams::new(0, 0, 0);
        assert!(matches!(
            open(b"short", &pw("pw"), &bad_cost),
            Err(VaultError::TooShort { .. })
        ));
        assert!(matches!(
            open(&[0u8; 64], &pw("pw"), &bad_cost),
            Err(VaultError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_open_header_only_fails_closed() {
        let mut bytes = b"V2.0".to_vec();
        bytes.extend_from_slice(&[0u8; 28]);
        assert!(matches!(
            open(&bytes, &pw("pw"), &FAST),
            Err(VaultError::InvalidPasswordOrCorrupt)
        ));
    }

    #[test]
    fn test_change_password() {
        let sealed = seal(b"notes", &pw("old-pass"), &FAST).unwrap();
        let resealed = change_password(&sealed, &pw("old-pass"), &pw("new-pass"), &FAST).unwrap();

        assert_ne!(sealed[4..32], resealed[4..32], "fresh salt and nonce");
        assert!(open(&resealed, &pw("old-pass"), &FAST).is_err());
        assert_eq!(open(&resealed, &pw("new-pass"), &FAST).unwrap().as_slice(), b"notes");
    }

    #[test]
    fn test_change_password_wrong_old() {
        let sealed = seal(b"notes", &pw("old-pass"), &FAST).unwrap();
        let result = change_password(&sealed, &pw("guess"), &pw("new-pass"), &FAST);
        assert!(matches!(result, Err(VaultError::InvalidPasswordOrCorrupt)));
    }

    #[test]
    fn test_change_password_at_leaves_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.sscr");
        seal_to_path(&path, b"body", &pw("old"), &FAST).unwrap();
        let before = std::fs::read(&path).unwrap();

        assert!(change_password_at(&path, &pw("nope"), &pw("new"), &FAST).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);

        change_password_at(&path, &pw("old"), &pw("new"), &FAST).unwrap();
        assert_eq!(open_path(&path, &pw("new"), &FAST).unwrap().as_slice(), b"body");
    }

    #[test]
    fn test_seal_to_path_invalid_cost_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.sscr");
        let result = seal_to_path(&path, b"body", &pw("pw"), &CostParams::new(8, 1, 4));

        assert!(matches!(result, Err(VaultError::KeyDerivation(_))));
        assert!(!path.exists());
    }
}
