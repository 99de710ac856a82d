//! Legacy (pre-V2.0) containers and their migration to the current format
//!
//! Legacy scheme: PBKDF2-HMAC-SHA256 (100 000 iterations) → AES-256-CBC with
//! PKCS7 padding, laid out as `salt(16) || iv(16) || ciphertext`. There is no
//! integrity tag, so a bad padding byte is the only sign of a wrong password;
//! every failure still collapses to [`VaultError::InvalidPasswordOrCorrupt`].
//!
//! Per file: `Detected(legacy) → Decrypted → ReEncrypted → Written`, or
//! `Detected(current) → Skipped`.

use std::fs;
use std::path::{Path, PathBuf};

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256, Block};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::container::{self, ContainerKind, LegacyContainer, LEGACY_IV_SIZE};
use crate::error::{VaultError, VaultResult};
use crate::kdf::{CostParams, DerivedKey};
use crate::output::{write_atomic, PartialOutput};
use crate::progress::{scaled, Observer};
use crate::vault;
use crate::{CONTAINER_EXTENSION, KEY_SIZE, SALT_SIZE};

/// PBKDF2 iteration count of the legacy format
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Suffix appended to a migrated file's original when backups are on
pub const BACKUP_SUFFIX: &str = ".old.bak";

const BLOCK: usize = LEGACY_IV_SIZE;

/// Options for file and directory migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Rename the original to `<name>.old.bak` before writing the new container
    pub backup: bool,
    /// Extension (without the dot) of files considered by [`migrate_directory`]
    pub extension: String,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            backup: true,
            extension: CONTAINER_EXTENSION.to_string(),
        }
    }
}

/// Result of migrating one buffer.
#[derive(Debug)]
pub enum MigrationOutcome {
    /// Already V2.0; nothing to do
    Skipped,
    /// Re-sealed V2.0 container bytes
    Migrated(Vec<u8>),
}

/// Result of migrating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStep {
    Skipped,
    Migrated { backup: Option<PathBuf> },
}

/// Aggregate outcome of a directory migration.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub migrated: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, VaultError)>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.migrated.len() + self.skipped.len() + self.failed.len()
    }
}

fn derive_legacy_key(password: &SecretString, salt: &[u8]) -> DerivedKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.expose_secret().as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        &mut key,
    );
    DerivedKey::from_bytes(key)
}

/// Decrypt a parsed legacy container.
pub fn decrypt_legacy(
    legacy: &LegacyContainer,
    password: &SecretString,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let key = derive_legacy_key(password, &legacy.salt);
    let cipher = Aes256::new(key.as_bytes().into());

    let mut padded = Zeroizing::new(Vec::with_capacity(legacy.ciphertext.len()));
    let mut previous = legacy.iv;
    for chunk in legacy.ciphertext.chunks_exact(BLOCK) {
        let mut block = *Block::from_slice(chunk);
        cipher.decrypt_block(&mut block);
        padded.extend(block.iter().zip(previous.iter()).map(|(b, p)| b ^ p));
        previous.copy_from_slice(chunk);
    }

    let pad = pkcs7_pad_len(&padded).ok_or(VaultError::InvalidPasswordOrCorrupt)?;
    let len = padded.len() - pad;
    padded.truncate(len);
    Ok(padded)
}

/// Produce a legacy-format container.
///
/// Only for building old-format fixtures; new data is always sealed as V2.0.
pub fn encrypt_legacy(plaintext: &[u8], password: &SecretString) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_SIZE];
    let mut iv = [0u8; LEGACY_IV_SIZE];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let key = derive_legacy_key(password, &salt);
    let cipher = Aes256::new(key.as_bytes().into());

    let pad = BLOCK - plaintext.len() % BLOCK;
    let mut padded = Zeroizing::new(plaintext.to_vec());
    padded.resize(plaintext.len() + pad, pad as u8);

    let mut ciphertext = Vec::with_capacity(padded.len());
    let mut previous = iv;
    for chunk in padded.chunks_exact(BLOCK) {
        let mut block = Block::default();
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = chunk[i] ^ previous[i];
        }
        cipher.encrypt_block(&mut block);
        previous.copy_from_slice(&block);
        ciphertext.extend_from_slice(&block);
    }

    LegacyContainer {
        salt,
        iv,
        ciphertext,
    }
    .encode()
}

/// Length of valid PKCS7 padding at the end of `data`, if any.
fn pkcs7_pad_len(data: &[u8]) -> Option<usize> {
    let pad = usize::from(*data.last()?);
    if pad == 0 || pad > BLOCK || pad > data.len() {
        return None;
    }
    let tail = &data[data.len() - pad..];
    let mismatch = tail.iter().fold(0u8, |acc, &b| acc | (b ^ pad as u8));
    (mismatch == 0).then_some(pad)
}

/// Migrate one buffer: V2.0 input is skipped, legacy input is decrypted and
/// re-sealed under the same password with `cost`.
pub fn migrate_bytes(
    bytes: &[u8],
    password: &SecretString,
    cost: &CostParams,
) -> VaultResult<MigrationOutcome> {
    let legacy = match container::detect(bytes)? {
        ContainerKind::Current(_) => return Ok(MigrationOutcome::Skipped),
        ContainerKind::Legacy(legacy) => legacy,
    };

    let plaintext = decrypt_legacy(&legacy, password)?;
    debug!(plaintext_len = plaintext.len(), "legacy container decrypted");
    let sealed = vault::seal(&plaintext, password, cost)?;
    Ok(MigrationOutcome::Migrated(sealed))
}

/// Migrate the container stored at `path` in place.
pub fn migrate_file(
    path: &Path,
    password: &SecretString,
    cost: &CostParams,
    options: &MigrationOptions,
) -> VaultResult<MigrationStep> {
    let bytes = vault::read_container(path)?;
    let sealed = match migrate_bytes(&bytes, password, cost)? {
        MigrationOutcome::Skipped => {
            debug!(path = %path.display(), "already current format");
            return Ok(MigrationStep::Skipped);
        }
        MigrationOutcome::Migrated(sealed) => sealed,
    };

    if !options.backup {
        write_atomic(path, &sealed)?;
        info!(path = %path.display(), "migrated");
        return Ok(MigrationStep::Migrated { backup: None });
    }

    let backup = backup_path(path);
    fs::rename(path, &backup)
        .map_err(|e| VaultError::io(format!("backing up {}", path.display()), e))?;

    let written = PartialOutput::create(path).and_then(|mut out| {
        out.write_all(&sealed)?;
        out.commit()
    });
    if let Err(e) = written {
        if let Err(restore) = fs::rename(&backup, path) {
            warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %restore,
                "failed to restore original after migration error"
            );
        }
        return Err(e);
    }

    info!(path = %path.display(), backup = %backup.display(), "migrated");
    Ok(MigrationStep::Migrated {
        backup: Some(backup),
    })
}

/// Migrate every matching container under `root`, recursively.
///
/// A failing file is recorded in [`MigrationReport::failed`] and the batch
/// continues. Cancellation is checked between files.
pub fn migrate_directory(
    root: &Path,
    password: &SecretString,
    cost: &CostParams,
    options: &MigrationOptions,
    observer: Observer<'_>,
) -> VaultResult<MigrationReport> {
    if !root.is_dir() {
        return Err(VaultError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_containers(root, &options.extension, &mut files)?;
    files.sort();

    let total = files.len();
    let mut report = MigrationReport::default();

    for (i, path) in files.into_iter().enumerate() {
        observer.checkpoint()?;
        observer.progress(scaled(i, total, 0, 100));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        observer.status(&format!("Processing {}/{}: {}", i + 1, total, name));

        match migrate_file(&path, password, cost, options) {
            Ok(MigrationStep::Skipped) => report.skipped.push(path),
            Ok(MigrationStep::Migrated { .. }) => report.migrated.push(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "migration failed");
                report.failed.push((path, e));
            }
        }
    }

    observer.progress(100);
    info!(
        root = %root.display(),
        migrated = report.migrated.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "migration finished"
    );
    Ok(report)
}

fn collect_containers(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> VaultResult<()> {
    let entries =
        fs::read_dir(dir).map_err(|e| VaultError::io(format!("reading dir {}", dir.display()), e))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| VaultError::io(format!("reading dir {}", dir.display()), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| VaultError::io(format!("stat {}", path.display()), e))?;

        if file_type.is_dir() {
            collect_containers(&path, extension, out)?;
        } else if file_type.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(extension)
        {
            out.push(path);
        }
    }
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}
