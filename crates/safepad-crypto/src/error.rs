use std::path::PathBuf;

use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

/// Errors surfaced by container, vault, folder, migration, and guard operations.
///
/// Cryptographic failures collapse into [`VaultError::InvalidPasswordOrCorrupt`];
/// nothing here reveals whether a key, nonce, tag, or padding check was the cause.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("container too short: {len} bytes (minimum {min})")]
    TooShort { len: usize, min: usize },

    #[error("unsupported container format (no V2.0 tag); migrate older files first")]
    UnsupportedFormat,

    #[error("invalid password or corrupted file")]
    InvalidPasswordOrCorrupt,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("no files to encrypt in {}", .0.display())]
    EmptySource(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("decrypted payload is not a valid archive: {0}")]
    Archive(String),

    #[error("too many failed attempts; locked for another {remaining_secs}s")]
    Locked { remaining_secs: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("lockout state: {0}")]
    GuardState(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        VaultError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for the errors that count as a failed unlock attempt.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, VaultError::InvalidPasswordOrCorrupt)
    }
}
