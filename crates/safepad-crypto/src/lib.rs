//! safepad-crypto: encrypted containers for SafePad documents and folders
//!
//! Pipeline: password + fresh salt → Argon2id → 256-bit key → AES-256-GCM → V2.0 container
//!
//! Container layout (V2.0):
//! ```text
//! [4 bytes: "V2.0"][16 bytes: salt][12 bytes: nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! Legacy layout (pre-V2.0, migration only):
//! ```text
//! [16 bytes: salt][16 bytes: IV][N bytes: AES-256-CBC ciphertext, PKCS7]   key = PBKDF2-HMAC-SHA256
//! ```
//!
//! Every seal draws a new salt and nonce, so a key is never used twice. Argon2id
//! cost parameters are not stored in the container; the caller supplies them.

pub mod aead;
pub mod benchmark;
pub mod container;
pub mod error;
pub mod folder;
pub mod guard;
pub mod kdf;
pub mod legacy;
pub mod output;
pub mod progress;
pub mod vault;

pub use benchmark::{calibrate, CalibrationConfig};
pub use container::{ContainerHeader, ContainerKind, LegacyContainer};
pub use error::{VaultError, VaultResult};
pub use folder::{open_directory, seal_directory, seal_directory_to_path, ExtractSummary};
pub use guard::{BruteForceGuard, Clock, GuardPolicy, GuardState, SystemClock};
pub use kdf::{derive_key, CostParams, DerivedKey};
pub use legacy::{
    migrate_bytes, migrate_directory, migrate_file, MigrationOptions, MigrationOutcome,
    MigrationReport, MigrationStep,
};
pub use progress::{CancelToken, Observer, ProgressFn, StatusFn};
pub use vault::{change_password, change_password_at, open, open_path, seal, seal_to_path};

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the Argon2id salt stored in every container
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// File extension used for SafePad containers
pub const CONTAINER_EXTENSION: &str = "sscr";
