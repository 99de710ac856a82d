//! Integration tests: legacy (CBC + PBKDF2) → V2.0 migration
//!
//! Most legacy fixtures are produced with `encrypt_legacy`, migrated, and
//! then opened through the current pipeline. `LEGACY_FIXTURE` was written by
//! the old desktop app's scheme (Python `cryptography`), so it pins the
//! on-disk format independently of this crate's encoder.

use std::path::Path;

use safepad_crypto::legacy::{decrypt_legacy, encrypt_legacy, MigrationStep};
use safepad_crypto::{
    migrate_bytes, migrate_directory, migrate_file, open, seal, CancelToken, CostParams,
    LegacyContainer, MigrationOptions, MigrationOutcome, Observer, VaultError,
};
use secrecy::SecretString;
use tempfile::TempDir;

const FAST: CostParams = CostParams::new(256, 1, 1);

/// salt 00..0f, iv 10..1f, password `Legacy-Pass1`:
/// PBKDF2-HMAC-SHA256 (100 000 rounds) → AES-256-CBC → PKCS7.
const LEGACY_FIXTURE: [u8; 96] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
    0x5b, 0x29, 0x34, 0xf3, 0xb6, 0x86, 0x99, 0x76, 0x82, 0xb9, 0x44, 0xe9, 0x22, 0x54, 0xf4, 0xc2,
    0x66, 0x8d, 0x22, 0x7f, 0x47, 0x65, 0xd0, 0xaa, 0x76, 0x2e, 0xfc, 0xa6, 0xde, 0x55, 0x6e, 0xcc,
    0xf8, 0x64, 0xf3, 0x72, 0x4e, 0x1e, 0xe8, 0xa5, 0x31, 0x46, 0x03, 0x50, 0xb3, 0x5a, 0x05, 0xe3,
    0xd7, 0xcf, 0x50, 0x36, 0x56, 0x1c, 0xf9, 0x2d, 0x72, 0x16, 0x03, 0x55, 0xd6, 0xbe, 0x4b, 0xc7,
];

const LEGACY_FIXTURE_PLAINTEXT: &[u8] = br#"[{"type":"text","content":"notes from the old app"}]"#;

fn pw(s: &str) -> SecretString {
    SecretString::from(s)
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn known_legacy_file_decrypts() {
    let salt: [u8; 16] = std::array::from_fn(|i| i as u8);
    let iv: [u8; 16] = std::array::from_fn(|i| 16 + i as u8);

    let legacy = LegacyContainer::parse(&LEGACY_FIXTURE).unwrap();
    assert_eq!(legacy.salt, salt);
    assert_eq!(legacy.iv, iv);

    let plaintext = decrypt_legacy(&legacy, &pw("Legacy-Pass1")).unwrap();
    assert_eq!(plaintext.as_slice(), LEGACY_FIXTURE_PLAINTEXT);
}

#[test]
fn known_legacy_file_migrates() {
    let outcome = migrate_bytes(&LEGACY_FIXTURE, &pw("Legacy-Pass1"), &FAST).unwrap();
    let MigrationOutcome::Migrated(sealed) = outcome else {
        panic!("legacy fixture was not migrated");
    };

    assert_eq!(&sealed[..4], b"V2.0");
    assert_eq!(
        open(&sealed, &pw("Legacy-Pass1"), &FAST).unwrap().as_slice(),
        LEGACY_FIXTURE_PLAINTEXT
    );
}

#[test]
fn migrated_file_opens_to_original_plaintext() {
    let dir = TempDir::new().unwrap();
    let doc = br#"[{"type":"text","content":"from 2021"}]"#;
    let path = write_file(dir.path(), "old.sscr", &encrypt_legacy(doc, &pw("pw")));

    let step = migrate_file(&path, &pw("pw"), &FAST, &MigrationOptions::default()).unwrap();

    let backup = dir.path().join("old.sscr.old.bak");
    assert_eq!(
        step,
        MigrationStep::Migrated {
            backup: Some(backup.clone())
        }
    );
    assert!(backup.exists());

    let migrated = std::fs::read(&path).unwrap();
    assert_eq!(&migrated[..4], b"V2.0");
    assert_eq!(open(&migrated, &pw("pw"), &FAST).unwrap().as_slice(), doc);
}

#[test]
fn migration_without_backup_replaces_in_place() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "old.sscr", &encrypt_legacy(b"body", &pw("pw")));
    let options = MigrationOptions {
        backup: false,
        ..MigrationOptions::default()
    };

    let step = migrate_file(&path, &pw("pw"), &FAST, &options).unwrap();

    assert_eq!(step, MigrationStep::Migrated { backup: None });
    assert!(!dir.path().join("old.sscr.old.bak").exists());
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(open(&bytes, &pw("pw"), &FAST).unwrap().as_slice(), b"body");
}

#[test]
fn current_files_are_skipped_untouched() {
    let dir = TempDir::new().unwrap();
    let sealed = seal(b"already new", &pw("pw"), &FAST).unwrap();
    let path = write_file(dir.path(), "new.sscr", &sealed);

    let step = migrate_file(&path, &pw("pw"), &FAST, &MigrationOptions::default()).unwrap();

    assert_eq!(step, MigrationStep::Skipped);
    assert_eq!(std::fs::read(&path).unwrap(), sealed);
}

#[test]
fn directory_batch_collects_failures_and_continues() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.sscr", &encrypt_legacy(b"a", &pw("right")));
    write_file(dir.path(), "nested/b.sscr", &encrypt_legacy(b"b", &pw("right")));
    write_file(dir.path(), "c.sscr", &seal(b"c", &pw("right"), &FAST).unwrap());
    // neither parses; the batch must keep going
    write_file(dir.path(), "short.sscr", b"tiny");
    write_file(dir.path(), "unaligned.sscr", &[0xAB; 40]);
    write_file(dir.path(), "notes.txt", b"ignored");

    let report = migrate_directory(
        dir.path(),
        &pw("right"),
        &FAST,
        &MigrationOptions::default(),
        Observer::new(),
    )
    .unwrap();

    assert_eq!(report.migrated.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.total(), 5);
    assert!(!report.is_clean());

    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(failed, vec!["short.sscr", "unaligned.sscr"]);

    // A failed file is left exactly as it was.
    assert_eq!(std::fs::read(dir.path().join("short.sscr")).unwrap(), b"tiny");
    let nested = std::fs::read(dir.path().join("nested/b.sscr")).unwrap();
    assert_eq!(open(&nested, &pw("right"), &FAST).unwrap().as_slice(), b"b");
}

#[test]
fn directory_batch_honors_cancellation() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "a.sscr", &encrypt_legacy(b"a", &pw("pw")));
    let before = std::fs::read(&path).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let result = migrate_directory(
        dir.path(),
        &pw("pw"),
        &FAST,
        &MigrationOptions::default(),
        Observer::new().with_cancel(&token),
    );

    assert!(matches!(result, Err(VaultError::Cancelled)));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn directory_batch_requires_directory() {
    let dir = TempDir::new().unwrap();
    let result = migrate_directory(
        &dir.path().join("missing"),
        &pw("pw"),
        &FAST,
        &MigrationOptions::default(),
        Observer::new(),
    );
    assert!(matches!(result, Err(VaultError::NotADirectory(_))));
}
