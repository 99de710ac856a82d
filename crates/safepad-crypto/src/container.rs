//! Container codec: V2.0 and legacy binary layouts
//!
//! V2.0 (binary):
//! ```text
//! offset  size  field
//! 0       4     version tag, ASCII "V2.0"
//! 4       16    Argon2id salt
//! 20      12    AES-GCM nonce
//! 32      N     ciphertext (with trailing 16-byte tag)
//! ```
//!
//! Legacy (binary, no tag):
//! ```text
//! offset  size  field
//! 0       16    PBKDF2 salt
//! 16      16    AES-CBC IV
//! 32      N     ciphertext (PKCS7-padded, N a non-zero multiple of 16)
//! ```
//!
//! Pure in-memory parsing; nothing here touches a key or the filesystem.

use crate::error::{VaultError, VaultResult};
use crate::{NONCE_SIZE, SALT_SIZE};

/// Version tag of the current format
pub const VERSION_V2: [u8; 4] = *b"V2.0";

/// Size of the fixed V2.0 header (tag + salt + nonce)
pub const HEADER_SIZE: usize = VERSION_V2.len() + SALT_SIZE + NONCE_SIZE;

/// Size of the legacy header (salt + IV)
pub const LEGACY_HEADER_SIZE: usize = SALT_SIZE + LEGACY_IV_SIZE;

/// AES block size / legacy IV size
pub const LEGACY_IV_SIZE: usize = 16;

/// A parsed V2.0 container. Built fresh on every seal and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: [u8; 4],
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the GCM tag appended
    pub ciphertext: Vec<u8>,
}

impl ContainerHeader {
    /// A V2.0 container around freshly produced ciphertext.
    pub fn v2(salt: [u8; SALT_SIZE], nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Self {
        Self {
            version: VERSION_V2,
            salt,
            nonce,
            ciphertext,
        }
    }

    /// Serialize as `version || salt || nonce || ciphertext`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.version);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

/// A parsed legacy (pre-V2.0) container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyContainer {
    pub salt: [u8; SALT_SIZE],
    pub iv: [u8; LEGACY_IV_SIZE],
    pub ciphertext: Vec<u8>,
}

impl LegacyContainer {
    /// Parse the untagged legacy layout.
    ///
    /// The ciphertext must be a non-empty whole number of AES blocks.
    pub fn parse(bytes: &[u8]) -> VaultResult<Self> {
        if bytes.len() < LEGACY_HEADER_SIZE + LEGACY_IV_SIZE {
            return Err(VaultError::TooShort {
                len: bytes.len(),
                min: LEGACY_HEADER_SIZE + LEGACY_IV_SIZE,
            });
        }
        let (header, ciphertext) = bytes.split_at(LEGACY_HEADER_SIZE);
        if ciphertext.len() % LEGACY_IV_SIZE != 0 {
            return Err(VaultError::UnsupportedFormat);
        }

        let mut salt = [0u8; SALT_SIZE];
        let mut iv = [0u8; LEGACY_IV_SIZE];
        salt.copy_from_slice(&header[..SALT_SIZE]);
        iv.copy_from_slice(&header[SALT_SIZE..]);

        Ok(Self {
            salt,
            iv,
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LEGACY_HEADER_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

/// Which format a buffer holds, as discovered by [`detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerKind {
    Current(ContainerHeader),
    Legacy(LegacyContainer),
}

/// Parse a V2.0 container.
///
/// Fails with [`VaultError::TooShort`] below 32 bytes and with
/// [`VaultError::UnsupportedFormat`] when the first 4 bytes are not `"V2.0"`.
/// The length check is a fast reject only: a valid container also needs a
/// 16-byte tag, which the AEAD layer enforces.
pub fn decode(bytes: &[u8]) -> VaultResult<ContainerHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(VaultError::TooShort {
            len: bytes.len(),
            min: HEADER_SIZE,
        });
    }
    if !has_v2_tag(bytes) {
        return Err(VaultError::UnsupportedFormat);
    }

    let (version, rest) = bytes.split_at(VERSION_V2.len());
    let (salt, rest) = rest.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut header = ContainerHeader {
        version: [0u8; 4],
        salt: [0u8; SALT_SIZE],
        nonce: [0u8; NONCE_SIZE],
        ciphertext: ciphertext.to_vec(),
    };
    header.version.copy_from_slice(version);
    header.salt.copy_from_slice(salt);
    header.nonce.copy_from_slice(nonce);
    Ok(header)
}

/// Serialize a container; inverse of [`decode`].
pub fn encode(header: &ContainerHeader) -> Vec<u8> {
    header.encode()
}

/// Classify a buffer as a current or legacy container.
///
/// Tagged buffers are always treated as V2.0. Untagged buffers are legacy only
/// when their length fits the block-aligned legacy layout; anything else is
/// rejected.
pub fn detect(bytes: &[u8]) -> VaultResult<ContainerKind> {
    if bytes.len() < HEADER_SIZE {
        return Err(VaultError::TooShort {
            len: bytes.len(),
            min: HEADER_SIZE,
        });
    }
    if has_v2_tag(bytes) {
        return decode(bytes).map(ContainerKind::Current);
    }
    LegacyContainer::parse(bytes).map(ContainerKind::Legacy)
}

/// True when `bytes` starts with the V2.0 version tag.
pub fn has_v2_tag(bytes: &[u8]) -> bool {
    bytes.starts_with(&VERSION_V2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContainerHeader {
        ContainerHeader::v2([0x11; SALT_SIZE], [0x22; NONCE_SIZE], vec![0x33; 40])
    }

    #[test]
    fn test_encode_layout() {
        let bytes = sample().encode();

        assert_eq!(&bytes[..4], b"V2.0");
        assert_eq!(&bytes[4..20], &[0x11; 16]);
        assert_eq!(&bytes[20..32], &[0x22; 12]);
        assert_eq!(&bytes[32..], &[0x33; 40][..]);
        assert_eq!(bytes.len(), HEADER_SIZE + 40);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let header = sample();
        assert_eq!(decode(&encode(&header)).unwrap(), header);
    }

    #[test]
    fn test_decode_too_short() {
        let result = decode(b"V2.0 short");
        assert!(matches!(result, Err(VaultError::TooShort { len: 10, min: 32 })));
    }

    #[test]
    fn test_decode_accepts_exactly_header() {
        let mut bytes = VERSION_V2.to_vec();
        bytes.extend_from_slice(&[0u8; SALT_SIZE + NONCE_SIZE]);
        let header = decode(&bytes).unwrap();
        assert!(header.ciphertext.is_empty());
    }

    #[test]
    fn test_decode_unknown_tag() {
        let mut bytes = sample().encode();
        bytes[..4].copy_from_slice(b"V3.0");
        assert!(matches!(decode(&bytes), Err(VaultError::UnsupportedFormat)));
    }

    #[test]
    fn test_detect_current() {
        let bytes = sample().encode();
        assert!(matches!(detect(&bytes), Ok(ContainerKind::Current(_))));
    }

    #[test]
    fn test_detect_legacy() {
        let legacy = LegacyContainer {
            salt: [1; SALT_SIZE],
            iv: [2; LEGACY_IV_SIZE],
            ciphertext: vec![3; 32],
        };
        match detect(&legacy.encode()).unwrap() {
            ContainerKind::Legacy(parsed) => assert_eq!(parsed, legacy),
            other => panic!("expected legacy, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_rejects_unaligned_untagged() {
        let bytes = vec![0xEEu8; LEGACY_HEADER_SIZE + 17];
        assert!(matches!(detect(&bytes), Err(VaultError::UnsupportedFormat)));
    }

    #[test]
    fn test_legacy_requires_ciphertext_block() {
        let bytes = vec![0u8; LEGACY_HEADER_SIZE];
        assert!(matches!(
            LegacyContainer::parse(&bytes),
            Err(VaultError::TooShort { .. })
        ));
    }
}
