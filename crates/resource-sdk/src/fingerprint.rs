//! Content fingerprints of serialized versions.
//!
//! Reconciliation treats two versions as the same when the digests of their
//! serialized bytes match. The digest algorithm is chosen by the archive.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

/// Digest used to detect versions that are already archived.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FingerprintStrategy {
    /// 128-bit MD5. Fast; a collision makes a new version look archived.
    #[default]
    Md5,
    /// 256-bit SHA-256.
    Sha256,
}

impl FingerprintStrategy {
    /// Digests serialized version bytes.
    #[must_use]
    pub fn fingerprint(self, bytes: &[u8]) -> Fingerprint {
        match self {
            Self::Md5 => Fingerprint::Md5(Md5::digest(bytes).into()),
            Self::Sha256 => Fingerprint::Sha256(Sha256::digest(bytes).into()),
        }
    }
}

/// The digest of one serialized version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// MD5 digest.
    Md5([u8; 16]),
    /// SHA-256 digest.
    Sha256([u8; 32]),
}

impl Fingerprint {
    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Md5(bytes) => bytes,
            Self::Sha256(bytes) => bytes,
        }
    }
}
