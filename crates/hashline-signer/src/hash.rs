//! Hash primitives consumed by the signing stages.
//!
//! `checksum` is CRC-32 (IEEE) rendered as an unsigned decimal string;
//! `digest` is a lowercase hex hash (SHA-256, BLAKE3 or MD5).
//! Both are pure functions of `data + salt`. The optional delays make each
//! call sleep, which is how concurrency becomes observable in tests and demos.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use md5::Md5;
use sha2::{Digest, Sha256};

/// The two primitives a signer needs. Calls may block; stages run them on
/// the blocking pool.
pub trait HashPrimitives: Send + Sync + 'static {
    /// Fast non-cryptographic checksum.
    fn checksum(&self, data: &str) -> String;

    /// Expensive cryptographic digest.
    fn digest(&self, data: &str) -> String;
}

/// Digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
    /// Not collision resistant; kept to reproduce legacy CRC32/MD5 signatures.
    Md5,
}

impl DigestAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
            Self::Md5 => "md5",
        }
    }

    fn hex_digest(self, bytes: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
            Self::Blake3 => blake3::hash(bytes).to_hex().to_string(),
            Self::Md5 => hex::encode(Md5::digest(bytes)),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRC-32 of `bytes` as a decimal string.
pub fn crc32_decimal(bytes: &[u8]) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_string()
}

/// Library-backed primitives with optional salt and simulated latency.
#[derive(Debug, Clone, Default)]
pub struct StandardHashes {
    pub algorithm: DigestAlgorithm,
    /// Appended to every input before hashing
    pub salt: String,
    pub checksum_delay: Duration,
    pub digest_delay: Duration,
}

impl StandardHashes {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn with_delays(mut self, checksum: Duration, digest: Duration) -> Self {
        self.checksum_delay = checksum;
        self.digest_delay = digest;
        self
    }

    fn salted(&self, data: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(data.len() + self.salt.len());
        buf.extend_from_slice(data.as_bytes());
        buf.extend_from_slice(self.salt.as_bytes());
        buf
    }
}

impl HashPrimitives for StandardHashes {
    fn checksum(&self, data: &str) -> String {
        let out = crc32_decimal(&self.salted(data));
        if !self.checksum_delay.is_zero() {
            std::thread::sleep(self.checksum_delay);
        }
        out
    }

    fn digest(&self, data: &str) -> String {
        let out = self.algorithm.hex_digest(&self.salted(data));
        if !self.digest_delay.is_zero() {
            std::thread::sleep(self.digest_delay);
        }
        out
    }
}
