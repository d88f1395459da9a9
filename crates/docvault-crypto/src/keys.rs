//! Per-object key and IV generation

use std::sync::Arc;

use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::random::{OsRandom, SecureRandomSource};
use crate::{IV_SIZE, KEY_SIZE};

/// A per-object 256-bit AES key. Zeroized on drop.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a key from untrusted bytes. Anything but exactly 32 bytes is rejected.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self::from_bytes(key))
    }

    /// Decode a key transported as hex (either case).
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let mut decoded = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl TryFrom<&[u8]> for EncryptionKey {
    type Error = CryptoError;

    fn try_from(bytes: &[u8]) -> CryptoResult<Self> {
        Self::from_slice(bytes)
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 128-bit GCM initialization vector. Not secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    pub fn from_bytes(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Iv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Iv({})", hex::encode(self.0))
    }
}

/// Produces keys and IVs from a shared [`SecureRandomSource`].
#[derive(Clone)]
pub struct KeyGenerator {
    rng: Arc<dyn SecureRandomSource>,
}

impl KeyGenerator {
    pub fn new(rng: Arc<dyn SecureRandomSource>) -> Self {
        Self { rng }
    }

    /// Generator backed by OS entropy.
    pub fn os() -> Self {
        Self::new(Arc::new(OsRandom))
    }

    /// Generate a random 256-bit object key.
    pub fn generate_key(&self) -> CryptoResult<EncryptionKey> {
        let mut bytes = [0u8; KEY_SIZE];
        self.rng.fill(&mut bytes)?;
        let key = EncryptionKey::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Generate a random 128-bit IV.
    pub fn generate_iv(&self) -> CryptoResult<Iv> {
        let mut bytes = [0u8; IV_SIZE];
        self.rng.fill(&mut bytes)?;
        Ok(Iv::from_bytes(bytes))
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::os()
    }
}

impl std::fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGenerator").finish_non_exhaustive()
    }
}

/// Generate a random 256-bit object key from OS entropy.
pub fn generate_key() -> CryptoResult<EncryptionKey> {
    KeyGenerator::os().generate_key()
}

/// Generate a random 128-bit IV from OS entropy.
pub fn generate_iv() -> CryptoResult<Iv> {
    KeyGenerator::os().generate_iv()
}
