//! AES-256-GCM encryption/decryption of whole objects
//!
//! GCM runs with a 128-bit IV (not the common 96-bit nonce) and an empty
//! AAD. The tag is kept detached so ciphertext length always equals
//! plaintext length.

use std::sync::Arc;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::envelope::{AuthTag, Envelope};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{EncryptionKey, Iv, KeyGenerator};
use crate::random::SecureRandomSource;
use crate::TAG_SIZE;

/// AES-256-GCM with a 16-byte IV and 16-byte tag.
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Seals plaintext under a caller-supplied key with a fresh IV per call.
#[derive(Debug, Clone, Default)]
pub struct Encryptor {
    keygen: KeyGenerator,
}

impl Encryptor {
    pub fn new(keygen: KeyGenerator) -> Self {
        Self { keygen }
    }

    pub fn with_random(rng: Arc<dyn SecureRandomSource>) -> Self {
        Self::new(KeyGenerator::new(rng))
    }

    /// The generator used for IVs; also the right place to mint object keys.
    pub fn key_generator(&self) -> &KeyGenerator {
        &self.keygen
    }

    /// Encrypt `plaintext` under `key`.
    ///
    /// Returns an envelope whose ciphertext is exactly `plaintext.len()` bytes.
    pub fn encrypt(&self, plaintext: &[u8], key: &EncryptionKey) -> CryptoResult<Envelope> {
        let iv = self.keygen.generate_iv()?;
        seal_with_iv(plaintext, key, iv)
    }
}

pub(crate) fn seal_with_iv(
    plaintext: &[u8],
    key: &EncryptionKey,
    iv: Iv,
) -> CryptoResult<Envelope> {
    let cipher = Aes256Gcm128::new(GenericArray::from_slice(key.as_bytes()));

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv.as_bytes()), b"", &mut buffer)
        .map_err(|e| {
            buffer.zeroize();
            CryptoError::Encryption(format!("AES-256-GCM seal failed: {e}"))
        })?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);

    debug!(bytes = plaintext.len(), "sealed object");
    Ok(Envelope::new(iv, buffer, AuthTag::from_bytes(tag_bytes)))
}

/// Decrypt and verify an envelope.
///
/// All-or-nothing: on tag mismatch the working buffer is wiped and only
/// [`CryptoError::Authentication`] is returned.
pub fn decrypt(envelope: &Envelope, key: &EncryptionKey) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm128::new(GenericArray::from_slice(key.as_bytes()));

    let mut buffer = envelope.ciphertext.clone();
    let verified = cipher.decrypt_in_place_detached(
        GenericArray::from_slice(envelope.iv.as_bytes()),
        b"",
        &mut buffer,
        GenericArray::from_slice(envelope.tag.as_bytes()),
    );

    match verified {
        Ok(()) => {
            debug!(bytes = buffer.len(), "opened object");
            Ok(buffer)
        }
        Err(_) => {
            buffer.zeroize();
            warn!(
                ciphertext_bytes = envelope.ciphertext.len(),
                "envelope failed authentication"
            );
            Err(CryptoError::Authentication)
        }
    }
}
