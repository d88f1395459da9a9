//! Upload/preview boundary helpers
//!
//! These compose key generation, encryption and the envelope codec into the
//! two calls the surrounding application needs. Key material crosses the
//! boundary as raw bytes; [`EncryptionKey::to_hex`] covers text transports.

use crate::cipher::{decrypt, Encryptor};
use crate::envelope::Envelope;
use crate::error::CryptoResult;
use crate::keys::EncryptionKey;

/// Generate a fresh object key, encrypt `plaintext`, and serialize the envelope.
///
/// Uses OS entropy for both the key and the IV.
pub fn encrypt_and_envelope(plaintext: &[u8]) -> CryptoResult<(String, EncryptionKey)> {
    encrypt_and_envelope_with(&Encryptor::default(), plaintext)
}

/// Same as [`encrypt_and_envelope`] with an explicit encryptor (and so an
/// explicit random source).
pub fn encrypt_and_envelope_with(
    encryptor: &Encryptor,
    plaintext: &[u8],
) -> CryptoResult<(String, EncryptionKey)> {
    let key = encryptor.key_generator().generate_key()?;
    let envelope = encryptor.encrypt(plaintext, &key)?;
    Ok((envelope.serialize(), key))
}

/// Parse an envelope string and decrypt it with raw key bytes.
///
/// Key length is checked before the envelope is parsed.
pub fn decrypt_envelope(envelope: &str, key_bytes: &[u8]) -> CryptoResult<Vec<u8>> {
    let key = EncryptionKey::from_slice(key_bytes)?;
    let envelope = Envelope::parse(envelope)?;
    decrypt(&envelope, &key)
}
