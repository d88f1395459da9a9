//! docvault-crypto: encryption-at-rest for uploaded documents
//!
//! Every stored object gets its own random 256-bit key. Plaintext is sealed
//! with AES-256-GCM under a fresh 128-bit IV and the result is persisted as a
//! textual envelope:
//!
//! ```text
//! <32 hex chars: IV>:<hex ciphertext>:<32 hex chars: GCM tag>
//! ```
//!
//! Pipeline:
//! ```text
//! upload:   plaintext → generate_key → Encryptor::encrypt → Envelope::serialize → object store
//! preview:  object store → Envelope::parse → decrypt → plaintext
//! ```
//!
//! Randomness comes from an injected [`SecureRandomSource`]; production code
//! uses [`OsRandom`]; tests can substitute `SeededRandom` (feature
//! `test-util`).

pub mod blob;
pub mod cipher;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod random;

pub use blob::{decrypt_envelope, encrypt_and_envelope, encrypt_and_envelope_with};
pub use cipher::{decrypt, Encryptor};
pub use envelope::{parse, serialize, AuthTag, Envelope};
pub use error::{CryptoError, CryptoResult};
pub use keys::{generate_iv, generate_key, EncryptionKey, Iv, KeyGenerator};
pub use random::{OsRandom, SecureRandomSource};
#[cfg(any(test, feature = "test-util"))]
pub use random::SeededRandom;

/// Size of a per-object AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the GCM initialization vector in bytes (128-bit)
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Separator between envelope segments; never produced by lowercase hex
pub const DELIMITER: char = ':';
