//! Textual envelope codec
//!
//! Envelope format:
//! ```text
//! <iv: 16 bytes hex>:<ciphertext: N bytes hex>:<tag: 16 bytes hex>
//! ```
//!
//! All segments are lowercase hex. The `:` delimiter is outside the hex
//! alphabet so the three parts always split unambiguously. The ciphertext
//! segment may be empty (zero-length plaintext).

use std::fmt;
use std::str::FromStr;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::Iv;
use crate::{DELIMITER, IV_SIZE, TAG_SIZE};

/// A 128-bit GCM authentication tag.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthTag([u8; TAG_SIZE]);

impl AuthTag {
    pub fn from_bytes(bytes: [u8; TAG_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }
}

impl fmt::Debug for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthTag({})", hex::encode(self.0))
    }
}

/// One encrypted object: IV, ciphertext, and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: Iv,
    pub ciphertext: Vec<u8>,
    pub tag: AuthTag,
}

impl Envelope {
    pub fn new(iv: Iv, ciphertext: Vec<u8>, tag: AuthTag) -> Self {
        Self {
            iv,
            ciphertext,
            tag,
        }
    }

    pub fn serialize(&self) -> String {
        serialize(&self.iv, &self.ciphertext, &self.tag)
    }

    pub fn parse(encoded: &str) -> CryptoResult<Self> {
        let (iv, ciphertext, tag) = parse(encoded)?;
        Ok(Self::new(iv, ciphertext, tag))
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Envelope {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        Self::parse(s)
    }
}

/// Render the three envelope parts as `iv:ciphertext:tag`.
pub fn serialize(iv: &Iv, ciphertext: &[u8], tag: &AuthTag) -> String {
    let mut out = String::with_capacity(2 * (IV_SIZE + ciphertext.len() + TAG_SIZE) + 2);
    out.push_str(&hex::encode(iv.as_bytes()));
    out.push(DELIMITER);
    out.push_str(&hex::encode(ciphertext));
    out.push(DELIMITER);
    out.push_str(&hex::encode(tag.as_bytes()));
    out
}

/// Split and validate an envelope string.
pub fn parse(encoded: &str) -> CryptoResult<(Iv, Vec<u8>, AuthTag)> {
    let segments: Vec<&str> = encoded.split(DELIMITER).collect();
    let [iv_hex, ct_hex, tag_hex] = segments.as_slice() else {
        return Err(CryptoError::MalformedEnvelope(format!(
            "expected 3 segments separated by '{DELIMITER}', found {}",
            segments.len()
        )));
    };

    let iv = decode_fixed::<IV_SIZE>("iv", iv_hex)?;
    let ciphertext = decode_segment("ciphertext", ct_hex)?;
    let tag = decode_fixed::<TAG_SIZE>("tag", tag_hex)?;

    Ok((Iv::from_bytes(iv), ciphertext, AuthTag::from_bytes(tag)))
}

fn decode_fixed<const N: usize>(name: &str, segment: &str) -> CryptoResult<[u8; N]> {
    let bytes = decode_segment(name, segment)?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::MalformedEnvelope(format!(
            "{name} segment must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Strict lowercase hex decode. `hex::decode` alone would accept uppercase.
fn decode_segment(name: &str, segment: &str) -> CryptoResult<Vec<u8>> {
    if !segment.len().is_multiple_of(2) {
        return Err(CryptoError::MalformedEnvelope(format!(
            "{name} segment has odd length {}",
            segment.len()
        )));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
    {
        return Err(CryptoError::MalformedEnvelope(format!(
            "{name} segment contains non-hex character {bad:?}"
        )));
    }
    hex::decode(segment)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("{name} segment: {e}")))
}
