use serde::{Deserialize, Serialize};

/// Metadata for one stored document.
///
/// The file bytes themselves never appear here: they live encrypted in the
/// envelope store, and the object key lives in the key store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub content_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Plaintext size in bytes
    pub size: u64,
    /// Unix milliseconds
    pub created_at: u64,
    /// Unix milliseconds
    pub updated_at: u64,
}

/// Decrypted file bytes plus their declared content type. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PlaintextBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaintextBlob")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An upload as received from the surrounding application.
#[derive(Clone)]
pub struct UploadRequest {
    pub owner: String,
    pub title: String,
    pub content_type: String,
    pub tags: Vec<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("owner", &self.owner)
            .field("title", &self.title)
            .field("content_type", &self.content_type)
            .field("tags", &self.tags)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Trim tags, drop empty ones, and remove duplicates keeping first occurrence.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
