use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DocvaultError, DocvaultResult};

const DEFAULT_ENVELOPE_ROOT: &str = "~/.local/share/docvault/objects";
const DEFAULT_KEY_ROOT: &str = "~/.local/share/docvault/keys";

/// Top-level configuration (loaded from docvault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocvaultConfig {
    pub log: LogConfig,
    /// Where envelopes and document records live
    pub storage: StoreConfig,
    /// Where per-object keys live; kept apart from `storage`
    pub keys: StoreConfig,
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    /// Local directory tree
    Fs,
    /// S3-compatible object storage
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StorageBackend,
    /// Root directory for the fs backend (defaults differ for envelopes and keys)
    pub root: Option<PathBuf>,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Refuse plaintext HTTP endpoints
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Reject uploads larger than this (default: 50 MiB)
    pub max_upload_bytes: u64,
    /// Accepted content types; empty accepts anything
    pub allowed_content_types: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root: None,
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "docvault".into(),
            enforce_tls: false,
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_content_types: Vec::new(),
        }
    }
}

impl DocvaultConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> DocvaultResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| DocvaultError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> DocvaultResult<Self> {
        toml::from_str(content).map_err(|e| DocvaultError::Config(e.to_string()))
    }

    /// Resolved fs root for envelopes and records.
    pub fn envelope_root(&self) -> PathBuf {
        resolve_root(self.storage.root.as_deref(), DEFAULT_ENVELOPE_ROOT)
    }

    /// Resolved fs root for key material.
    pub fn key_root(&self) -> PathBuf {
        resolve_root(self.keys.root.as_deref(), DEFAULT_KEY_ROOT)
    }
}

impl DocumentsConfig {
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        self.allowed_content_types.is_empty()
            || self
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }
}

fn resolve_root(configured: Option<&Path>, default: &str) -> PathBuf {
    let path = configured.unwrap_or_else(|| Path::new(default));
    expand_tilde(path)
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}
