//! Upload and preview service
//!
//! Upload:   validate → new key → encrypt → store envelope + key → write record
//! Preview:  read record → retrieve envelope + key → decrypt → PlaintextBlob
//!
//! Every operation is scoped to an owner. A record owned by someone else is
//! reported as not found so ids cannot be probed.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use docvault_core::config::DocumentsConfig;
use docvault_core::types::{normalize_tags, DocumentRecord, PlaintextBlob, UploadRequest};
use docvault_crypto::{decrypt, encrypt_and_envelope_with, Encryptor, Envelope};
use opendal::Operator;
use tracing::{info, warn};

use crate::catalog::DocumentCatalog;
use crate::error::{StorageError, StorageResult};
use crate::object_store::{ObjectStore, OpendalObjectStore};

pub struct DocumentVault {
    store: Arc<dyn ObjectStore>,
    catalog: DocumentCatalog,
    encryptor: Encryptor,
    limits: DocumentsConfig,
}

impl DocumentVault {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        catalog: DocumentCatalog,
        encryptor: Encryptor,
        limits: DocumentsConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            encryptor,
            limits,
        }
    }

    /// Vault over an envelope operator (which also holds records) and a key operator.
    pub fn from_operators(envelopes: Operator, keys: Operator, limits: DocumentsConfig) -> Self {
        let catalog = DocumentCatalog::new(envelopes.clone());
        let store = Arc::new(OpendalObjectStore::new(envelopes, keys));
        Self::new(store, catalog, Encryptor::default(), limits)
    }

    /// Encrypt and persist a new document.
    pub async fn upload(&self, request: UploadRequest) -> StorageResult<DocumentRecord> {
        self.validate(&request)?;

        let id = uuid::Uuid::new_v4().to_string();
        let (envelope, key) = encrypt_and_envelope_with(&self.encryptor, &request.bytes)?;
        self.store.store(&id, &envelope, &key).await?;

        let now = now_millis();
        let record = DocumentRecord {
            id: id.clone(),
            owner: request.owner,
            title: request.title.trim().to_string(),
            content_type: request.content_type,
            tags: normalize_tags(&request.tags),
            size: request.bytes.len() as u64,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.catalog.put(&record).await {
            if let Err(cleanup) = self.store.remove(&id).await {
                warn!(id = %id, error = %cleanup, "failed to remove object after record write failed");
            }
            return Err(e);
        }

        info!(id = %record.id, owner = %record.owner, size = record.size, "document uploaded");
        Ok(record)
    }

    /// The owner's documents, newest first.
    pub async fn list(&self, owner: &str) -> StorageResult<Vec<DocumentRecord>> {
        self.catalog.list_for_owner(owner).await
    }

    pub async fn get(&self, owner: &str, id: &str) -> StorageResult<DocumentRecord> {
        let record = self.catalog.get(id).await?;
        if record.owner != owner {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(record)
    }

    /// Replace a document's tags.
    pub async fn update_tags(
        &self,
        owner: &str,
        id: &str,
        tags: &[String],
    ) -> StorageResult<DocumentRecord> {
        let mut record = self.get(owner, id).await?;
        record.tags = normalize_tags(tags);
        record.updated_at = now_millis().max(record.updated_at);
        self.catalog.put(&record).await?;
        Ok(record)
    }

    /// Decrypt a document for preview or download.
    pub async fn open(&self, owner: &str, id: &str) -> StorageResult<PlaintextBlob> {
        let record = self.get(owner, id).await?;
        let (envelope, key) = self.store.retrieve(id).await?;
        let envelope = Envelope::parse(&envelope)?;
        let bytes = decrypt(&envelope, &key)?;
        Ok(PlaintextBlob {
            content_type: record.content_type,
            bytes,
        })
    }

    /// Delete the key, the envelope, and the record.
    ///
    /// The record goes last so a failed delete can be retried.
    pub async fn delete(&self, owner: &str, id: &str) -> StorageResult<()> {
        self.get(owner, id).await?;
        self.store.remove(id).await?;
        self.catalog.delete(id).await?;
        info!(id, owner, "document deleted");
        Ok(())
    }

    fn validate(&self, request: &UploadRequest) -> StorageResult<()> {
        if request.owner.trim().is_empty() {
            return Err(StorageError::InvalidRequest("owner is required".into()));
        }
        if request.title.trim().is_empty() {
            return Err(StorageError::InvalidRequest("title is required".into()));
        }
        if request.content_type.trim().is_empty() {
            return Err(StorageError::InvalidRequest("content type is required".into()));
        }
        if !self.limits.accepts_content_type(&request.content_type) {
            return Err(StorageError::InvalidRequest(format!(
                "content type not accepted: {}",
                request.content_type
            )));
        }
        if request.bytes.len() as u64 > self.limits.max_upload_bytes {
            return Err(StorageError::InvalidRequest(format!(
                "file too large: {} bytes (limit {})",
                request.bytes.len(),
                self.limits.max_upload_bytes
            )));
        }
        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
