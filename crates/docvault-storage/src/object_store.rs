//! Object store adapter: persists envelope strings and their keys
//!
//! The crypto core never decides where keys live. This adapter keeps them
//! in a second operator so a reader of the envelope store alone learns
//! nothing about plaintext.

use async_trait::async_trait;
use docvault_crypto::EncryptionKey;
use opendal::Operator;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Persistence contract for one encrypted object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist an envelope and its key under `object_id`, replacing any previous pair.
    async fn store(&self, object_id: &str, envelope: &str, key: &EncryptionKey)
        -> StorageResult<()>;

    /// Fetch the envelope and key stored under `object_id`.
    async fn retrieve(&self, object_id: &str) -> StorageResult<(String, EncryptionKey)>;

    /// Destroy the key, then the envelope. Removing a missing object is not an error.
    async fn remove(&self, object_id: &str) -> StorageResult<()>;
}

/// [`ObjectStore`] over two OpenDAL operators.
#[derive(Debug, Clone)]
pub struct OpendalObjectStore {
    envelopes: Operator,
    keys: Operator,
}

impl OpendalObjectStore {
    pub fn new(envelopes: Operator, keys: Operator) -> Self {
        Self { envelopes, keys }
    }

    /// The operator holding envelopes (records share it).
    pub fn envelope_operator(&self) -> &Operator {
        &self.envelopes
    }

    pub fn key_operator(&self) -> &Operator {
        &self.keys
    }
}

fn envelope_path(object_id: &str) -> String {
    format!("envelopes/{object_id}.env")
}

fn key_path(object_id: &str) -> String {
    format!("keys/{object_id}.key")
}

/// Object ids become path segments; only `[A-Za-z0-9_-]` is allowed.
pub fn validate_object_id(object_id: &str) -> StorageResult<()> {
    let valid = !object_id.is_empty()
        && object_id.len() <= 128
        && object_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidRequest(format!(
            "invalid object id: {object_id:?}"
        )))
    }
}

#[async_trait]
impl ObjectStore for OpendalObjectStore {
    async fn store(
        &self,
        object_id: &str,
        envelope: &str,
        key: &EncryptionKey,
    ) -> StorageResult<()> {
        validate_object_id(object_id)?;

        let kpath = key_path(object_id);
        self.keys.write(&kpath, key.to_hex().into_bytes()).await?;

        let epath = envelope_path(object_id);
        if let Err(e) = self.envelopes.write(&epath, envelope.to_owned().into_bytes()).await {
            // Do not leave a key behind for an envelope that was never written
            if let Err(cleanup) = self.keys.delete(&kpath).await {
                warn!(object_id, error = %cleanup, "failed to remove orphaned key");
            }
            return Err(e.into());
        }

        debug!(object_id, envelope_len = envelope.len(), "stored object");
        Ok(())
    }

    async fn retrieve(&self, object_id: &str) -> StorageResult<(String, EncryptionKey)> {
        validate_object_id(object_id)?;

        let epath = envelope_path(object_id);
        let raw = self
            .envelopes
            .read(&epath)
            .await
            .map_err(|e| StorageError::from_read(&epath, e))?;
        let envelope =
            String::from_utf8(raw.to_vec()).map_err(|e| StorageError::InvalidRecord {
                path: epath.clone(),
                reason: format!("envelope is not UTF-8: {e}"),
            })?;

        let kpath = key_path(object_id);
        let raw_key = self
            .keys
            .read(&kpath)
            .await
            .map_err(|e| StorageError::from_read(&kpath, e))?;
        let key_hex = String::from_utf8(raw_key.to_vec()).map_err(|e| {
            StorageError::InvalidRecord {
                path: kpath.clone(),
                reason: format!("key is not UTF-8: {e}"),
            }
        })?;
        let key = EncryptionKey::from_hex(&key_hex)?;

        Ok((envelope, key))
    }

    async fn remove(&self, object_id: &str) -> StorageResult<()> {
        validate_object_id(object_id)?;

        self.keys.delete(&key_path(object_id)).await?;
        self.envelopes.delete(&envelope_path(object_id)).await?;
        debug!(object_id, "removed object and key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_crypto::encrypt_and_envelope;

    fn memory_operator() -> Operator {
        Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish()
    }

    #[test]
    fn test_validate_object_id() {
        assert!(validate_object_id("3f2c9a1e-0b7d-4c55-9f1e-2a6d8c0b4e71").is_ok());
        assert!(validate_object_id("doc_01").is_ok());
        assert!(validate_object_id("").is_err());
        assert!(validate_object_id("../keys/other").is_err());
        assert!(validate_object_id("a/b").is_err());
        assert!(validate_object_id(&"x".repeat(129)).is_err());
    }

    #[tokio::test]
    async fn test_store_retrieve_roundtrip() {
        let store = OpendalObjectStore::new(memory_operator(), memory_operator());
        let (envelope, key) = encrypt_and_envelope(b"payload").unwrap();

        store.store("obj1", &envelope, &key).await.unwrap();
        let (got_env, got_key) = store.retrieve("obj1").await.unwrap();

        assert_eq!(got_env, envelope);
        assert_eq!(got_key.as_bytes(), key.as_bytes());
    }

    #[tokio::test]
    async fn test_key_not_in_envelope_store() {
        let envelopes = memory_operator();
        let keys = memory_operator();
        let store = OpendalObjectStore::new(envelopes.clone(), keys.clone());
        let (envelope, key) = encrypt_and_envelope(b"payload").unwrap();

        store.store("obj1", &envelope, &key).await.unwrap();

        let env_text = String::from_utf8(envelopes.read("envelopes/obj1.env").await.unwrap().to_vec()).unwrap();
        assert!(!env_text.contains(&key.to_hex()));
        assert!(envelopes.read("keys/obj1.key").await.is_err());
        assert!(keys.read("keys/obj1.key").await.is_ok());
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found() {
        let store = OpendalObjectStore::new(memory_operator(), memory_operator());
        assert!(matches!(
            store.retrieve("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let envelopes = memory_operator();
        let store = OpendalObjectStore::new(envelopes.clone(), memory_operator());
        let (envelope, _key) = encrypt_and_envelope(b"payload").unwrap();
        envelopes
            .write("envelopes/lonely.env", envelope.into_bytes())
            .await
            .unwrap();

        match store.retrieve("lonely").await {
            Err(StorageError::NotFound(path)) => assert_eq!(path, "keys/lonely.key"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_corrupt_stored_key_is_crypto_error() {
        let keys = memory_operator();
        let store = OpendalObjectStore::new(memory_operator(), keys.clone());
        let (envelope, key) = encrypt_and_envelope(b"payload").unwrap();
        store.store("obj1", &envelope, &key).await.unwrap();

        keys.write("keys/obj1.key", b"00ff".to_vec()).await.unwrap();
        assert!(matches!(
            store.retrieve("obj1").await,
            Err(StorageError::Crypto(
                docvault_crypto::CryptoError::InvalidKeyLength { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_remove_destroys_key() {
        let store = OpendalObjectStore::new(memory_operator(), memory_operator());
        let (envelope, key) = encrypt_and_envelope(b"payload").unwrap();
        store.store("obj1", &envelope, &key).await.unwrap();

        store.remove("obj1").await.unwrap();
        assert!(matches!(
            store.retrieve("obj1").await,
            Err(StorageError::NotFound(_))
        ));
        // idempotent
        store.remove("obj1").await.unwrap();
    }
}
