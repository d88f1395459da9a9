//! Integration tests for the upload → preview pipeline.
//!
//! Verifies that uploaded bytes are only ever stored as envelopes, that keys
//! land in the separate key store, and that preview returns the original
//! bytes with their content type.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use docvault_core::config::DocumentsConfig;
use docvault_core::types::UploadRequest;
use docvault_crypto::{decrypt_envelope, CryptoError, EncryptionKey, Encryptor, Envelope};
use docvault_storage::{
    DocumentCatalog, DocumentVault, ObjectStore, OpendalObjectStore, StorageError, StorageResult,
};
use opendal::Operator;

fn memory_operator() -> Operator {
    Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}

fn upload(owner: &str, title: &str, content_type: &str, bytes: &[u8]) -> UploadRequest {
    UploadRequest {
        owner: owner.into(),
        title: title.into(),
        content_type: content_type.into(),
        tags: vec!["inbox".into()],
        bytes: bytes.to_vec(),
    }
}

struct Fixture {
    vault: DocumentVault,
    envelopes: Operator,
    keys: Operator,
}

fn fixture(limits: DocumentsConfig) -> Fixture {
    let envelopes = memory_operator();
    let keys = memory_operator();
    let vault = DocumentVault::from_operators(envelopes.clone(), keys.clone(), limits);
    Fixture {
        vault,
        envelopes,
        keys,
    }
}

async fn read_string(op: &Operator, path: &str) -> String {
    String::from_utf8(op.read(path).await.unwrap().to_vec()).unwrap()
}

#[tokio::test]
async fn upload_then_open_roundtrip() {
    let fx = fixture(DocumentsConfig::default());
    let original = b"%PDF-1.7 lease agreement, signed";

    let record = fx
        .vault
        .upload(upload("alice", "  Lease  ", "application/pdf", original))
        .await
        .expect("upload should succeed");

    assert_eq!(record.title, "Lease");
    assert_eq!(record.size, original.len() as u64);
    assert_eq!(record.tags, vec!["inbox"]);

    let blob = fx.vault.open("alice", &record.id).await.unwrap();
    assert_eq!(blob.bytes, original);
    assert_eq!(blob.content_type, "application/pdf");
}

#[tokio::test]
async fn stored_envelope_has_wire_format_and_no_plaintext() {
    let fx = fixture(DocumentsConfig::default());
    let original = b"hello world";
    let record = fx
        .vault
        .upload(upload("alice", "greeting", "text/plain", original))
        .await
        .unwrap();

    let envelope = read_string(&fx.envelopes, &format!("envelopes/{}.env", record.id)).await;
    let parsed = Envelope::parse(&envelope).unwrap();
    assert_eq!(parsed.ciphertext.len(), original.len());
    assert!(!envelope.contains(&hex::encode(original)));

    let key_hex = read_string(&fx.keys, &format!("keys/{}.key", record.id)).await;
    assert_eq!(key_hex.len(), 64);
    assert!(
        fx.envelopes
            .read(&format!("keys/{}.key", record.id))
            .await
            .is_err(),
        "key must not be written to the envelope store"
    );

    let key = EncryptionKey::from_hex(&key_hex).unwrap();
    assert_eq!(decrypt_envelope(&envelope, key.as_bytes()).unwrap(), original);
}

#[tokio::test]
async fn empty_file_roundtrip() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "empty", "text/plain", b""))
        .await
        .unwrap();
    let blob = fx.vault.open("alice", &record.id).await.unwrap();
    assert!(blob.bytes.is_empty());
}

#[tokio::test]
async fn tampered_envelope_fails_authentication() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "receipt", "image/png", b"\x89PNG fake image"))
        .await
        .unwrap();

    let path = format!("envelopes/{}.env", record.id);
    let envelope = read_string(&fx.envelopes, &path).await;
    let mut parsed = Envelope::parse(&envelope).unwrap();
    parsed.ciphertext[0] ^= 0x01;
    fx.envelopes
        .write(&path, parsed.serialize().into_bytes())
        .await
        .unwrap();

    let err = fx.vault.open("alice", &record.id).await.unwrap_err();
    assert!(matches!(err, StorageError::Crypto(CryptoError::Authentication)));
    assert_eq!(err.user_message(), "cannot process document");
}

#[tokio::test]
async fn corrupted_envelope_is_malformed_not_authentication() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "notes", "text/plain", b"notes"))
        .await
        .unwrap();

    fx.envelopes
        .write(&format!("envelopes/{}.env", record.id), b"00:00:00".to_vec())
        .await
        .unwrap();

    assert!(matches!(
        fx.vault.open("alice", &record.id).await,
        Err(StorageError::Crypto(CryptoError::MalformedEnvelope(_)))
    ));
}

#[tokio::test]
async fn list_is_scoped_to_owner() {
    let fx = fixture(DocumentsConfig::default());
    let a1 = fx
        .vault
        .upload(upload("alice", "one", "text/plain", b"1"))
        .await
        .unwrap();
    let a2 = fx
        .vault
        .upload(upload("alice", "two", "text/plain", b"2"))
        .await
        .unwrap();
    fx.vault
        .upload(upload("bob", "three", "text/plain", b"3"))
        .await
        .unwrap();

    let listed = fx.vault.list("alice").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|r| r.owner == "alice"));
    assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert!(ids.contains(&a1.id.as_str()));
    assert!(ids.contains(&a2.id.as_str()));
}

#[tokio::test]
async fn other_owner_cannot_open_update_or_delete() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "private", "text/plain", b"secret"))
        .await
        .unwrap();

    assert!(matches!(
        fx.vault.open("mallory", &record.id).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        fx.vault
            .update_tags("mallory", &record.id, &["pwned".to_string()])
            .await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        fx.vault.delete("mallory", &record.id).await,
        Err(StorageError::NotFound(_))
    ));

    assert_eq!(
        fx.vault.open("alice", &record.id).await.unwrap().bytes,
        b"secret"
    );
}

#[tokio::test]
async fn update_tags_normalizes() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "taxes", "application/pdf", b"1040"))
        .await
        .unwrap();

    let tags = vec![
        " tax ".to_string(),
        "2024".to_string(),
        "tax".to_string(),
        "".to_string(),
    ];
    let updated = fx.vault.update_tags("alice", &record.id, &tags).await.unwrap();
    assert_eq!(updated.tags, vec!["tax", "2024"]);
    assert!(updated.updated_at >= record.updated_at);

    let reread = fx.vault.get("alice", &record.id).await.unwrap();
    assert_eq!(reread.tags, vec!["tax", "2024"]);
}

#[tokio::test]
async fn delete_destroys_record_envelope_and_key() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "old", "text/plain", b"bye"))
        .await
        .unwrap();

    fx.vault.delete("alice", &record.id).await.unwrap();

    assert!(matches!(
        fx.vault.open("alice", &record.id).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(fx
        .keys
        .read(&format!("keys/{}.key", record.id))
        .await
        .is_err());
    assert!(fx
        .envelopes
        .read(&format!("envelopes/{}.env", record.id))
        .await
        .is_err());
}

#[tokio::test]
async fn upload_validation() {
    let fx = fixture(DocumentsConfig {
        max_upload_bytes: 8,
        allowed_content_types: vec!["text/plain".into()],
    });

    for bad in [
        upload("", "t", "text/plain", b"x"),
        upload("alice", "   ", "text/plain", b"x"),
        upload("alice", "t", "", b"x"),
        upload("alice", "t", "application/x-msdownload", b"x"),
        upload("alice", "t", "text/plain", b"123456789"),
    ] {
        assert!(
            matches!(
                fx.vault.upload(bad.clone()).await,
                Err(StorageError::InvalidRequest(_))
            ),
            "expected rejection for {bad:?}"
        );
    }

    assert!(fx.vault.list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn each_upload_gets_its_own_key() {
    let fx = fixture(DocumentsConfig::default());
    let r1 = fx
        .vault
        .upload(upload("alice", "a", "text/plain", b"same"))
        .await
        .unwrap();
    let r2 = fx
        .vault
        .upload(upload("alice", "b", "text/plain", b"same"))
        .await
        .unwrap();

    let k1 = read_string(&fx.keys, &format!("keys/{}.key", r1.id)).await;
    let k2 = read_string(&fx.keys, &format!("keys/{}.key", r2.id)).await;
    assert_ne!(k1, k2);
}

#[tokio::test]
async fn fs_backend_roundtrip() {
    let tmp = tempfile::TempDir::new().unwrap();
    let envelopes = Operator::new(
        opendal::services::Fs::default().root(&tmp.path().join("objects").to_string_lossy()),
    )
    .unwrap()
    .finish();
    let keys = Operator::new(
        opendal::services::Fs::default().root(&tmp.path().join("keys").to_string_lossy()),
    )
    .unwrap()
    .finish();
    let vault = DocumentVault::from_operators(envelopes, keys, DocumentsConfig::default());

    let record = vault
        .upload(upload("alice", "scan", "image/jpeg", b"\xff\xd8\xff jpeg"))
        .await
        .unwrap();
    assert!(tmp
        .path()
        .join("keys/keys")
        .join(format!("{}.key", record.id))
        .exists());

    let blob = vault.open("alice", &record.id).await.unwrap();
    assert_eq!(blob.bytes, b"\xff\xd8\xff jpeg");
    assert_eq!(vault.list("alice").await.unwrap().len(), 1);
}

/// Object store whose `remove` fails while `fail_remove` is set.
struct FlakyRemoveStore {
    inner: OpendalObjectStore,
    fail_remove: AtomicBool,
}

#[async_trait]
impl ObjectStore for FlakyRemoveStore {
    async fn store(&self, id: &str, envelope: &str, key: &EncryptionKey) -> StorageResult<()> {
        self.inner.store(id, envelope, key).await
    }

    async fn retrieve(&self, id: &str) -> StorageResult<(String, EncryptionKey)> {
        self.inner.retrieve(id).await
    }

    async fn remove(&self, id: &str) -> StorageResult<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(opendal::Error::new(
                opendal::ErrorKind::Unexpected,
                "backend went away",
            )));
        }
        self.inner.remove(id).await
    }
}

#[tokio::test]
async fn failed_delete_keeps_record_and_can_be_retried() {
    let envelopes = memory_operator();
    let keys = memory_operator();
    let store = Arc::new(FlakyRemoveStore {
        inner: OpendalObjectStore::new(envelopes.clone(), keys.clone()),
        fail_remove: AtomicBool::new(false),
    });
    let vault = DocumentVault::new(
        store.clone(),
        DocumentCatalog::new(envelopes.clone()),
        Encryptor::default(),
        DocumentsConfig::default(),
    );

    let record = vault
        .upload(upload("alice", "contract", "application/pdf", b"terms"))
        .await
        .unwrap();
    let key_path = format!("keys/{}.key", record.id);

    store.fail_remove.store(true, Ordering::SeqCst);
    assert!(matches!(
        vault.delete("alice", &record.id).await,
        Err(StorageError::Backend(_))
    ));
    assert_eq!(vault.get("alice", &record.id).await.unwrap(), record);
    assert!(keys.read(&key_path).await.is_ok());

    store.fail_remove.store(false, Ordering::SeqCst);
    vault.delete("alice", &record.id).await.unwrap();
    assert!(keys.read(&key_path).await.is_err());
    assert!(matches!(
        vault.get("alice", &record.id).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn corrupt_record_of_another_owner_does_not_break_listing() {
    let fx = fixture(DocumentsConfig::default());
    let record = fx
        .vault
        .upload(upload("alice", "mine", "text/plain", b"ok"))
        .await
        .unwrap();
    fx.envelopes
        .write("documents/bobjunk.json", b"{not json".to_vec())
        .await
        .unwrap();

    let listed = fx.vault.list("alice").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, record.id);
}
