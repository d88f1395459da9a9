//! Document metadata records, stored as JSON next to the envelopes

use docvault_core::types::DocumentRecord;
use opendal::Operator;
use tracing::warn;

use crate::error::{StorageError, StorageResult};
use crate::object_store::validate_object_id;

const RECORD_PREFIX: &str = "documents/";

#[derive(Debug, Clone)]
pub struct DocumentCatalog {
    op: Operator,
}

impl DocumentCatalog {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    fn record_path(id: &str) -> String {
        format!("{RECORD_PREFIX}{id}.json")
    }

    /// Insert or replace a record.
    pub async fn put(&self, record: &DocumentRecord) -> StorageResult<()> {
        validate_object_id(&record.id)?;
        let path = Self::record_path(&record.id);
        let json = serde_json::to_vec_pretty(record).map_err(|e| StorageError::InvalidRecord {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.op.write(&path, json).await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> StorageResult<DocumentRecord> {
        validate_object_id(id)?;
        let path = Self::record_path(id);
        let data = self
            .op
            .read(&path)
            .await
            .map_err(|e| StorageError::from_read(&path, e))?;
        parse_record(&path, &data.to_vec())
    }

    /// All records belonging to `owner`, newest first. Records that fail to
    /// parse are logged and skipped.
    pub async fn list_for_owner(&self, owner: &str) -> StorageResult<Vec<DocumentRecord>> {
        let entries = match self.op.list(RECORD_PREFIX).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.path();
            if !path.ends_with(".json") {
                continue;
            }
            let data = self
                .op
                .read(path)
                .await
                .map_err(|e| StorageError::from_read(path, e))?;
            // One unreadable record must not hide everyone else's documents
            match parse_record(path, &data.to_vec()) {
                Ok(record) if record.owner == owner => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(path, error = %e, "skipping unreadable document record"),
            }
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        validate_object_id(id)?;
        self.op.delete(&Self::record_path(id)).await?;
        Ok(())
    }
}

fn parse_record(path: &str, data: &[u8]) -> StorageResult<DocumentRecord> {
    serde_json::from_slice(data).map_err(|e| StorageError::InvalidRecord {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
