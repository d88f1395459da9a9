//! docvault-storage: persistence for encrypted documents
//!
//! Layout across the two operators built from config:
//! ```text
//! envelope store:  envelopes/<id>.env      iv:ciphertext:tag
//!                  documents/<id>.json     DocumentRecord
//! key store:       keys/<id>.key           64 hex chars
//! ```
//!
//! Keys never share a store with the envelopes they open.

pub mod catalog;
pub mod error;
pub mod health;
pub mod object_store;
pub mod operator;
pub mod vault;

pub use catalog::DocumentCatalog;
pub use error::{StorageError, StorageResult};
pub use health::{check_health, check_vault, VaultHealth};
pub use object_store::{ObjectStore, OpendalObjectStore};
pub use operator::{build_operator, build_stores, S3Credentials};
pub use vault::DocumentVault;
