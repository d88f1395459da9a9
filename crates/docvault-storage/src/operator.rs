//! OpenDAL Operator factory for docvault storage backends

use std::path::Path;

use anyhow::{Context, Result};
use docvault_core::config::{DocvaultConfig, StorageBackend, StoreConfig};
use opendal::Operator;

/// S3 access credentials (read from the environment by the CLI)
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Build an OpenDAL Operator for one store.
///
/// `fs_root` is only used by the fs backend. S3 endpoints over plaintext HTTP
/// are refused when `enforce_tls` is set and logged otherwise.
pub fn build_operator(
    cfg: &StoreConfig,
    fs_root: &Path,
    creds: Option<&S3Credentials>,
) -> Result<Operator> {
    let op = match cfg.backend {
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .context("creating OpenDAL memory operator")?
            .finish(),
        StorageBackend::Fs => {
            let root = fs_root.to_string_lossy();
            Operator::new(opendal::services::Fs::default().root(&root))
                .with_context(|| format!("creating OpenDAL fs operator at {root}"))?
                .finish()
        }
        StorageBackend::S3 => {
            check_endpoint_tls(cfg)?;
            let creds = creds.context("S3 backend selected but no credentials were provided")?;
            // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
            let mut builder = opendal::services::S3::default()
                .endpoint(&cfg.endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket)
                .access_key_id(&creds.access_key_id)
                .secret_access_key(&creds.secret_access_key);
            if let Some(root) = &cfg.root {
                builder = builder.root(&root.to_string_lossy());
            }
            Operator::new(builder)
                .context("creating OpenDAL S3 operator")?
                .finish()
        }
    };

    Ok(op
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        ))
}

/// Build the (envelope, key) operator pair from config.
pub fn build_stores(
    config: &DocvaultConfig,
    creds: Option<&S3Credentials>,
) -> Result<(Operator, Operator)> {
    let envelope_root = config.envelope_root();
    let key_root = config.key_root();

    if let Some(location) = shared_location(config, &envelope_root, &key_root) {
        tracing::warn!(
            location = %location,
            "keys and envelopes share one location; anyone who can read it can decrypt every document"
        );
    }

    let envelopes = build_operator(&config.storage, &envelope_root, creds)
        .context("building envelope store")?;
    let keys = build_operator(&config.keys, &key_root, creds).context("building key store")?;
    Ok((envelopes, keys))
}

/// The location both stores resolve to, if they are not kept apart.
fn shared_location(
    config: &DocvaultConfig,
    envelope_root: &Path,
    key_root: &Path,
) -> Option<String> {
    let (env, keys) = (&config.storage, &config.keys);
    match (env.backend, keys.backend) {
        (StorageBackend::Fs, StorageBackend::Fs) if envelope_root == key_root => {
            Some(envelope_root.display().to_string())
        }
        (StorageBackend::S3, StorageBackend::S3)
            if env.endpoint == keys.endpoint
                && env.bucket == keys.bucket
                && env.root == keys.root =>
        {
            Some(format!("{}/{}", env.endpoint.trim_end_matches('/'), env.bucket))
        }
        _ => None,
    }
}

fn check_endpoint_tls(cfg: &StoreConfig) -> Result<()> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set enforce_tls = false for local development.",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted"
        );
    }
    Ok(())
}
