//! Reachability checks for the envelope and key stores

use anyhow::Result;
use opendal::Operator;

/// Listing the root is enough to prove the backend answers.
pub async fn check_health(op: &Operator) -> Result<()> {
    op.list("/")
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("store unreachable: {e}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHealth {
    pub envelopes: Option<String>,
    pub keys: Option<String>,
}

impl VaultHealth {
    pub fn is_healthy(&self) -> bool {
        self.envelopes.is_none() && self.keys.is_none()
    }
}

/// Check both stores. Each field holds the failure, if any.
pub async fn check_vault(envelopes: &Operator, keys: &Operator) -> VaultHealth {
    let (env, key) = (check_health(envelopes).await, check_health(keys).await);
    VaultHealth {
        envelopes: env.err().map(|e| format!("{e:#}")),
        keys: key.err().map(|e| format!("{e:#}")),
    }
}
