use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Claim;

/// The caller-facing view of a [`Claim`]: the claim fields plus the
/// resolved secret name for every env key the slot carries.
///
/// This is the record the CLI persists to the local lease file and the
/// only state a caller needs across process invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub pool: String,
    pub slot_name: String,
    pub lease_id: String,
    /// Env var key -> derived backend secret name
    pub secrets: BTreeMap<String, String>,
    pub holder: String,
    pub claimed_at: u64,
    pub expires_at: u64,
}

impl Lease {
    /// Enrich a claim with the secret names resolved for its slot.
    pub fn from_claim(claim: Claim, secrets: BTreeMap<String, String>) -> Self {
        Self {
            pool: claim.pool,
            slot_name: claim.slot_name,
            lease_id: claim.lease_id,
            secrets,
            holder: claim.holder,
            claimed_at: claim.claimed_at,
            expires_at: claim.expires_at,
        }
    }

    /// The derived secret name for `key`, if the slot defines it.
    pub fn secret_name(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }
}
