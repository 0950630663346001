use serde::{Deserialize, Serialize};

/// A time-bound exclusive hold on one slot, owned by the lock store.
///
/// At most one active (non-expired) claim exists per `(pool, slot_name)`
/// pair at any instant, as observed by a single lock store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Pool the slot belongs to
    pub pool: String,
    /// Name of the claimed slot
    pub slot_name: String,
    /// Opaque token proving ownership on release/renew/validate
    pub lease_id: String,
    /// Identity of the claimant
    pub holder: String,
    /// When the claim was made (ms since epoch)
    pub claimed_at: u64,
    /// When the claim lapses (ms since epoch)
    pub expires_at: u64,
}

impl Claim {
    pub fn new(
        pool: String,
        slot_name: String,
        lease_id: String,
        holder: String,
        ttl_ms: u64,
        now: u64,
    ) -> Self {
        Self {
            pool,
            slot_name,
            lease_id,
            holder,
            claimed_at: now,
            expires_at: now + ttl_ms,
        }
    }

    /// An expired claim is inert: it never blocks allocation and never
    /// passes lease validation.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

/// Read-only projection of one slot's occupancy. Derived on demand,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotStatus {
    pub slot_name: String,
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<Claim>,
}

impl SlotStatus {
    pub fn free(slot_name: impl Into<String>) -> Self {
        Self {
            slot_name: slot_name.into(),
            claimed: false,
            claim: None,
        }
    }

    pub fn held(claim: Claim) -> Self {
        Self {
            slot_name: claim.slot_name.clone(),
            claimed: true,
            claim: Some(claim),
        }
    }
}
