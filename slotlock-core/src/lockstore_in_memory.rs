use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use nanoid::nanoid;

use crate::error::{Error, Result};
use crate::lockstore::LockStore;
use crate::types::{Claim, SlotStatus};

/// In-process lock store for local development and tests.
///
/// A single mutex guards the whole map and is held for the full duration
/// of every operation, which gives the same serializability the
/// transactional backend gets from its transaction layer. Not suitable
/// for multi-host coordination.
pub struct InMemoryLockStore {
    // Map of (pool, slot name) -> Claim
    slots: Mutex<HashMap<(String, String), Claim>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<(String, String), Claim>> {
        // A panic mid-operation leaves only whole claims behind, so a
        // poisoned map is still coherent.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStore for InMemoryLockStore {
    fn claim(
        &self,
        pool: &str,
        slot_names: &[String],
        holder: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<Claim> {
        let mut slots = self.guard();

        // Idempotent re-claim: an unexpired claim we already hold comes
        // back unchanged, with no new lease ID and no TTL reset.
        for name in slot_names {
            if let Some(existing) = slots.get(&(pool.to_string(), name.clone())) {
                if existing.holder == holder && !existing.is_expired(now) {
                    return Ok(existing.clone());
                }
            }
        }

        // First fit: a slot is free if nothing claimed it or the claim
        // has expired.
        for name in slot_names {
            let key = (pool.to_string(), name.clone());
            let free = match slots.get(&key) {
                Some(existing) => existing.is_expired(now),
                None => true,
            };

            if free {
                let claim = Claim::new(
                    pool.to_string(),
                    name.clone(),
                    nanoid!(),
                    holder.to_string(),
                    ttl_ms,
                    now,
                );
                slots.insert(key, claim.clone());
                return Ok(claim);
            }
        }

        Err(Error::PoolExhausted {
            pool: pool.to_string(),
        })
    }

    fn release(&self, pool: &str, lease_id: &str, _now: u64) -> Result<()> {
        let mut slots = self.guard();

        let key = slots
            .iter()
            .find(|(_, c)| c.pool == pool && c.lease_id == lease_id)
            .map(|(k, _)| k.clone());

        match key {
            Some(key) => {
                slots.remove(&key);
                Ok(())
            }
            None => Err(Error::LeaseNotFound),
        }
    }

    fn release_by_holder(&self, pool: &str, holder: &str, now: u64) -> Result<()> {
        let mut slots = self.guard();

        let key = slots
            .iter()
            .find(|(_, c)| c.pool == pool && c.holder == holder && !c.is_expired(now))
            .map(|(k, _)| k.clone());

        match key {
            Some(key) => {
                slots.remove(&key);
                Ok(())
            }
            None => Err(Error::LeaseNotFound),
        }
    }

    fn renew(&self, pool: &str, lease_id: &str, ttl_ms: u64, now: u64) -> Result<Claim> {
        let mut slots = self.guard();

        for claim in slots.values_mut() {
            if claim.pool == pool && claim.lease_id == lease_id {
                if claim.is_expired(now) {
                    return Err(Error::LeaseExpired);
                }
                claim.expires_at = now + ttl_ms;
                return Ok(claim.clone());
            }
        }

        Err(Error::LeaseNotFound)
    }

    fn status(&self, pool: &str, slot_names: &[String], now: u64) -> Result<Vec<SlotStatus>> {
        let slots = self.guard();

        Ok(slot_names
            .iter()
            .map(|name| {
                match slots.get(&(pool.to_string(), name.clone())) {
                    Some(claim) if !claim.is_expired(now) => SlotStatus::held(claim.clone()),
                    _ => SlotStatus::free(name.clone()),
                }
            })
            .collect())
    }

    fn validate_lease(&self, pool: &str, lease_id: &str, now: u64) -> Result<Claim> {
        let slots = self.guard();

        for claim in slots.values() {
            if claim.pool == pool && claim.lease_id == lease_id {
                if claim.is_expired(now) {
                    return Err(Error::LeaseExpired);
                }
                return Ok(claim.clone());
            }
        }

        Err(Error::LeaseNotFound)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
