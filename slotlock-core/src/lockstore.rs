use crate::error::Result;
use crate::types::{Claim, SlotStatus};

/// Contract every lock backend must satisfy: exclusive, TTL-bounded
/// claims on pool slots, serialized across concurrent callers.
///
/// Implementations take `&self` and serialize internally (a mutex or a
/// backend transaction), so a single store instance can be shared across
/// threads. `now` is milliseconds since the Unix epoch, supplied by the
/// caller so expiry logic stays deterministic under test.
pub trait LockStore: Send + Sync {
    /// Atomically find or create a claim in the named pool.
    ///
    /// Scans `slot_names` in the given order twice: first for an
    /// unexpired claim already held by `holder` (returned unchanged, so
    /// retries are idempotent), then first-fit over free slots (no claim,
    /// cleared, or expired). Fails with [`Error::PoolExhausted`] when
    /// neither pass finds a slot.
    ///
    /// [`Error::PoolExhausted`]: crate::error::Error::PoolExhausted
    fn claim(
        &self,
        pool: &str,
        slot_names: &[String],
        holder: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<Claim>;

    /// Clear the claim whose lease ID matches.
    fn release(&self, pool: &str, lease_id: &str, now: u64) -> Result<()>;

    /// Clear the holder's active claim without requiring a lease token.
    /// Crash-recovery path for when the local lease file is lost.
    fn release_by_holder(&self, pool: &str, holder: &str, now: u64) -> Result<()>;

    /// Extend an unexpired claim to `now + ttl_ms`. Renewal is not
    /// resurrection: an expired lease fails with `LeaseExpired`.
    fn renew(&self, pool: &str, lease_id: &str, ttl_ms: u64, now: u64) -> Result<Claim>;

    /// One status entry per requested slot name, order-preserving.
    fn status(&self, pool: &str, slot_names: &[String], now: u64) -> Result<Vec<SlotStatus>>;

    /// Read-only freshness and ownership check. Called before every
    /// secret read/write and before release.
    fn validate_lease(&self, pool: &str, lease_id: &str, now: u64) -> Result<Claim>;

    /// Release backend resources.
    fn close(&self) -> Result<()>;
}

// A shared handle to a store is itself a store, so one backend instance
// can serve several engines (or threads) at once.
impl<T: LockStore + ?Sized> LockStore for std::sync::Arc<T> {
    fn claim(
        &self,
        pool: &str,
        slot_names: &[String],
        holder: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<Claim> {
        (**self).claim(pool, slot_names, holder, ttl_ms, now)
    }

    fn release(&self, pool: &str, lease_id: &str, now: u64) -> Result<()> {
        (**self).release(pool, lease_id, now)
    }

    fn release_by_holder(&self, pool: &str, holder: &str, now: u64) -> Result<()> {
        (**self).release_by_holder(pool, holder, now)
    }

    fn renew(&self, pool: &str, lease_id: &str, ttl_ms: u64, now: u64) -> Result<Claim> {
        (**self).renew(pool, lease_id, ttl_ms, now)
    }

    fn status(&self, pool: &str, slot_names: &[String], now: u64) -> Result<Vec<SlotStatus>> {
        (**self).status(pool, slot_names, now)
    }

    fn validate_lease(&self, pool: &str, lease_id: &str, now: u64) -> Result<Claim> {
        (**self).validate_lease(pool, lease_id, now)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
