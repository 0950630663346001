//! Orchestration layer: binds pool configuration, the lock store, and the
//! secret store, and produces/consumes the caller-facing [`Lease`].

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{BackendConfig, Config, LockBackend, SecretBackend};
use crate::error::{Error, Result};
use crate::lockstore::LockStore;
use crate::lockstore_in_memory::InMemoryLockStore;
use crate::secretstore::SecretStore;
use crate::secretstore_in_memory::InMemorySecretStore;
use crate::types::{Lease, SlotStatus};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One engine per process invocation; holds everything an operation
/// needs, passed by reference. No process-wide mutable state.
pub struct Engine {
    config: Config,
    lock_store: Box<dyn LockStore>,
    secret_store: Box<dyn SecretStore>,
    identity: String,
}

impl Engine {
    pub fn new(
        config: Config,
        lock_store: Box<dyn LockStore>,
        secret_store: Box<dyn SecretStore>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            config,
            lock_store,
            secret_store,
            identity: identity.into(),
        }
    }

    /// Build an engine with the backends the config selects.
    pub fn from_config(config: Config, identity: impl Into<String>) -> Result<Self> {
        let lock_store = new_lock_store(&config.backend)?;
        let secret_store = new_secret_store(&config.backend)?;
        Ok(Self::new(config, lock_store, secret_store, identity))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Claim a free slot in the named pool and return the lease the
    /// caller should persist.
    pub fn claim(&self, pool_name: &str) -> Result<Lease> {
        let pool = self.config.pool(pool_name)?;

        let claim = self.lock_store.claim(
            pool_name,
            &pool.slot_names(),
            &self.identity,
            pool.ttl_ms(),
            now_ms(),
        )?;

        let secrets = pool.secrets_for_slot(&claim.slot_name);
        Ok(Lease::from_claim(claim, secrets))
    }

    /// Release the claim described by the lease.
    pub fn release(&self, lease: &Lease) -> Result<()> {
        let now = now_ms();
        self.lock_store.validate_lease(&lease.pool, &lease.lease_id, now)?;
        self.lock_store.release(&lease.pool, &lease.lease_id, now)
    }

    /// Release whatever claim this engine's identity holds in the pool.
    /// Recovery path for a lost lease file.
    pub fn release_by_holder(&self, pool_name: &str) -> Result<()> {
        self.config.pool(pool_name)?;
        self.lock_store
            .release_by_holder(pool_name, &self.identity, now_ms())
    }

    /// Read a single env var value from the claimed slot.
    pub fn read_key(&self, lease: &Lease, key: &str) -> Result<String> {
        let name = self.secret_name(lease, key)?;
        self.lock_store
            .validate_lease(&lease.pool, &lease.lease_id, now_ms())?;
        self.secret_store.read(&name)
    }

    /// Read every env var value the slot carries.
    pub fn read_all(&self, lease: &Lease) -> Result<std::collections::BTreeMap<String, String>> {
        self.lock_store
            .validate_lease(&lease.pool, &lease.lease_id, now_ms())?;

        let mut values = std::collections::BTreeMap::new();
        for (key, name) in &lease.secrets {
            let value = self.secret_store.read(name)?;
            values.insert(key.clone(), value);
        }
        Ok(values)
    }

    /// Write a single env var value to the claimed slot.
    pub fn write_key(&self, lease: &Lease, key: &str, value: &str) -> Result<()> {
        let name = self.secret_name(lease, key)?;
        self.lock_store
            .validate_lease(&lease.pool, &lease.lease_id, now_ms())?;
        self.secret_store.write(&name, value)
    }

    /// Resolve the derived backend secret name for a key without
    /// contacting either store.
    pub fn secret_name(&self, lease: &Lease, key: &str) -> Result<String> {
        lease
            .secret_name(key)
            .map(str::to_string)
            .ok_or_else(|| Error::KeyNotDefined {
                key: key.to_string(),
            })
    }

    /// Extend the lease TTL. The already-resolved secret names carry
    /// over; the secret store is never contacted.
    pub fn renew(&self, lease: &Lease) -> Result<Lease> {
        let pool = self.config.pool(&lease.pool)?;
        let claim =
            self.lock_store
                .renew(&lease.pool, &lease.lease_id, pool.ttl_ms(), now_ms())?;
        Ok(Lease::from_claim(claim, lease.secrets.clone()))
    }

    /// Occupancy of every slot in the named pool, in config order.
    pub fn status(&self, pool_name: &str) -> Result<Vec<SlotStatus>> {
        let pool = self.config.pool(pool_name)?;
        self.lock_store
            .status(pool_name, &pool.slot_names(), now_ms())
    }

    /// Close both stores, reporting every failure rather than stopping
    /// at the first.
    pub fn close(&self) -> Result<()> {
        let mut errs = Vec::new();
        if let Err(e) = self.lock_store.close() {
            errs.push(e.to_string());
        }
        if let Err(e) = self.secret_store.close() {
            errs.push(e.to_string());
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(Error::Close(errs))
        }
    }
}

fn new_lock_store(backend: &BackendConfig) -> Result<Box<dyn LockStore>> {
    match &backend.lock {
        LockBackend::Memory => Ok(Box::new(InMemoryLockStore::new())),
        #[cfg(feature = "sqlite")]
        LockBackend::Sqlite { path } => Ok(Box::new(
            crate::lockstore_sqlite::SqliteLockStore::open(path)?,
        )),
        #[cfg(not(feature = "sqlite"))]
        LockBackend::Sqlite { .. } => Err(Error::InvalidConfig {
            reason: "sqlite lock backend requested but the 'sqlite' feature is not enabled".into(),
        }),
    }
}

fn new_secret_store(backend: &BackendConfig) -> Result<Box<dyn SecretStore>> {
    match &backend.secrets {
        SecretBackend::Memory => Ok(Box::new(InMemorySecretStore::new())),
        #[cfg(feature = "sqlite")]
        SecretBackend::Sqlite { path } => Ok(Box::new(
            crate::secretstore_sqlite::SqliteSecretStore::open(path)?,
        )),
        #[cfg(not(feature = "sqlite"))]
        SecretBackend::Sqlite { .. } => Err(Error::InvalidConfig {
            reason: "sqlite secret backend requested but the 'sqlite' feature is not enabled"
                .into(),
        }),
    }
}
