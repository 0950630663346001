use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration: backend selection plus the pool catalog.
/// Loaded by the CLI from YAML and treated as read-only by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub pools: BTreeMap<String, PoolConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub lock: LockBackend,
    pub secrets: SecretBackend,
}

/// Closed set of lock backends. Selection happens once, in the engine
/// factory; nothing else branches on the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LockBackend {
    Memory,
    Sqlite { path: String },
}

/// Closed set of secret backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SecretBackend {
    Memory,
    Sqlite { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Ordered, unique slot names. Claim order follows this list.
    pub slots: Vec<SlotConfig>,
    /// Env var keys every slot in the pool carries.
    pub keys: Vec<String>,
    /// Lease time-to-live in seconds.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub name: String,
}

impl PoolConfig {
    /// The ordered list of slot names in the pool.
    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_secs * 1000
    }

    /// Env var key -> derived secret name, for every key the pool declares.
    pub fn secrets_for_slot(&self, slot_name: &str) -> BTreeMap<String, String> {
        self.keys
            .iter()
            .map(|key| (key.clone(), secret_name(slot_name, key)))
            .collect()
    }
}

/// Derive the backend secret name for a slot/key pair.
/// Convention: `{slot-name}-{kebab-case-key}`, e.g. `"app-alpha"` +
/// `"SHOPIFY_API_SECRET"` -> `"app-alpha-shopify-api-secret"`.
pub fn secret_name(slot_name: &str, key: &str) -> String {
    let kebab = key.to_lowercase().replace('_', "-");
    format!("{slot_name}-{kebab}")
}

impl Config {
    /// Reject configurations the engine cannot operate on: empty pool
    /// catalogs, pools without slots or keys, duplicate or blank slot
    /// names, and non-positive TTLs.
    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(invalid("at least one pool must be defined"));
        }

        for (name, pool) in &self.pools {
            if pool.slots.is_empty() {
                return Err(invalid(format!("pool '{name}': at least one slot is required")));
            }
            if pool.keys.is_empty() {
                return Err(invalid(format!("pool '{name}': at least one key is required")));
            }
            if pool.ttl_secs == 0 {
                return Err(invalid(format!("pool '{name}': ttl_secs must be > 0")));
            }

            let mut seen = std::collections::HashSet::new();
            for (i, slot) in pool.slots.iter().enumerate() {
                if slot.name.is_empty() {
                    return Err(invalid(format!("pool '{name}': slot {i}: name is required")));
                }
                if !seen.insert(slot.name.as_str()) {
                    return Err(invalid(format!(
                        "pool '{name}': duplicate slot name '{}'",
                        slot.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Look up a pool, or fail with `PoolNotFound`.
    pub fn pool(&self, pool_name: &str) -> Result<&PoolConfig> {
        self.pools.get(pool_name).ok_or_else(|| Error::PoolNotFound {
            pool: pool_name.to_string(),
        })
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        reason: reason.into(),
    }
}
