//! SQLite-backed lock store.
//! One row per slot; every claim/release/renew runs inside an IMMEDIATE
//! transaction spanning the whole scan-and-write, so two concurrent
//! claimers can never both win the same slot.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! slotlock-core = { path = "../slotlock-core", features = ["sqlite"] }
//! ```

use std::sync::{Mutex, MutexGuard};

use nanoid::nanoid;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::{Error, Result};
use crate::lockstore::LockStore;
use crate::types::{Claim, SlotStatus};

/// How long a writer waits on a lock held by another connection.
pub(crate) const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Transactional lock store backed by SQLite.
///
/// Rows are keyed by `(pool, slot_name)`. Releasing a claim keeps the row
/// and clears `lease_id`/`holder`, so a cleared row and a missing row are
/// both free. Lease and holder lookups go through secondary indexes
/// because the caller does not know which slot a lease ID maps to.
pub struct SqliteLockStore {
    conn: Mutex<Connection>,
}

impl SqliteLockStore {
    /// Open (or create) the lock database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::backend(format!("opening lock database '{path}'"), e))?;

        // Wait out a competing writer's transaction before reporting busy.
        // Set first: the pragmas and schema below take write locks too.
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::backend("setting busy_timeout", e))?;

        // WAL keeps concurrent readers off the writers' backs
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| Error::backend("setting journal_mode", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| Error::backend("setting synchronous", e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS slots (
                pool        TEXT NOT NULL,
                slot_name   TEXT NOT NULL,
                lease_id    TEXT NOT NULL DEFAULT '',
                holder      TEXT NOT NULL DEFAULT '',
                claimed_at  INTEGER NOT NULL DEFAULT 0,
                expires_at  INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (pool, slot_name)
            );
            CREATE INDEX IF NOT EXISTS idx_slots_lease ON slots(pool, lease_id);
            CREATE INDEX IF NOT EXISTS idx_slots_holder ON slots(pool, holder);",
        )
        .map_err(|e| Error::backend("creating slots schema", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn guard(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_slot(tx: &Transaction, pool: &str, slot_name: &str) -> Result<Option<SlotRow>> {
        tx.query_row(
            "SELECT lease_id, holder, claimed_at, expires_at
             FROM slots WHERE pool = ?1 AND slot_name = ?2",
            params![pool, slot_name],
            |row| {
                Ok(SlotRow {
                    lease_id: row.get(0)?,
                    holder: row.get(1)?,
                    claimed_at: row.get(2)?,
                    expires_at: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| Error::backend(format!("reading slot '{slot_name}'"), e))
    }

    fn find_by_lease(tx: &Transaction, pool: &str, lease_id: &str) -> Result<Option<Claim>> {
        if lease_id.is_empty() {
            // Released rows carry an empty lease_id; never match them.
            return Ok(None);
        }

        tx.query_row(
            "SELECT slot_name, lease_id, holder, claimed_at, expires_at
             FROM slots WHERE pool = ?1 AND lease_id = ?2",
            params![pool, lease_id],
            |row| {
                Ok(Claim {
                    pool: pool.to_string(),
                    slot_name: row.get(0)?,
                    lease_id: row.get(1)?,
                    holder: row.get(2)?,
                    claimed_at: row.get(3)?,
                    expires_at: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(|e| Error::backend("querying for lease", e))
    }

    fn clear_slot(tx: &Transaction, pool: &str, slot_name: &str) -> Result<()> {
        tx.execute(
            "UPDATE slots SET lease_id = '', holder = '' WHERE pool = ?1 AND slot_name = ?2",
            params![pool, slot_name],
        )
        .map_err(|e| Error::backend(format!("clearing slot '{slot_name}'"), e))?;
        Ok(())
    }

    fn commit(tx: Transaction) -> Result<()> {
        tx.commit()
            .map_err(|e| Error::backend("committing lock transaction", e))
    }
}

struct SlotRow {
    lease_id: String,
    holder: String,
    claimed_at: u64,
    expires_at: u64,
}

impl SlotRow {
    fn is_free(&self, now: u64) -> bool {
        self.lease_id.is_empty() || now > self.expires_at
    }

    fn into_claim(self, pool: &str, slot_name: &str) -> Claim {
        Claim {
            pool: pool.to_string(),
            slot_name: slot_name.to_string(),
            lease_id: self.lease_id,
            holder: self.holder,
            claimed_at: self.claimed_at,
            expires_at: self.expires_at,
        }
    }
}

impl LockStore for SqliteLockStore {
    fn claim(
        &self,
        pool: &str,
        slot_names: &[String],
        holder: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<Claim> {
        let mut conn = self.guard();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::backend("starting claim transaction", e))?;

        let mut rows = Vec::with_capacity(slot_names.len());
        for name in slot_names {
            rows.push(Self::read_slot(&tx, pool, name)?);
        }

        // Idempotent re-claim: hand back our own unexpired claim untouched.
        for (name, row) in slot_names.iter().zip(&rows) {
            if let Some(row) = row {
                if !row.lease_id.is_empty() && row.holder == holder && now <= row.expires_at {
                    let claim = Claim {
                        pool: pool.to_string(),
                        slot_name: name.clone(),
                        lease_id: row.lease_id.clone(),
                        holder: row.holder.clone(),
                        claimed_at: row.claimed_at,
                        expires_at: row.expires_at,
                    };
                    return Ok(claim);
                }
            }
        }

        // First fit over free slots in caller order.
        for (name, row) in slot_names.iter().zip(&rows) {
            let free = match row {
                Some(row) => row.is_free(now),
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

                tx.execute(
                    "INSERT INTO slots (pool, slot_name, lease_id, holder, claimed_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (pool, slot_name) DO UPDATE SET
                         lease_id = excluded.lease_id,
                         holder = excluded.holder,
                         claimed_at = excluded.claimed_at,
                         expires_at = excluded.expires_at",
                    params![
                        claim.pool,
                        claim.slot_name,
                        claim.lease_id,
                        claim.holder,
                        claim.claimed_at,
                        claim.expires_at,
                    ],
                )
                .map_err(|e| Error::backend(format!("writing slot '{name}'"), e))?;

                Self::commit(tx)?;
                return Ok(claim);
            }
        }

        Err(Error::PoolExhausted {
            pool: pool.to_string(),
        })
    }

    fn release(&self, pool: &str, lease_id: &str, _now: u64) -> Result<()> {
        let mut conn = self.guard();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::backend("starting release transaction", e))?;

        let claim = Self::find_by_lease(&tx, pool, lease_id)?.ok_or(Error::LeaseNotFound)?;
        Self::clear_slot(&tx, pool, &claim.slot_name)?;
        Self::commit(tx)
    }

    fn release_by_holder(&self, pool: &str, holder: &str, now: u64) -> Result<()> {
        let mut conn = self.guard();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::backend("starting release transaction", e))?;

        let slot_name: Option<String> = tx
            .query_row(
                "SELECT slot_name FROM slots
                 WHERE pool = ?1 AND holder = ?2 AND lease_id != '' AND expires_at >= ?3",
                params![pool, holder, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::backend("querying for holder", e))?;

        let slot_name = slot_name.ok_or(Error::LeaseNotFound)?;
        Self::clear_slot(&tx, pool, &slot_name)?;
        Self::commit(tx)
    }

    fn renew(&self, pool: &str, lease_id: &str, ttl_ms: u64, now: u64) -> Result<Claim> {
        let mut conn = self.guard();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::backend("starting renew transaction", e))?;

        let mut claim = Self::find_by_lease(&tx, pool, lease_id)?.ok_or(Error::LeaseNotFound)?;
        if claim.is_expired(now) {
            return Err(Error::LeaseExpired);
        }

        claim.expires_at = now + ttl_ms;
        tx.execute(
            "UPDATE slots SET expires_at = ?1 WHERE pool = ?2 AND slot_name = ?3",
            params![claim.expires_at, pool, claim.slot_name],
        )
        .map_err(|e| Error::backend("updating lease expiry", e))?;

        Self::commit(tx)?;
        Ok(claim)
    }

    fn status(&self, pool: &str, slot_names: &[String], now: u64) -> Result<Vec<SlotStatus>> {
        let conn = self.guard();

        let mut statuses = Vec::with_capacity(slot_names.len());
        for name in slot_names {
            let row = conn
                .query_row(
                    "SELECT lease_id, holder, claimed_at, expires_at
                     FROM slots WHERE pool = ?1 AND slot_name = ?2",
                    params![pool, name],
                    |row| {
                        Ok(SlotRow {
                            lease_id: row.get(0)?,
                            holder: row.get(1)?,
                            claimed_at: row.get(2)?,
                            expires_at: row.get(3)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| Error::backend(format!("reading slot '{name}'"), e))?;

            statuses.push(match row {
                Some(row) if !row.is_free(now) => SlotStatus::held(row.into_claim(pool, name)),
                _ => SlotStatus::free(name.clone()),
            });
        }

        Ok(statuses)
    }

    fn validate_lease(&self, pool: &str, lease_id: &str, now: u64) -> Result<Claim> {
        if lease_id.is_empty() {
            return Err(Error::LeaseNotFound);
        }

        let conn = self.guard();
        let claim = conn
            .query_row(
                "SELECT slot_name, lease_id, holder, claimed_at, expires_at
                 FROM slots WHERE pool = ?1 AND lease_id = ?2",
                params![pool, lease_id],
                |row| {
                    Ok(Claim {
                        pool: pool.to_string(),
                        slot_name: row.get(0)?,
                        lease_id: row.get(1)?,
                        holder: row.get(2)?,
                        claimed_at: row.get(3)?,
                        expires_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::backend("querying for lease", e))?
            .ok_or(Error::LeaseNotFound)?;

        if claim.is_expired(now) {
            return Err(Error::LeaseExpired);
        }
        Ok(claim)
    }

    fn close(&self) -> Result<()> {
        // The connection is closed when the store drops; WAL checkpoints
        // happen automatically at that point.
        Ok(())
    }
}
