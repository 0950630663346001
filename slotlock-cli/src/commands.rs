use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use slotlock_core::engine::Engine;
use slotlock_core::types::SlotStatus;

use crate::leasefile;
use crate::EnvFormat;

pub fn claim(engine: &Engine, lease_path: &Path, pool: &str) -> Result<()> {
    // Refuse to stack claims: one lease file, one slot
    if let Ok(existing) = leasefile::load(lease_path) {
        bail!(
            "already holding slot '{}' in pool '{}' (lease: {}). Release it first with: slotlock release",
            existing.slot_name,
            existing.pool,
            existing.lease_id
        );
    }

    let lease = engine.claim(pool)?;
    leasefile::save(lease_path, &lease)?;

    eprintln!(
        "Claimed slot '{}' from pool '{}' (lease: {}, expires: {})",
        lease.slot_name,
        lease.pool,
        lease.lease_id,
        format_ts(lease.expires_at)
    );
    Ok(())
}

pub fn release(engine: &Engine, lease_path: &Path, pool: Option<&str>) -> Result<()> {
    if let Some(pool) = pool {
        // Crash recovery: release by holder identity, no lease file needed
        engine.release_by_holder(pool)?;
        eprintln!(
            "Released claim in pool '{}' (holder: {})",
            pool,
            engine.identity()
        );
        return Ok(());
    }

    let lease = leasefile::load(lease_path)?;
    engine.release(&lease)?;
    leasefile::delete(lease_path)?;

    eprintln!(
        "Released slot '{}' from pool '{}'",
        lease.slot_name, lease.pool
    );
    Ok(())
}

pub fn renew(engine: &Engine, lease_path: &Path) -> Result<()> {
    let lease = leasefile::load(lease_path)?;
    let renewed = engine.renew(&lease)?;
    leasefile::save(lease_path, &renewed)?;

    eprintln!(
        "Renewed lease for slot '{}' in pool '{}' (new expiry: {})",
        renewed.slot_name,
        renewed.pool,
        format_ts(renewed.expires_at)
    );
    Ok(())
}

pub fn status(engine: &Engine, pool: &str, json: bool) -> Result<()> {
    let statuses = engine.status(pool)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    print_status_table(&statuses);
    Ok(())
}

fn print_status_table(statuses: &[SlotStatus]) {
    let width = statuses
        .iter()
        .map(|s| s.slot_name.len())
        .chain(std::iter::once("SLOT".len()))
        .max()
        .unwrap_or(4);

    println!("{:<width$}  {:<8}  {:<24}  EXPIRES", "SLOT", "STATUS", "HOLDER");
    for s in statuses {
        match &s.claim {
            Some(claim) if s.claimed => println!(
                "{:<width$}  {:<8}  {:<24}  {}",
                s.slot_name,
                "claimed",
                claim.holder,
                format_ts(claim.expires_at)
            ),
            _ => println!("{:<width$}  {:<8}  {:<24}  -", s.slot_name, "free", "-"),
        }
    }
}

pub fn read(engine: &Engine, lease_path: &Path, key: &str) -> Result<()> {
    let lease = leasefile::load(lease_path)?;
    let value = engine.read_key(&lease, key)?;
    print!("{value}");
    Ok(())
}

pub fn write(engine: &Engine, lease_path: &Path, key: &str, value: &str) -> Result<()> {
    let lease = leasefile::load(lease_path)?;
    engine.write_key(&lease, key, value)?;

    eprintln!(
        "Wrote {} to slot '{}' in pool '{}'",
        key, lease.slot_name, lease.pool
    );
    Ok(())
}

pub fn env(engine: &Engine, lease_path: &Path, format: EnvFormat) -> Result<()> {
    let lease = leasefile::load(lease_path)?;
    let values = engine.read_all(&lease)?;

    // BTreeMap iteration is already key-sorted, so output is deterministic
    match format {
        EnvFormat::Json => println!("{}", serde_json::to_string_pretty(&values)?),
        EnvFormat::Dotenv => {
            for (key, value) in &values {
                println!("{key}={value}");
            }
        }
        EnvFormat::Export => {
            for (key, value) in &values {
                println!("export {key}={value:?}");
            }
        }
    }

    Ok(())
}

pub fn secret_name(engine: &Engine, lease_path: &Path, key: &str) -> Result<()> {
    let lease = leasefile::load(lease_path)?;
    let name = engine.secret_name(&lease, key)?;
    println!("{name}");
    Ok(())
}

fn format_ts(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}
