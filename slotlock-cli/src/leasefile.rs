//! Whole-file JSON persistence of the active lease, keyed by a local
//! path. The lease file is the only state carried between invocations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use slotlock_core::types::Lease;

pub fn load(path: &Path) -> Result<Lease> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(anyhow!("no active lease (file not found: {})", path.display()));
        }
        Err(e) => return Err(e).with_context(|| "failed to read lease file".to_string()),
    };

    serde_json::from_str(&raw).context("failed to parse lease file")
}

pub fn save(path: &Path, lease: &Lease) -> Result<()> {
    let data = serde_json::to_string_pretty(lease).context("failed to marshal lease file")?;

    // 0600: the lease token is a credential
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to write lease file {}", path.display()))?;
    file.write_all(data.as_bytes())
        .context("failed to write lease file")?;
    Ok(())
}

pub fn delete(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("failed to delete lease file"),
    }
}
