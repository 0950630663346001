mod commands;
mod identity;
mod leasefile;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use slotlock_core::config::Config;
use slotlock_core::engine::Engine;
use slotlock_core::error::Error;

#[derive(Parser)]
#[command(
    name = "slotlock",
    about = "Claim exclusive environment variable sets from a shared pool",
    long_about = "slotlock manages a pool of environment variable groups with exclusive \
                  locking. Use it in CI/CD to claim a set of credentials for branch \
                  preview deployments, ensuring no two environments share the same \
                  credentials.",
    version
)]
struct Cli {
    /// Config file path (default: ./slotlock.yaml)
    #[arg(long, global = true, env = "SLOTLOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Lease file path (default: .slotlock)
    #[arg(long, global = true, env = "SLOTLOCK_LEASE_FILE")]
    lease_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim an available slot from a pool
    Claim {
        /// Pool to claim from
        pool: String,
    },

    /// Release the current claim
    ///
    /// With no arguments, releases using the local lease file. With a pool
    /// name, releases by holder identity instead (no lease file needed).
    Release {
        /// Release by holder identity in this pool
        pool: Option<String>,
    },

    /// Extend the TTL on the current claim
    Renew,

    /// Show the status of all slots in a pool
    Status {
        pool: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read a single env var from the claimed slot
    Read {
        /// Env var key, e.g. SHOPIFY_API_KEY
        key: String,
    },

    /// Write a single env var to the claimed slot
    Write {
        key: String,
        value: String,
    },

    /// Dump all env vars from the claimed slot
    ///
    /// Use eval "$(slotlock env)" to source them.
    Env {
        #[arg(long, value_enum, default_value = "export")]
        format: EnvFormat,
    },

    /// Print the derived backend secret name for a key
    SecretName {
        key: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EnvFormat {
    Export,
    Dotenv,
    Json,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let holder = identity::resolve();
    tracing::debug!(holder = %holder, "resolved claimant identity");

    let engine = Engine::from_config(config, holder)?;
    let lease_path = cli
        .lease_file
        .unwrap_or_else(|| PathBuf::from(".slotlock"));

    let outcome = match cli.command {
        Commands::Claim { pool } => commands::claim(&engine, &lease_path, &pool),
        Commands::Release { pool } => commands::release(&engine, &lease_path, pool.as_deref()),
        Commands::Renew => commands::renew(&engine, &lease_path),
        Commands::Status { pool, json } => commands::status(&engine, &pool, json),
        Commands::Read { key } => commands::read(&engine, &lease_path, &key),
        Commands::Write { key, value } => commands::write(&engine, &lease_path, &key, &value),
        Commands::Env { format } => commands::env(&engine, &lease_path, format),
        Commands::SecretName { key } => commands::secret_name(&engine, &lease_path, &key),
    };

    let closed = engine.close().map_err(Into::into);
    outcome.and(closed)
}

/// Locate and parse the YAML config: explicit flag/env first, then the
/// working directory, then the user config directory.
fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path()
            .ok_or_else(|| anyhow!("no config found; create ./slotlock.yaml or pass --config"))?,
    };

    tracing::debug!(path = %path.display(), "loading config");
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("slotlock.yaml");
    if local.exists() {
        return Some(local);
    }

    let home = std::env::var_os("HOME")?;
    let user = PathBuf::from(home).join(".config/slotlock/slotlock.yaml");
    user.exists().then_some(user)
}

/// Map error kinds to distinct exit codes so CI scripts can branch on
/// them (e.g. retry-with-backoff on pool exhaustion).
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(Error::PoolNotFound { .. }) | Some(Error::InvalidConfig { .. }) => 2,
        Some(Error::PoolExhausted { .. }) => 3,
        Some(Error::LeaseNotFound) => 4,
        Some(Error::LeaseExpired) => 5,
        Some(Error::KeyNotDefined { .. }) => 6,
        _ => 1,
    }
}
