use thiserror::Error;

/// Every failure the engine or a store can surface, one variant per
/// caller-distinguishable kind so the CLI can map them to exit codes.
#[derive(Debug, Error)]
pub enum Error {
    /// No free slot at claim time. Retryable by the caller after backoff;
    /// never auto-retried here.
    #[error("all slots in pool '{pool}' are currently claimed")]
    PoolExhausted { pool: String },

    /// No claim matches the given lease ID or holder. Terminal: the lease
    /// was already released or never existed.
    #[error("lease not found")]
    LeaseNotFound,

    /// The claim existed but its TTL passed. Terminal for that lease; the
    /// caller must claim again.
    #[error("lease has expired")]
    LeaseExpired,

    /// Configuration lookup miss.
    #[error("pool '{pool}' not found in config")]
    PoolNotFound { pool: String },

    /// The configuration cannot be operated on.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Requested key is outside the slot's declared key set.
    #[error("key '{key}' is not defined in this slot's secrets")]
    KeyNotDefined { key: String },

    /// The secret backend has no value under the derived name.
    #[error("secret '{name}' not found")]
    SecretNotFound { name: String },

    /// I/O or protocol failure from a backend, wrapped with context.
    /// Retry policy, if any, belongs to the backend client.
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// One or more sub-errors from closing the stores.
    #[error("close errors: {}", .0.join("; "))]
    Close(Vec<String>),
}

impl Error {
    /// Wrap a backend failure with a short description of what was
    /// being attempted.
    pub fn backend(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
