use crate::error::Result;

/// Flat name -> value secret backend.
///
/// One secret per env key, named by the `{slot}-{kebab-case-key}`
/// convention (see [`crate::config::secret_name`]). The store performs no
/// cross-caller coordination of its own: writes are safe because lease
/// validation in the engine guarantees only the current lease holder
/// reaches this layer for a given slot.
pub trait SecretStore: Send + Sync {
    /// Return the value stored under `name`, or `SecretNotFound`.
    fn read(&self, name: &str) -> Result<String>;

    /// Create or overwrite the value stored under `name`.
    fn write(&self, name: &str, value: &str) -> Result<()>;

    /// Release backend resources.
    fn close(&self) -> Result<()>;
}

// Mirror of the lock-store blanket impl: a shared handle is a store.
impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    fn read(&self, name: &str) -> Result<String> {
        (**self).read(name)
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        (**self).write(name, value)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
