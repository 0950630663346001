//! # slotlock-core
//!
//! The lease allocation engine for slotlock. Provides mutually-exclusive,
//! time-bounded claims on members of a named pool of credential slots,
//! coordinated across non-cooperating processes via pluggable lock-store
//! backends.

pub mod config;
pub mod engine;
pub mod error;
pub mod lockstore;
#[path = "lockstore_in_memory.rs"]
pub mod lockstore_in_memory;
#[cfg(feature = "sqlite")]
#[path = "lockstore_sqlite.rs"]
pub mod lockstore_sqlite;
pub mod secretstore;
#[path = "secretstore_in_memory.rs"]
pub mod secretstore_in_memory;
#[cfg(feature = "sqlite")]
#[path = "secretstore_sqlite.rs"]
pub mod secretstore_sqlite;
pub mod types;

#[cfg(test)]
mod engine_test;
