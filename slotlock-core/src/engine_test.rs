#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::config::{BackendConfig, Config, LockBackend, PoolConfig, SecretBackend, SlotConfig};
    use crate::engine::Engine;
    use crate::error::Error;
    use crate::lockstore_in_memory::InMemoryLockStore;
    use crate::secretstore::SecretStore;
    use crate::secretstore_in_memory::InMemorySecretStore;

    fn test_config() -> Config {
        let mut pools = BTreeMap::new();
        pools.insert(
            "testpool".to_string(),
            PoolConfig {
                slots: vec![
                    SlotConfig {
                        name: "alpha".to_string(),
                    },
                    SlotConfig {
                        name: "beta".to_string(),
                    },
                ],
                keys: vec!["SHOPIFY_API_KEY".to_string(), "APP_URL".to_string()],
                ttl_secs: 3600,
            },
        );

        Config {
            backend: BackendConfig {
                lock: LockBackend::Memory,
                secrets: SecretBackend::Memory,
            },
            pools,
        }
    }

    fn test_engine() -> (Engine, Arc<InMemorySecretStore>) {
        // Keep a seedable handle to the same store the engine owns
        let secrets = Arc::new(InMemorySecretStore::new());
        let engine = Engine::new(
            test_config(),
            Box::new(InMemoryLockStore::new()),
            Box::new(Arc::clone(&secrets)),
            "test-holder",
        );
        (engine, secrets)
    }

    #[test]
    fn claim_returns_first_slot_with_derived_secret_names() {
        let (engine, _) = test_engine();

        let lease = engine.claim("testpool").unwrap();
        assert_eq!(lease.pool, "testpool");
        assert_eq!(lease.slot_name, "alpha");
        assert_eq!(lease.holder, "test-holder");
        assert!(!lease.lease_id.is_empty());
        assert_eq!(
            lease.secret_name("SHOPIFY_API_KEY"),
            Some("alpha-shopify-api-key")
        );
        assert_eq!(lease.secret_name("APP_URL"), Some("alpha-app-url"));
    }

    /// Engine wired to a shared lock store, one per holder. Repeat claims
    /// from a single identity are idempotent, so exhausting a pool takes
    /// distinct holders against the same store.
    fn engine_for(lock: &Arc<InMemoryLockStore>, holder: &str) -> Engine {
        Engine::new(
            test_config(),
            Box::new(Arc::clone(lock)),
            Box::new(InMemorySecretStore::new()),
            holder,
        )
    }

    #[test]
    fn claim_exhausts_pool_then_release_reopens_it() {
        let lock = Arc::new(InMemoryLockStore::new());

        let first = engine_for(&lock, "holder-1").claim("testpool").unwrap();
        assert_eq!(first.slot_name, "alpha");

        let second = engine_for(&lock, "holder-2").claim("testpool").unwrap();
        assert_eq!(second.slot_name, "beta");

        let err = engine_for(&lock, "holder-3").claim("testpool").unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { .. }));

        // Releasing alpha reopens exactly that slot
        engine_for(&lock, "holder-1").release(&first).unwrap();
        let next = engine_for(&lock, "holder-3").claim("testpool").unwrap();
        assert_eq!(next.slot_name, "alpha");
        assert_ne!(next.lease_id, first.lease_id);
    }

    #[test]
    fn claim_unknown_pool_fails() {
        let (engine, _) = test_engine();

        let err = engine.claim("nonexistent").unwrap_err();
        assert!(matches!(err, Error::PoolNotFound { pool } if pool == "nonexistent"));
    }

    #[test]
    fn claim_is_idempotent_per_holder() {
        let (engine, _) = test_engine();

        let first = engine.claim("testpool").unwrap();
        let again = engine.claim("testpool").unwrap();
        assert_eq!(again.lease_id, first.lease_id);
        assert_eq!(again.slot_name, first.slot_name);
    }

    #[test]
    fn release_frees_the_slot_for_reclaim() {
        let (engine, _) = test_engine();

        let lease = engine.claim("testpool").unwrap();
        engine.release(&lease).unwrap();

        let next = engine.claim("testpool").unwrap();
        assert_eq!(next.slot_name, "alpha");
        assert_ne!(next.lease_id, lease.lease_id);
    }

    #[test]
    fn release_by_holder_works_without_a_lease_file() {
        let (engine, _) = test_engine();

        engine.claim("testpool").unwrap();
        engine.release_by_holder("testpool").unwrap();

        // Slot is free again
        let statuses = engine.status("testpool").unwrap();
        assert!(!statuses[0].claimed);
    }

    #[test]
    fn read_and_write_round_trip() {
        let (engine, secrets) = test_engine();
        secrets.seed("alpha-shopify-api-key", "test-key-123");

        let lease = engine.claim("testpool").unwrap();

        let val = engine.read_key(&lease, "SHOPIFY_API_KEY").unwrap();
        assert_eq!(val, "test-key-123");

        engine
            .write_key(&lease, "APP_URL", "https://preview.example.com")
            .unwrap();
        let val = engine.read_key(&lease, "APP_URL").unwrap();
        assert_eq!(val, "https://preview.example.com");
    }

    #[test]
    fn undefined_keys_are_rejected_before_the_secret_store() {
        let (engine, _) = test_engine();

        let lease = engine.claim("testpool").unwrap();

        let err = engine.read_key(&lease, "UNDEFINED_KEY").unwrap_err();
        assert!(matches!(err, Error::KeyNotDefined { key } if key == "UNDEFINED_KEY"));

        let err = engine.write_key(&lease, "UNDEFINED_KEY", "value").unwrap_err();
        assert!(matches!(err, Error::KeyNotDefined { .. }));
    }

    #[test]
    fn stale_lease_never_reaches_the_secret_store() {
        let (engine, secrets) = test_engine();
        secrets.seed("alpha-shopify-api-key", "test-key-123");

        let lease = engine.claim("testpool").unwrap();
        engine.release(&lease).unwrap();

        // The lease token is dead; reads and writes must fail at
        // validation, and the write must leave no trace.
        let err = engine.read_key(&lease, "SHOPIFY_API_KEY").unwrap_err();
        assert!(matches!(err, Error::LeaseNotFound));

        let err = engine.write_key(&lease, "APP_URL", "leaked").unwrap_err();
        assert!(matches!(err, Error::LeaseNotFound));
        assert!(matches!(
            secrets.read("alpha-app-url").unwrap_err(),
            Error::SecretNotFound { .. }
        ));
    }

    #[test]
    fn read_all_returns_every_key() {
        let (engine, secrets) = test_engine();
        secrets.seed("alpha-shopify-api-key", "val_a");
        secrets.seed("alpha-app-url", "val_b");

        let lease = engine.claim("testpool").unwrap();
        let all = engine.read_all(&lease).unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all.get("SHOPIFY_API_KEY").map(String::as_str), Some("val_a"));
        assert_eq!(all.get("APP_URL").map(String::as_str), Some("val_b"));
    }

    #[test]
    fn secret_name_resolves_without_store_contact() {
        let (engine, _) = test_engine();

        let lease = engine.claim("testpool").unwrap();

        let name = engine.secret_name(&lease, "SHOPIFY_API_KEY").unwrap();
        assert_eq!(name, "alpha-shopify-api-key");

        let err = engine.secret_name(&lease, "NONEXISTENT").unwrap_err();
        assert!(matches!(err, Error::KeyNotDefined { .. }));
    }

    #[test]
    fn renew_extends_and_preserves_secret_names() {
        let (engine, _) = test_engine();

        let lease = engine.claim("testpool").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));

        let renewed = engine.renew(&lease).unwrap();
        assert!(renewed.expires_at > lease.expires_at);
        assert_eq!(renewed.secrets, lease.secrets);
        assert_eq!(renewed.lease_id, lease.lease_id);
    }

    #[test]
    fn status_reflects_claims_in_config_order() {
        let (engine, _) = test_engine();

        let statuses = engine.status("testpool").unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].slot_name, "alpha");
        assert_eq!(statuses[1].slot_name, "beta");
        assert!(!statuses[0].claimed && !statuses[1].claimed);

        engine.claim("testpool").unwrap();

        let statuses = engine.status("testpool").unwrap();
        assert!(statuses[0].claimed);
        assert!(!statuses[1].claimed);
    }

    #[test]
    fn close_succeeds_with_memory_backends() {
        let (engine, _) = test_engine();
        engine.close().unwrap();
    }

    #[test]
    fn from_config_builds_memory_backends() {
        let engine = Engine::from_config(test_config(), "factory-holder").unwrap();
        assert_eq!(engine.identity(), "factory-holder");
        engine.claim("testpool").unwrap();
    }
}
