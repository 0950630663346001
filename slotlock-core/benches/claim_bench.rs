use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use slotlock_core::lockstore::LockStore;
use slotlock_core::lockstore_in_memory::InMemoryLockStore;

fn slot_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("slot-{}", i)).collect()
}

fn bench_claim_release_cycle(c: &mut Criterion) {
    c.bench_function("claim_release_cycle", |b| {
        let store = InMemoryLockStore::new();
        let names = slot_names(1);

        b.iter(|| {
            let claim = store
                .claim("pool", &names, "holder-1", 5000, 1000)
                .unwrap();
            store.release("pool", &claim.lease_id, 1000).unwrap();
        })
    });
}

fn bench_pool_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_fill");

    for slot_count in [10, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("slots", slot_count),
            &slot_count,
            |b, &count| {
                let names = slot_names(count);

                b.iter(|| {
                    let store = InMemoryLockStore::new();

                    // Each holder takes one slot; the last claim scans the
                    // whole pool before winning the final slot
                    for i in 0..count {
                        store
                            .claim("pool", &names, &format!("holder-{}", i), 5000, 1000)
                            .unwrap();
                    }

                    black_box(store.status("pool", &names, 1000).unwrap().len())
                })
            },
        );
    }

    group.finish();
}

fn bench_validate_on_full_pool(c: &mut Criterion) {
    c.bench_function("validate_lease_full_pool", |b| {
        let store = InMemoryLockStore::new();
        let names = slot_names(100);

        let mut lease_ids = Vec::new();
        for i in 0..100 {
            let claim = store
                .claim("pool", &names, &format!("holder-{}", i), 5000, 1000)
                .unwrap();
            lease_ids.push(claim.lease_id);
        }

        b.iter(|| {
            for id in &lease_ids {
                black_box(store.validate_lease("pool", id, 2000).unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_claim_release_cycle,
    bench_pool_fill,
    bench_validate_on_full_pool
);
criterion_main!(benches);
