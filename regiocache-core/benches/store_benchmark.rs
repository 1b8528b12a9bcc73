use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use regiocache_core::{Region, RegionUpdate, ServiceType, ServiceTypes, Store};
use std::sync::Arc;
use std::thread;

fn populated_store(size: usize) -> Store {
    let store = Store::new();
    let updates = (0..size).map(|i| {
        let key = format!("R{}", i);
        let mut table = ServiceTypes::new();
        table.insert("exec".to_string(), ServiceType::new("exec", "Executive", 1));
        RegionUpdate::new(key.clone())
            .with_region(Region::new(key, "bench"), format!("r{}", i))
            .with_service_types(table, format!("s{}", i))
    });
    store.apply_updates(updates);
    store
}

fn bench_ensure_known(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensure_known");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("register", size), size, |b, &size| {
            b.iter(|| {
                let store = Store::new();
                for i in 0..size {
                    black_box(store.ensure_known(&format!("R{}", i)));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("already_known", size), size, |b, &size| {
            let store = populated_store(size);
            b.iter(|| {
                for i in 0..size {
                    black_box(store.ensure_known(&format!("R{}", i)));
                }
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for size in [10, 100, 1000].iter() {
        let store = populated_store(*size);
        group.bench_with_input(BenchmarkId::new("hit", size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    black_box(store.get(&format!("R{}", i)));
                }
            });
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [10, 100, 1000].iter() {
        let store = populated_store(*size);
        group.bench_with_input(BenchmarkId::new("sorted", size), size, |b, _| {
            b.iter(|| black_box(store.snapshot()));
        });
    }

    group.finish();
}

fn bench_read_heavy_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_heavy_workload");

    // 90% reads, 10% merges
    for num_threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("90_read_10_merge", num_threads),
            num_threads,
            |b, &num_threads| {
                let store = Arc::new(populated_store(50));
                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|thread_id| {
                            let store = Arc::clone(&store);
                            thread::spawn(move || {
                                for i in 0..100 {
                                    let key = format!("R{}", i % 50);
                                    if i % 10 == 0 {
                                        store.apply_update(RegionUpdate::new(key.clone()).with_region(
                                            Region::new(key, "bench"),
                                            format!("t{}-{}", thread_id, i),
                                        ));
                                    } else {
                                        black_box(store.get(&key));
                                    }
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ensure_known,
    bench_get,
    bench_snapshot,
    bench_read_heavy_workload
);
criterion_main!(benches);
