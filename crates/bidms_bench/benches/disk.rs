//! Disk B-tree benchmarks.

use bidms_bench::shuffled_keys;
use bidms_core::{Config, DiskBTree, FileBackend, InMemoryBackend};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tempfile::TempDir;

/// Benchmark bulk inserts into an in-memory store.
fn bench_inmemory_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_inmemory_insert");

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let keys = shuffled_keys(count);
            b.iter(|| {
                let mut tree = DiskBTree::new(InMemoryBackend::new()).unwrap();
                for &k in &keys {
                    tree.insert(black_box(k)).unwrap();
                }
                black_box(tree.root_offset());
            });
        });
    }

    group.finish();
}

/// Benchmark point lookups in a populated store.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_search");

    for count in [1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("inmemory", count), count, |b, &count| {
            let mut rng = rand::thread_rng();
            let mut tree = DiskBTree::new(InMemoryBackend::new()).unwrap();
            for k in shuffled_keys(count) {
                tree.insert(k).unwrap();
            }
            b.iter(|| {
                let key = rng.gen_range(0..count as i64 * 2);
                black_box(tree.search(key).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("file", count), count, |b, &count| {
            let mut rng = rand::thread_rng();
            let temp_dir = TempDir::new().unwrap();
            let backend = FileBackend::open(&temp_dir.path().join("bench.db")).unwrap();
            let mut tree = DiskBTree::new(backend).unwrap();
            for k in shuffled_keys(count) {
                tree.insert(k).unwrap();
            }
            b.iter(|| {
                let key = rng.gen_range(0..count as i64 * 2);
                black_box(tree.search(key).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark insert/remove churn against a file, with and without sync.
fn bench_file_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_file_churn");
    group.sample_size(20);

    for sync in [false, true] {
        let name = if sync { "sync" } else { "flush" };
        group.bench_function(name, |b| {
            let mut rng = rand::thread_rng();
            let temp_dir = TempDir::new().unwrap();
            let backend = FileBackend::open(&temp_dir.path().join("bench.db")).unwrap();
            let config = Config::default().sync_on_write(sync);
            let mut tree = DiskBTree::with_config(backend, &config).unwrap();
            for k in shuffled_keys(500) {
                tree.insert(k).unwrap();
            }

            b.iter(|| {
                let key = rng.gen_range(0..1000);
                if !tree.remove(key).unwrap() {
                    tree.insert(key).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_inmemory_insert, bench_search, bench_file_churn);

criterion_main!(benches);
