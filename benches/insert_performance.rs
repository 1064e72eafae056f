use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skcstore::engine::Engine;
use skcstore::model::{Candidate, CategoryRef};
use skcstore::storage::{MemoryBackend, SqliteBackend};
use tempfile::TempDir;

/// Fixture generator for candidate batches
mod fixtures {
    use super::*;

    /// `size` candidates spread round-robin over `categories` categories
    pub fn batch(offset: usize, size: usize, categories: i64) -> Vec<Candidate> {
        (offset..offset + size)
            .map(|i| {
                let cat_id = i as i64 % categories;
                Candidate {
                    skc_id: format!("SKC-{i}"),
                    product_id: format!("P-{}", i / 4),
                    product_name: format!("Product {}", i / 4),
                    main_image_url: Some(format!("https://img.example/{i}.jpg")),
                    category: CategoryRef { cat_id, cat_name: format!("Category {cat_id}") },
                    source: "product-detail".to_string(),
                }
            })
            .collect()
    }
}

/// Benchmark: fresh batch into an empty in-memory store
fn bench_insert_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_memory");

    for size in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("batch", size), &size, |b, &size| {
            let batch = fixtures::batch(0, size, 8);

            b.iter(|| {
                let engine = Engine::new(MemoryBackend::new());
                let outcome = engine.insert_records("bench", black_box(&batch)).unwrap();
                black_box(outcome);
            });
        });
    }

    group.finish();
}

/// Benchmark: re-submitting a batch that is already stored (all duplicates)
fn bench_reinsert_duplicates(c: &mut Criterion) {
    c.bench_function("reinsert_duplicates", |b| {
        let engine = Engine::new(MemoryBackend::new());
        let batch = fixtures::batch(0, 1_000, 8);
        engine.insert_records("bench", &batch).unwrap();

        b.iter(|| {
            let outcome = engine.insert_records("bench", black_box(&batch)).unwrap();
            black_box(outcome);
        });
    });
}

/// Benchmark: batch into a SQLite-backed store that already holds records
fn bench_insert_sqlite(c: &mut Criterion) {
    c.bench_function("insert_sqlite_existing_5000", |b| {
        let temp_dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(&temp_dir.path().join("bench.db")).unwrap();
        let engine = Engine::new(backend);
        engine.insert_records("bench", &fixtures::batch(0, 5_000, 20)).unwrap();

        let mut offset = 5_000;
        b.iter(|| {
            let batch = fixtures::batch(offset, 50, 20);
            offset += 50;
            let outcome = engine.insert_records("bench", black_box(&batch)).unwrap();
            black_box(outcome);
        });
    });
}

/// Benchmark: loading and gating a large snapshot
fn bench_load(c: &mut Criterion) {
    c.bench_function("load_5000_records", |b| {
        let engine = Engine::new(MemoryBackend::new());
        engine.insert_records("bench", &fixtures::batch(0, 5_000, 20)).unwrap();

        b.iter(|| {
            let snapshot = engine.load(black_box("bench"));
            black_box(snapshot);
        });
    });
}

criterion_group!(
    benches,
    bench_insert_memory,
    bench_reinsert_duplicates,
    bench_insert_sqlite,
    bench_load,
);

criterion_main!(benches);
