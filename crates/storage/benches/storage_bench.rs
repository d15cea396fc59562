use bytes::Bytes;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use ggcache_storage::Db;

const TTL: Duration = Duration::from_secs(60);

fn bench_set_get_sequential(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_get_sequential_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                for i in 0..10_000 {
                    let key = Bytes::from(format!("key:{i}"));
                    let value = Bytes::from(format!("value:{i}"));
                    db.set(key.clone(), value, TTL);
                    black_box(db.get(&key).ok());
                }
            });
        })
    });
}

fn bench_set_concurrent(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_concurrent_4_tasks_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                let mut handles = Vec::new();

                for t in 0..4 {
                    let db = db.clone();
                    handles.push(tokio::spawn(async move {
                        for i in 0..2_500 {
                            db.set(
                                Bytes::from(format!("key:{t}:{i}")),
                                Bytes::from_static(b"value"),
                                TTL,
                            );
                        }
                    }));
                }

                for h in handles {
                    h.await.unwrap();
                }
            });
        })
    });
}

fn bench_overwrite_hot_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("overwrite_hot_key_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                let key = Bytes::from_static(b"hot");
                for i in 0..10_000 {
                    db.set(key.clone(), Bytes::from(format!("v{i}")), TTL);
                }
                black_box(db.get(&key).ok());
            });
        })
    });
}

criterion_group!(
    benches,
    bench_set_get_sequential,
    bench_set_concurrent,
    bench_overwrite_hot_key,
);
criterion_main!(benches);
