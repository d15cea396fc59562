use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::io::Cursor;
use std::time::Duration;

use ggcache_protocol::{Command, Frame};

fn bench_decode_set(c: &mut Criterion) {
    let line = Bytes::from("SET user:1000 some-value 5000000000");

    c.bench_function("decode_set", |b| {
        b.iter(|| Command::decode(black_box(&line)).unwrap())
    });
}

fn bench_decode_get(c: &mut Criterion) {
    let line = Bytes::from("GET user:1000");

    c.bench_function("decode_get", |b| {
        b.iter(|| Command::decode(black_box(&line)).unwrap())
    });
}

fn bench_encode_set(c: &mut Criterion) {
    let cmd = Command::Set {
        key: Bytes::from("user:1000"),
        value: Bytes::from(vec![b'x'; 1024]),
        ttl: Duration::from_secs(5),
    };

    c.bench_function("encode_set_1kb", |b| b.iter(|| black_box(&cmd).encode()));
}

fn bench_parse_pipeline(c: &mut Criterion) {
    let mut buf = BytesMut::new();
    for i in 0..100 {
        Frame::line(&format!("SET key:{i} value:{i} 1000000")).encode(&mut buf);
    }
    let data = buf.freeze();

    c.bench_function("parse_pipeline_100", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(data.as_ref()));
            let mut count = 0;
            while Frame::parse(&mut cursor).is_ok() {
                count += 1;
            }
            count
        })
    });
}

criterion_group!(
    benches,
    bench_decode_set,
    bench_decode_get,
    bench_encode_set,
    bench_parse_pipeline
);
criterion_main!(benches);
