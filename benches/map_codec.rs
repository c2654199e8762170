use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use serde_mapstream::map::IndexMapShape;
use serde_mapstream::stream::StreamReader;
use serde_mapstream::{from_str, to_string, Codec, ReferenceHandling, SerializerOptions, ValueMap};

fn codec(options: SerializerOptions) -> Codec {
    let mut codec = Codec::new(options);
    codec.register_map(IndexMapShape::<String, i64>::new());
    codec
}

fn document(size: usize) -> String {
    let map: IndexMap<String, i64> = (0..size).map(|i| (format!("key{i}"), i as i64 * 7)).collect();
    to_string(&map, &codec(SerializerOptions::new())).unwrap()
}

fn benchmark_read_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_int_map");
    let plain = codec(SerializerOptions::new());
    let preserving = codec(SerializerOptions::new().with_reference_handling(ReferenceHandling::Preserve));

    for size in [10, 100, 1000] {
        let doc = document(size);
        group.bench_with_input(BenchmarkId::new("single_pass", size), &doc, |b, doc| {
            b.iter(|| from_str::<IndexMap<String, i64>>(black_box(doc), &plain))
        });
        group.bench_with_input(BenchmarkId::new("resumable", size), &doc, |b, doc| {
            b.iter(|| from_str::<IndexMap<String, i64>>(black_box(doc), &preserving))
        });
    }
    group.finish();
}

fn benchmark_chunked_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunked_read");
    let codec = codec(SerializerOptions::new());
    let doc = document(500);

    for chunk in [16, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut stream = StreamReader::<IndexMap<String, i64>>::new(&codec).unwrap();
                for piece in doc.as_bytes().chunks(chunk) {
                    stream.feed(black_box(piece)).unwrap();
                }
                stream.finish().unwrap()
            })
        });
    }
    group.finish();
}

fn benchmark_write(c: &mut Criterion) {
    let codec = codec(SerializerOptions::new());
    let map: IndexMap<String, i64> = from_str(&document(500), &codec).unwrap();

    c.bench_function("write_int_map", |b| b.iter(|| to_string(black_box(&map), &codec)));

    let mut out = Vec::with_capacity(16 * 1024);
    c.bench_function("write_int_map_streaming", |b| {
        b.iter(|| {
            out.clear();
            serde_mapstream::to_writer(&mut out, black_box(&map), &codec)
        })
    });
}

fn benchmark_value_map(c: &mut Criterion) {
    let codec = Codec::default();
    let doc = r#"{"id":42,"tags":["important","verified"],"meta":{"version":3,"created":"2023-01-01"},"score":9.5,"active":true}"#;

    c.bench_function("read_value_map", |b| {
        b.iter(|| from_str::<ValueMap>(black_box(doc), &codec))
    });
}

criterion_group!(
    benches,
    benchmark_read_paths,
    benchmark_chunked_read,
    benchmark_write,
    benchmark_value_map
);
criterion_main!(benches);
