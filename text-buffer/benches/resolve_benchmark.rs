use std::num::NonZeroUsize;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;

use text_buffer::{SourceText, TextOptions};
use text_encoding::{StringReader, TextEncoding};

// Modify time limit here
const BENCHMARK_TIME_LIMIT: std::time::Duration =
    std::time::Duration::from_secs(10);

fn generate_random_text(chars: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..chars)
        .map(|_| {
            if rng.gen_ratio(1, 40) {
                '\n'
            } else {
                rng.gen_range('a'..='z')
            }
        })
        .collect()
}

fn build(text: &str, chunk_size: usize) -> SourceText {
    SourceText::new(
        StringReader::new(text),
        TextEncoding::Utf8,
        NonZeroUsize::new(chunk_size)
            .expect("chunk size must be positive"),
        TextOptions::default(),
    )
}

/// Benchmarks lazy resolution and the caches derived from it.
///
/// - Measures full stream resolution across chunk sizes.
/// - Measures checksum computation over the encoded bytes.
/// - Measures the line-boundary scan.
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("source_text_resolution");
    group.measurement_time(BENCHMARK_TIME_LIMIT);

    let inputs = [("small", 1024), ("medium", 65536), ("large", 1048576)];

    for (name, size) in inputs.iter() {
        let content = generate_random_text(*size);

        for chunk_size in [512usize, 4096, 65536] {
            let input = content.clone();
            let id = format!("resolve:{}:chunk_{}", name, chunk_size);
            group.bench_function(id, move |b| {
                b.iter(|| {
                    build(black_box(&input), chunk_size)
                        .len()
                        .expect("resolution failed")
                });
            });
        }

        let input = content.clone();
        let id = format!("checksum:{}", name);
        group.bench_function(id, move |b| {
            b.iter(|| {
                build(black_box(&input), 4096)
                    .checksum()
                    .expect("checksum computation failed")
            });
        });

        let input = content.clone();
        let id = format!("lines:{}", name);
        group.bench_function(id, move |b| {
            b.iter(|| {
                build(black_box(&input), 4096)
                    .line_count()
                    .expect("line scan failed")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolution);
criterion_main!(benches);
