//! Segmentation and chain search on a synthetic page of glyph-like boxes.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use segchain::{ChainBuilder, ChainParams, PixelSlice, Segmentation};

/// `rows` lines of 3x5 boxes spaced 10 pixels apart, on a blank page.
fn page(cols: usize, rows: usize) -> (Vec<u8>, usize, usize) {
    let (width, height) = (10 * cols + 4, 12 * rows + 4);
    let mut data = vec![0u8; width * height];
    for r in 0..rows {
        for c in 0..cols {
            let (x0, y0) = (1 + 10 * c, 2 + 12 * r);
            for y in y0..y0 + 5 {
                for x in x0..x0 + 3 {
                    data[y * width + x] = 255;
                }
            }
        }
    }
    (data, width, height)
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    for size in [16usize, 64] {
        let (data, width, height) = page(size, size / 2);
        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let seg =
                    Segmentation::new(PixelSlice::U8(black_box(data)), 0, width, height, width, 0.0)
                        .expect("segmentation");
                black_box(seg);
            });
        });
    }
    group.finish();
}

fn bench_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("chains");
    let builder = ChainBuilder::new(ChainParams::default());
    for size in [16usize, 64] {
        let (data, width, height) = page(size, size / 2);
        let seg = Arc::new(
            Segmentation::new(PixelSlice::U8(&data), 0, width, height, width, 0.0)
                .expect("segmentation"),
        );
        group.throughput(Throughput::Elements(seg.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &seg, |b, seg| {
            b.iter(|| black_box(builder.build(seg).expect("chains")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_segmentation, bench_chains);
criterion_main!(benches);
