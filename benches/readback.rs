//! Pipelined vs synchronous readback under simulated transfer latency.
//!
//! Each iteration drives a short render loop: write a frame, pay a
//! fixed render cost, request a cycle, then flush. The synchronous
//! variant (ring of 1, zero lag) waits out the full transfer latency
//! every frame; the pipelined variant overlaps it with the render cost
//! of the following frames.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use framegrab::gpu::SoftwareContext;
use framegrab::{ComponentType, PixelLayout, PixelReader, ReaderConfig};
use std::time::Duration;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;
const FRAMES: usize = 32;
const RENDER_COST: Duration = Duration::from_micros(200);
const TRANSFER_LATENCY: Duration = Duration::from_micros(400);

fn run_capture_loop(ring_size: usize, read_lag: usize) -> usize {
    let ctx = SoftwareContext::new(WIDTH, HEIGHT).with_transfer_latency(TRANSFER_LATENCY);
    let frames = ctx.frame_handle();

    let config = ReaderConfig::new(WIDTH, HEIGHT, PixelLayout::Rgba, ComponentType::U8)
        .with_ring_size(ring_size)
        .with_read_lag(read_lag);
    let mut reader = PixelReader::new(Box::new(ctx), config).unwrap();

    let frame = vec![0x7fu8; (WIDTH * HEIGHT * 4) as usize];
    let mut pulled = 0;
    for _ in 0..FRAMES {
        frames.write_frame(&frame);
        std::thread::sleep(RENDER_COST);
        reader.request_cycle().unwrap();
        while reader.pull().is_some() {
            pulled += 1;
        }
    }
    reader.flush().unwrap();
    while reader.pull().is_some() {
        pulled += 1;
    }
    reader.shutdown().unwrap();
    pulled
}

fn bench_readback(c: &mut Criterion) {
    let mut group = c.benchmark_group("readback");
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("capture_loop", "synchronous"), |b| {
        b.iter(|| {
            let pulled = run_capture_loop(1, 0);
            assert_eq!(pulled, FRAMES);
        })
    });

    for ring_size in [2usize, 4] {
        group.bench_function(
            BenchmarkId::new("capture_loop", format!("pipelined_ring_{ring_size}")),
            |b| {
                b.iter(|| {
                    let pulled = run_capture_loop(ring_size, ring_size / 2);
                    assert_eq!(pulled, FRAMES);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_readback);
criterion_main!(benches);
