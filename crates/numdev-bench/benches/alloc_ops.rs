//! Criterion micro-benchmarks for array construction and release.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use numdev_alloc::{DeviceHeap, HostHeap};
use numdev_array::{DeviceArray, HostArray};
use numdev_bench::{label, PROFILE_DIMS};
use numdev_core::Shape;

/// Benchmark: allocate and drop a zeroed host array.
fn bench_host_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_alloc");
    for dims in PROFILE_DIMS {
        let shape = Shape::new(dims).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(label(dims)), &shape, |b, s| {
            b.iter(|| {
                let a = HostArray::<f32, HostHeap>::with_shape(s.clone());
                black_box(a.as_ptr());
            });
        });
    }
    group.finish();
}

/// Benchmark: allocate and drop a zeroed device array.
fn bench_device_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_alloc");
    for dims in PROFILE_DIMS {
        let shape = Shape::new(dims).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(label(dims)), &shape, |b, s| {
            b.iter(|| {
                let a = DeviceArray::<f32, DeviceHeap>::with_shape(s.clone());
                black_box(a.as_device_ptr());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_host_alloc, bench_device_alloc);
criterion_main!(benches);
