// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Attribute Codec Benchmark
//!
//! Measures packing and unpacking of simulation variables with:
//! - Big-endian f64 arrays (3 to 4096 elements)
//! - Opaque data buffers that resize on decode
//!
//! No RTI is involved; this isolates the marshalling cost per attribute.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hlafed::codec::{pack, unpack, Encoding, SimVariable, WireFormat};
use hlafed::executive::HeapMemoryManager;
use std::hint::black_box as bb;

fn wire_format(encoding: Encoding, variable: &SimVariable) -> WireFormat {
    WireFormat::resolve(
        encoding,
        variable.element_type(),
        variable.shape(),
        variable.units(),
    )
    .expect("encoding should resolve")
}

/// Benchmark f64 arrays of increasing length
fn bench_f64_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_f64_big_endian");

    for count in [3usize, 14, 256, 4096] {
        let values: Vec<f64> = (0..count).map(|i| i as f64 * 0.5).collect();
        let source = SimVariable::array("bench.state", values);
        let mut target = SimVariable::array("bench.state", vec![0.0f64; count]);
        let format = wire_format(Encoding::BigEndian, &source);
        let mut buffer = Vec::with_capacity(count * 8);

        group.throughput(Throughput::Bytes((count * 8) as u64));
        group.bench_with_input(BenchmarkId::new("pack", count), &count, |b, _| {
            b.iter(|| {
                pack(&format, bb(&source), &mut buffer).expect("pack should succeed");
                bb(buffer.len())
            });
        });

        pack(&format, &source, &mut buffer).expect("pack should succeed");
        group.bench_with_input(BenchmarkId::new("unpack", count), &count, |b, _| {
            b.iter(|| {
                unpack(&format, bb(&buffer), &mut target, &HeapMemoryManager)
                    .expect("unpack should succeed")
            });
        });
    }

    group.finish();
}

/// Benchmark opaque buffers, including the resize on every decode
fn bench_opaque_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_opaque_data");

    for size in [16usize, 1024, 65536] {
        let payload = vec![0xABu8; size];
        let source = SimVariable::chars("bench.blob", &payload);
        let format = wire_format(Encoding::OpaqueData, &source);
        let mut buffer = Vec::with_capacity(size + 4);
        pack(&format, &source, &mut buffer).expect("pack should succeed");

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("round_trip", size), &size, |b, _| {
            b.iter(|| {
                let mut target = SimVariable::chars("bench.blob", b"");
                unpack(&format, bb(&buffer), &mut target, &HeapMemoryManager)
                    .expect("unpack should succeed");
                bb(target.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_f64_arrays, bench_opaque_data);
criterion_main!(benches);
