// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//!
//! Benchmark: interval lookups and steady-state SDO / PDO decode.
//!
//! Each decode iteration uses a fresh decoder so the per-frame report
//! cache never short-circuits the work being measured.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use epl_sdo::{
    Decoder, DecoderConfig, DictionarySet, EntryInfo, EntryKind, Frame, IntervalIndex,
    ObjectDictionary, ValueType,
};

const CN: u8 = 1;
const MN: u8 = 240;

// ============================================================================
// Capture synthesis
// ============================================================================

fn sdo_write(number: u32, recv: u8, send: u8, index: u16, value: u32) -> Frame {
    let i = index.to_le_bytes();
    let v = value.to_le_bytes();
    Frame::new(
        number,
        vec![
            0x06, CN, MN, 0x05, (recv << 2) | 2, (send << 2) | 2, 0, 0, // ASnd + sequence
            0x00, 0x01, 0x00, 0x01, 8, 0, 0, 0, // WriteByIndex, expedited
            i[0], i[1], 0x00, 0x00, v[0], v[1], v[2], v[3],
        ],
    )
}

fn pres(number: u32, payload_len: usize) -> Frame {
    let mut data = vec![0x04, 0xFF, CN, 0, 0, 0, 0, 0];
    data.extend_from_slice(&(payload_len as u16).to_le_bytes());
    data.extend((0..payload_len).map(|i| i as u8));
    Frame::new(number, data)
}

fn dictionary(mapped: u8) -> DictionarySet {
    let mut builder = ObjectDictionary::builder()
        .node_id(CN)
        .object(0x2000, EntryInfo::new("Setpoint", EntryKind::Variable, Some(ValueType::Unsigned32)))
        .object(0x6000, EntryInfo::new("Inputs", EntryKind::Array, Some(ValueType::Unsigned8)));
    for sub in 1..=mapped {
        builder = builder
            .subentry(0x6000, sub, EntryInfo::new(&format!("Input_{:02}", sub), EntryKind::Variable, Some(ValueType::Unsigned8)))
            .expect("0x6000 is an array")
            .mapping(0x1A00, sub, 0x0008_0000_0000_6000 | (sub as u64) << 16 | ((sub as u64 - 1) * 8) << 32);
    }
    DictionarySet::new().with(builder.build())
}

fn sdo_capture(frames: u32) -> Vec<Frame> {
    (1..=frames)
        .map(|n| sdo_write(n, (n % 64) as u8, ((n + 1) % 64) as u8, 0x2000, n))
        .collect()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_interval_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval_find");
    for size in [16u32, 256, 4096] {
        let mut index = IntervalIndex::with_partial_eq();
        for key in 0..size {
            index.insert(key * 2, key);
        }
        index.lock();

        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            let mut key = 0;
            b.iter(|| {
                key = (key + 7) % (size * 2);
                black_box(index.find(black_box(key)).ok().flatten());
            });
        });
    }
    group.finish();
}

fn bench_sdo_decode(c: &mut Criterion) {
    let capture = sdo_capture(512);
    c.bench_function("sdo_expedited_512", |b| {
        b.iter(|| {
            let decoder = Decoder::new(DecoderConfig::default()).with_dictionaries(dictionary(0));
            for frame in &capture {
                black_box(decoder.decode(frame));
            }
        });
    });
}

fn bench_pdo_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdo_decode");
    for mapped in [4u8, 32] {
        let frames: Vec<Frame> = (1..=256).map(|n| pres(n, mapped as usize)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(mapped), &frames, |b, frames| {
            b.iter(|| {
                let decoder =
                    Decoder::new(DecoderConfig::default()).with_dictionaries(dictionary(mapped));
                for frame in frames {
                    black_box(decoder.decode(frame));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_interval_lookup, bench_sdo_decode, bench_pdo_decode);
criterion_main!(benches);
