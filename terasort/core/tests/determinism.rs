// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Determinism of generated data across partitioning schemes.

mod common;

use common::{GOLDEN_RECORDS, assert_same_records, decode_hex_record};
use rand::{Rng, SeedableRng, rngs::StdRng};
use terasort_core::generator::{RecordIterator, generate_partition};
use terasort_core::random::SkipAheadRng;
use terasort_core::record::{Record, encode_record};
use terasort_core::unsigned::Unsigned128;

#[test]
fn golden_records_from_single_partition() {
    let records: Vec<Record> = generate_partition(0, 3).collect();
    assert_eq!(records.len(), 3);
    for (record, golden) in records.iter().zip(GOLDEN_RECORDS) {
        assert_eq!(record.as_bytes(), &decode_hex_record(golden));
    }
    assert_eq!(records[0].key(), b"JimGrayRIP");
}

#[test]
fn golden_records_from_large_partition() {
    let records: Vec<Record> = generate_partition(0, 1_000_000).take(3).collect();
    for (record, golden) in records.iter().zip(GOLDEN_RECORDS) {
        assert_eq!(record.as_bytes(), &decode_hex_record(golden));
    }
}

#[test]
fn seed_then_next_matches_manual_encoding() {
    for index in [0u64, 1, 999, 1 << 20, 1 << 40] {
        let mut rng = SkipAheadRng::seed_to(index);
        let mut buf = [0u8; 100];
        encode_record(&mut buf, rng.next(), Unsigned128::from(index));

        let generated = RecordIterator::new(index, 1).next().unwrap();
        assert_eq!(generated.as_bytes(), &buf, "record {index}");
    }
}

#[test]
fn partition_schemes_agree() {
    let whole: Vec<Record> = generate_partition(0, 600).collect();

    for records_per_partition in [1u64, 7, 100, 300] {
        let partitions = 600u64.div_ceil(records_per_partition);
        let pieces: Vec<Record> = (0..partitions)
            .flat_map(|p| generate_partition(p, records_per_partition))
            .take(600)
            .collect();
        assert_same_records(&pieces, &whole);
    }
}

#[test]
fn partitions_generated_out_of_order_agree() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut order: Vec<u64> = (0..16).collect();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.random_range(0..=i));
    }

    let mut by_partition: Vec<Option<Vec<Record>>> = vec![None; 16];
    for p in order {
        by_partition[p as usize] = Some(generate_partition(p, 25).collect());
    }
    let stitched: Vec<Record> = by_partition.into_iter().flatten().flatten().collect();
    let whole: Vec<Record> = generate_partition(0, 400).collect();
    assert_same_records(&stitched, &whole);
}

#[test]
fn random_split_points_concatenate() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let n = rng.random_range(1..500u64);
        let first: Vec<Record> = RecordIterator::new(0, n)
            .chain(RecordIterator::new(n, n))
            .collect();
        let whole: Vec<Record> = generate_partition(0, 2 * n).collect();
        assert_same_records(&first, &whole);
    }
}

#[test]
fn record_shape() {
    for record in generate_partition(12, 1000) {
        let bytes = record.as_bytes();
        assert_eq!(bytes.len(), 100);
        assert_eq!(&bytes[10..12], &[0x00, 0x11]);
        assert!(
            bytes[12..44]
                .iter()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
        );
        assert_eq!(&bytes[44..48], &[0x88, 0x99, 0xAA, 0xBB]);
        assert_eq!(&bytes[96..100], &[0xCC, 0xDD, 0xEE, 0xFF]);
    }
}
