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

//! Lazy per-partition record generation.
//!
//! Partition `p` of a dataset with `n` records per partition is the half
//! open range of record indices `[p * n, (p + 1) * n)`.
//! Its generator is seeded directly at the first index, so partitions can be
//! produced in any order, on any worker, and always yield the same bytes.

use crate::random::SkipAheadRng;
use crate::record::{RECORD_LEN, Record, encode_record};
use crate::unsigned::Unsigned128;

/// Upper bound (exclusive) on the number of records in one partition.
pub const MAX_RECORDS_PER_PARTITION: u64 = 1 << 31;

/// Identifies the slice of the dataset a partition covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionDescriptor {
    partition_index: u64,
    records_per_partition: u64,
}

impl PartitionDescriptor {
    /// # Panics
    ///
    /// Panics if `records_per_partition` is not below
    /// [`MAX_RECORDS_PER_PARTITION`], or if the partition would extend past
    /// `u64::MAX` records.
    pub fn new(partition_index: u64, records_per_partition: u64) -> Self {
        assert!(
            records_per_partition < MAX_RECORDS_PER_PARTITION,
            "{records_per_partition} records per partition exceeds the addressable range"
        );
        assert!(
            partition_index
                .checked_add(1)
                .and_then(|p| p.checked_mul(records_per_partition))
                .is_some(),
            "partition {partition_index} extends past the last addressable record"
        );
        Self {
            partition_index,
            records_per_partition,
        }
    }

    /// Index of this partition.
    pub fn partition_index(&self) -> u64 {
        self.partition_index
    }

    /// Number of records this partition produces.
    pub fn records_per_partition(&self) -> u64 {
        self.records_per_partition
    }

    /// Index of the first record in this partition.
    pub fn first_record(&self) -> u64 {
        self.partition_index * self.records_per_partition
    }

    /// Generator for this partition.
    pub fn records(&self) -> RecordIterator {
        RecordIterator::new(self.first_record(), self.records_per_partition)
    }
}

/// Finite, lazily generated sequence of consecutive records.
///
/// It cannot be rewound, but creating a new one for the same range yields
/// the same records.
#[derive(Debug, Clone)]
pub struct RecordIterator {
    rng: SkipAheadRng,
    next_index: u64,
    remaining: u64,
}

impl RecordIterator {
    /// Records `[first_record, first_record + count)`.
    ///
    /// # Panics
    ///
    /// Panics if the last record index would exceed `u64::MAX`.
    pub fn new(first_record: u64, count: u64) -> Self {
        assert!(
            count == 0 || first_record.checked_add(count - 1).is_some(),
            "{count} records from {first_record} extend past the last addressable record"
        );
        Self {
            rng: SkipAheadRng::seed_to(first_record),
            next_index: first_record,
            remaining: count,
        }
    }

    /// Index of the record the next call produces, saturating at
    /// `u64::MAX` once that record has been produced.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Encodes the next record into `buf`, returning `false` once the
    /// sequence is exhausted (in which case `buf` is untouched).
    pub fn fill_next(&mut self, buf: &mut [u8; RECORD_LEN]) -> bool {
        if self.remaining == 0 {
            return false;
        }
        let rand = self.rng.next();
        encode_record(buf, rand, Unsigned128::from(self.next_index));
        self.next_index = self.next_index.saturating_add(1);
        self.remaining -= 1;
        true
    }
}

impl Iterator for RecordIterator {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = [0u8; RECORD_LEN];
        self.fill_next(&mut buf).then(|| Record::from_bytes(buf))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RecordIterator {}

/// The records of partition `partition_index` when every partition holds
/// `records_per_partition` records.
pub fn generate_partition(
    partition_index: u64,
    records_per_partition: u64,
) -> RecordIterator {
    PartitionDescriptor::new(partition_index, records_per_partition).records()
}
