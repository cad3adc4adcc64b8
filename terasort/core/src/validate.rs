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

//! Validation of sorted output.
//!
//! Every output partition is summarised independently (record count, first
//! and last key, misordered records, checksum). The summaries are then
//! checked in partition order: keys must not decrease across partition
//! boundaries either. The checksum is the 128-bit sum of the CRC32 of every
//! record, which does not depend on record order, so the checksum of sorted
//! output must equal the checksum of the generated input.

use std::cmp::Ordering;

use log::{info, warn};

use crate::error::{Result, TeraSortError};
use crate::partitioner::KeyComparator;
use crate::record::{KEY_LEN, RECORD_LEN};
use crate::unsigned::Unsigned128;

/// Contribution of a single record to the dataset checksum.
pub fn record_checksum(record: &[u8; RECORD_LEN]) -> Unsigned128 {
    Unsigned128::from(crc32fast::hash(record) as u64)
}

/// [`record_checksum`] of a record held as its key and value.
pub fn split_record_checksum(key: &[u8], value: &[u8]) -> Unsigned128 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    hasher.update(value);
    Unsigned128::from(hasher.finalize() as u64)
}

/// Order independent checksum of a sequence of records.
pub fn dataset_checksum<'a>(
    records: impl IntoIterator<Item = &'a [u8; RECORD_LEN]>,
) -> Unsigned128 {
    records
        .into_iter()
        .fold(Unsigned128::ZERO, |sum, r| sum + record_checksum(r))
}

/// Summary of one output partition.
#[derive(Debug, Clone)]
pub struct PartitionSummary {
    partition: usize,
    records: u64,
    first_key: Option<[u8; KEY_LEN]>,
    last_key: Option<[u8; KEY_LEN]>,
    misordered: u64,
    first_misordered: Option<u64>,
    checksum: Unsigned128,
}

impl PartitionSummary {
    /// Empty summary for `partition`.
    pub fn new(partition: usize) -> Self {
        Self {
            partition,
            records: 0,
            first_key: None,
            last_key: None,
            misordered: 0,
            first_misordered: None,
            checksum: Unsigned128::ZERO,
        }
    }

    /// Summarises `records`, which are expected in sorted order.
    pub fn from_records<'a>(
        partition: usize,
        records: impl IntoIterator<Item = &'a [u8; RECORD_LEN]>,
        comparator: &dyn KeyComparator,
    ) -> Self {
        let mut summary = Self::new(partition);
        for record in records {
            summary.update(record, comparator);
        }
        summary
    }

    /// Adds the next record of the partition.
    pub fn update(&mut self, record: &[u8; RECORD_LEN], comparator: &dyn KeyComparator) {
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&record[..KEY_LEN]);

        if let Some(last) = &self.last_key {
            if comparator.compare(last, &key) == Ordering::Greater {
                self.misordered += 1;
                self.first_misordered.get_or_insert(self.records);
            }
        }
        if self.first_key.is_none() {
            self.first_key = Some(key);
        }
        self.last_key = Some(key);
        self.records += 1;
        self.checksum += record_checksum(record);
    }

    /// Index of the partition.
    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Number of records seen.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Smallest key, i.e. the first one if the partition is sorted.
    pub fn first_key(&self) -> Option<&[u8; KEY_LEN]> {
        self.first_key.as_ref()
    }

    /// The last key seen.
    pub fn last_key(&self) -> Option<&[u8; KEY_LEN]> {
        self.last_key.as_ref()
    }

    /// Number of records whose key is smaller than the key before them.
    pub fn misordered(&self) -> u64 {
        self.misordered
    }

    /// Checksum of the partition's records.
    pub fn checksum(&self) -> Unsigned128 {
        self.checksum
    }
}

/// Outcome of validating a set of partition summaries.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Total records across partitions.
    pub records: u64,
    /// Sum of the partition checksums.
    pub checksum: Unsigned128,
    /// Human readable description of every problem found.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// True if no problems were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fails with [`TeraSortError::Validation`] unless the output is sorted
    /// and its checksum equals `expected_checksum`.
    pub fn check(self, expected_checksum: Option<Unsigned128>) -> Result<Self> {
        let mut errors = self.errors.clone();
        if let Some(expected) = expected_checksum {
            if expected != self.checksum {
                errors.push(format!(
                    "checksum {} does not match expected {expected}",
                    self.checksum
                ));
            }
        }
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(TeraSortError::Validation(errors.join("; ")))
        }
    }
}

/// Checks ordering within and across partitions.
///
/// `summaries` must be in output partition order. Empty partitions are
/// skipped when comparing neighbouring boundaries.
pub fn validate_partitions(
    summaries: &[PartitionSummary],
    comparator: &dyn KeyComparator,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut previous: Option<&PartitionSummary> = None;

    for summary in summaries {
        report.records += summary.records;
        report.checksum += summary.checksum;

        if let Some(first_bad) = summary.first_misordered {
            report.errors.push(format!(
                "partition {} has {} misordered records, first at offset {first_bad}",
                summary.partition, summary.misordered
            ));
        }

        let Some(first) = summary.first_key() else {
            continue;
        };
        if let Some(prev) = previous {
            if let Some(prev_last) = prev.last_key() {
                if comparator.compare(prev_last, first) == Ordering::Greater {
                    report.errors.push(format!(
                        "partition {} ends with {prev_last:02x?} after partition {} starts with {first:02x?}",
                        prev.partition, summary.partition
                    ));
                }
            }
        }
        previous = Some(summary);
    }

    if report.is_valid() {
        info!(
            "Validated {} records in {} partitions, checksum {}",
            report.records,
            summaries.len(),
            report.checksum
        );
    } else {
        for error in &report.errors {
            warn!("Validation error: {error}");
        }
    }
    report
}
