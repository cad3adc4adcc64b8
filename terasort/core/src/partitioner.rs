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

//! Range partitioning of records by key.
//!
//! Buckets are contiguous key ranges separated by split keys. Keys are
//! compared as unsigned bytes through an explicit [`KeyComparator`].

use std::cmp::Ordering;

use log::debug;

use crate::error::{Result, TeraSortError};
use crate::generator::RecordIterator;
use crate::record::KEY_LEN;

/// Total order over record keys.
pub trait KeyComparator: Send + Sync {
    /// Compares two keys.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Lexicographic order over unsigned bytes, `0x00` lowest and `0xFF` highest.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsignedBytesComparator;

impl KeyComparator for UnsignedBytesComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        // slices of u8 compare as unsigned
        a.cmp(b)
    }
}

/// Ordered boundary keys between buckets.
#[derive(Debug, Clone, Default)]
pub struct SplitKeys {
    keys: Vec<Vec<u8>>,
}

impl SplitKeys {
    /// Wraps `keys`, which must be in non-decreasing unsigned byte order.
    pub fn try_new(keys: Vec<Vec<u8>>) -> Result<Self> {
        Self::try_new_with_comparator(keys, &UnsignedBytesComparator)
    }

    /// Wraps `keys`, which must be non-decreasing under `comparator`.
    pub fn try_new_with_comparator(
        keys: Vec<Vec<u8>>,
        comparator: &dyn KeyComparator,
    ) -> Result<Self> {
        let split_keys = Self { keys };
        split_keys.check_order(comparator)?;
        Ok(split_keys)
    }

    fn check_order(&self, comparator: &dyn KeyComparator) -> Result<()> {
        match self
            .keys
            .windows(2)
            .position(|w| comparator.compare(&w[0], &w[1]) == Ordering::Greater)
        {
            Some(i) => Err(TeraSortError::Configuration(format!(
                "split keys out of order at position {}",
                i + 1
            ))),
            None => Ok(()),
        }
    }

    /// Picks `num_buckets - 1` evenly spaced split keys from `samples`.
    ///
    /// Samples are sorted first. With fewer samples than buckets some split
    /// keys repeat and the buckets between them stay empty.
    pub fn from_samples(mut samples: Vec<Vec<u8>>, num_buckets: usize) -> Result<Self> {
        if num_buckets == 0 {
            return Err(TeraSortError::Configuration(
                "number of buckets must be at least 1".to_owned(),
            ));
        }
        if num_buckets == 1 {
            return Ok(Self::default());
        }
        if samples.is_empty() {
            return Err(TeraSortError::Configuration(format!(
                "cannot derive {} split keys from an empty sample",
                num_buckets - 1
            )));
        }

        samples.sort_unstable_by(|a, b| UnsignedBytesComparator.compare(a, b));
        let step = samples.len() as f64 / num_buckets as f64;
        let keys = (1..num_buckets)
            .map(|i| {
                let pos = ((step * i as f64).round() as usize).min(samples.len() - 1);
                samples[pos].clone()
            })
            .collect::<Vec<_>>();
        debug!(
            "Derived {} split keys from {} samples",
            keys.len(),
            samples.len()
        );
        Ok(Self { keys })
    }

    /// The boundary keys in order.
    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }

    /// Number of boundary keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if there are no boundary keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keys of `sample_size` records spread evenly over `[0, total_records)`.
///
/// Each sampled record is reached by skip-ahead, so the cost does not depend
/// on `total_records`.
pub fn sample_keys(total_records: u64, sample_size: u64) -> Vec<Vec<u8>> {
    let sample_size = sample_size.min(total_records);
    if sample_size == 0 {
        return vec![];
    }
    let stride = total_records / sample_size;
    (0..sample_size)
        .filter_map(|i| {
            RecordIterator::new(i * stride, 1)
                .next()
                .map(|r| r.key().to_vec())
        })
        .collect()
}

/// Maps keys to buckets `0..num_buckets` by comparing against split keys.
pub struct RangePartitioner {
    num_buckets: usize,
    split_keys: SplitKeys,
    comparator: Box<dyn KeyComparator>,
}

impl std::fmt::Debug for RangePartitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangePartitioner")
            .field("num_buckets", &self.num_buckets)
            .field("split_keys", &self.split_keys.len())
            .finish()
    }
}

impl RangePartitioner {
    /// Partitioner over `num_buckets` buckets, using unsigned byte order.
    pub fn try_new(num_buckets: usize, split_keys: SplitKeys) -> Result<Self> {
        Self::try_new_with_comparator(
            num_buckets,
            split_keys,
            Box::new(UnsignedBytesComparator),
        )
    }

    /// Partitioner using a caller supplied comparator.
    ///
    /// `split_keys` must hold exactly `num_buckets - 1` keys, in
    /// non-decreasing order under `comparator`.
    pub fn try_new_with_comparator(
        num_buckets: usize,
        split_keys: SplitKeys,
        comparator: Box<dyn KeyComparator>,
    ) -> Result<Self> {
        if num_buckets == 0 {
            return Err(TeraSortError::Configuration(
                "number of buckets must be at least 1".to_owned(),
            ));
        }
        if split_keys.len() != num_buckets - 1 {
            return Err(TeraSortError::Configuration(format!(
                "{num_buckets} buckets need {} split keys, got {}",
                num_buckets - 1,
                split_keys.len()
            )));
        }
        split_keys.check_order(comparator.as_ref())?;
        Ok(Self {
            num_buckets,
            split_keys,
            comparator,
        })
    }

    /// Samples `sample_size` generated keys and builds a partitioner over
    /// `num_buckets` buckets for a dataset of `total_records` records.
    pub fn try_from_generated_sample(
        num_buckets: usize,
        total_records: u64,
        sample_size: u64,
    ) -> Result<Self> {
        let samples = sample_keys(total_records, sample_size);
        Self::try_new(num_buckets, SplitKeys::from_samples(samples, num_buckets)?)
    }

    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// The split keys.
    pub fn split_keys(&self) -> &SplitKeys {
        &self.split_keys
    }

    /// The comparator used for routing, also the order buckets are sorted by.
    pub fn comparator(&self) -> &dyn KeyComparator {
        self.comparator.as_ref()
    }

    /// Bucket for `key`: the number of split keys less than or equal to it.
    pub fn bucket_for(&self, key: &[u8]) -> usize {
        debug_assert!(key.len() == KEY_LEN, "keys are {KEY_LEN} bytes");
        self.split_keys.keys.partition_point(|split| {
            self.comparator.compare(split, key) != Ordering::Greater
        })
    }
}
