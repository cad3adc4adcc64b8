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

//! Arrow representation of TeraSort records.
//!
//! A record batch has two non-null columns: the 10-byte `key` and the
//! 90-byte `value`, both `FixedSizeBinary`.

use std::sync::{Arc, LazyLock};

use datafusion::arrow::array::{
    Array, ArrayRef, FixedSizeBinaryArray, FixedSizeBinaryBuilder, UInt32Array,
};
use datafusion::arrow::compute::take_record_batch;
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;

use crate::error::{Result, TeraSortError};
use crate::generator::RecordIterator;
use crate::partitioner::RangePartitioner;
use crate::record::{KEY_LEN, RECORD_LEN, Record, VALUE_LEN};
use crate::unsigned::Unsigned128;
use crate::validate::split_record_checksum;

/// Name of the key column.
pub const KEY_COLUMN: &str = "key";
/// Name of the value column.
pub const VALUE_COLUMN: &str = "value";

static RECORD_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(KEY_COLUMN, DataType::FixedSizeBinary(KEY_LEN as i32), false),
        Field::new(VALUE_COLUMN, DataType::FixedSizeBinary(VALUE_LEN as i32), false),
    ]))
});

/// Schema of TeraSort record batches.
pub fn record_schema() -> SchemaRef {
    RECORD_SCHEMA.clone()
}

struct BatchBuilder {
    keys: FixedSizeBinaryBuilder,
    values: FixedSizeBinaryBuilder,
}

impl BatchBuilder {
    fn with_capacity(rows: usize) -> Self {
        Self {
            keys: FixedSizeBinaryBuilder::with_capacity(rows, KEY_LEN as i32),
            values: FixedSizeBinaryBuilder::with_capacity(rows, VALUE_LEN as i32),
        }
    }

    fn append(&mut self, record: &[u8; RECORD_LEN]) -> Result<()> {
        self.keys.append_value(&record[..KEY_LEN])?;
        self.values.append_value(&record[KEY_LEN..])?;
        Ok(())
    }

    fn finish(mut self) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.keys.finish()),
            Arc::new(self.values.finish()),
        ];
        Ok(RecordBatch::try_new(record_schema(), columns)?)
    }
}

/// Builds a batch holding `records` in order.
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch> {
    let mut builder = BatchBuilder::with_capacity(records.len());
    for record in records {
        builder.append(record.as_bytes())?;
    }
    builder.finish()
}

/// Generates up to `max_rows` records from `records` into a batch.
///
/// Returns `None` once the iterator is exhausted.
pub fn next_batch(
    records: &mut RecordIterator,
    max_rows: usize,
) -> Result<Option<RecordBatch>> {
    let rows = records.len().min(max_rows);
    if rows == 0 {
        return Ok(None);
    }
    let mut builder = BatchBuilder::with_capacity(rows);
    let mut buf = [0u8; RECORD_LEN];
    for _ in 0..rows {
        if !records.fill_next(&mut buf) {
            break;
        }
        builder.append(&buf)?;
    }
    builder.finish().map(Some)
}

fn fixed_size_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    width: usize,
) -> Result<&'a FixedSizeBinaryArray> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| {
            TeraSortError::General(format!("record batch has no `{name}` column"))
        })?;
    let array = column
        .as_any()
        .downcast_ref::<FixedSizeBinaryArray>()
        .ok_or_else(|| {
            TeraSortError::General(format!(
                "column `{name}` is {}, expected FixedSizeBinary({width})",
                column.data_type()
            ))
        })?;
    if array.value_length() as usize != width {
        return Err(TeraSortError::General(format!(
            "column `{name}` has width {}, expected {width}",
            array.value_length()
        )));
    }
    if array.null_count() > 0 {
        return Err(TeraSortError::General(format!(
            "column `{name}` contains nulls"
        )));
    }
    Ok(array)
}

/// The key column of a record batch.
pub fn key_column(batch: &RecordBatch) -> Result<&FixedSizeBinaryArray> {
    fixed_size_column(batch, KEY_COLUMN, KEY_LEN)
}

/// Reassembles the records of a batch.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let keys = key_column(batch)?;
    let values = fixed_size_column(batch, VALUE_COLUMN, VALUE_LEN)?;
    Ok((0..batch.num_rows())
        .map(|row| {
            let mut buf = [0u8; RECORD_LEN];
            buf[..KEY_LEN].copy_from_slice(keys.value(row));
            buf[KEY_LEN..].copy_from_slice(values.value(row));
            Record::from_bytes(buf)
        })
        .collect())
}

/// Dataset checksum of the rows of `batch`, computed from the columns
/// without reassembling records.
pub fn batch_checksum(batch: &RecordBatch) -> Result<Unsigned128> {
    let keys = key_column(batch)?;
    let values = fixed_size_column(batch, VALUE_COLUMN, VALUE_LEN)?;
    Ok((0..batch.num_rows()).fold(Unsigned128::ZERO, |sum, row| {
        sum + split_record_checksum(keys.value(row), values.value(row))
    }))
}

/// Splits `batch` into one batch per non-empty bucket, preserving row order
/// within each bucket.
pub fn split_by_bucket(
    batch: &RecordBatch,
    partitioner: &RangePartitioner,
) -> Result<Vec<(usize, RecordBatch)>> {
    let keys = key_column(batch)?;
    let mut rows_per_bucket: Vec<Vec<u32>> = vec![vec![]; partitioner.num_buckets()];
    for row in 0..keys.len() {
        rows_per_bucket[partitioner.bucket_for(keys.value(row))].push(row as u32);
    }

    rows_per_bucket
        .into_iter()
        .enumerate()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(bucket, rows)| {
            let indices = UInt32Array::from(rows);
            Ok((bucket, take_record_batch(batch, &indices)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_partition;
    use crate::partitioner::SplitKeys;

    #[test]
    fn records_survive_batch_conversion() -> Result<()> {
        let records: Vec<Record> = generate_partition(1, 20).collect();
        let batch = records_to_batch(&records)?;
        assert_eq!(batch.num_rows(), 20);
        assert_eq!(batch.schema(), record_schema());

        let back = batch_to_records(&batch)?;
        for (a, b) in records.iter().zip(&back) {
            assert_eq!(a.as_bytes(), b.as_bytes());
        }
        Ok(())
    }

    #[test]
    fn next_batch_respects_limit() -> Result<()> {
        let mut records = generate_partition(0, 25);
        let sizes: Vec<usize> =
            std::iter::from_fn(|| next_batch(&mut records, 10).transpose())
                .map(|b| b.map(|b| b.num_rows()))
            .collect::<Result<_>>()?;
        assert_eq!(sizes, vec![10, 10, 5]);
        Ok(())
    }

    #[test]
    fn batch_checksum_matches_records() -> Result<()> {
        let records: Vec<Record> = generate_partition(2, 50).collect();
        let batch = records_to_batch(&records)?;
        assert_eq!(
            batch_checksum(&batch)?,
            crate::validate::dataset_checksum(records.iter().map(Record::as_bytes))
        );
        assert_eq!(
            batch_checksum(&RecordBatch::new_empty(record_schema()))?,
            Unsigned128::ZERO
        );
        Ok(())
    }

    #[test]
    fn split_routes_every_row() -> Result<()> {
        let mut split = vec![0u8; KEY_LEN];
        split[0] = 0x80;
        let partitioner = RangePartitioner::try_new(2, SplitKeys::try_new(vec![split])?)?;

        let records: Vec<Record> = generate_partition(0, 200).collect();
        let batch = records_to_batch(&records)?;
        let parts = split_by_bucket(&batch, &partitioner)?;

        let total: usize = parts.iter().map(|(_, b)| b.num_rows()).sum();
        assert_eq!(total, 200);
        for (bucket, part) in &parts {
            let keys = key_column(part)?;
            for row in 0..keys.len() {
                assert_eq!(keys.value(row)[0] >= 0x80, *bucket == 1);
            }
        }
        Ok(())
    }

    #[test]
    fn rejects_foreign_batches() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            KEY_COLUMN,
            DataType::Utf8,
            false,
        )]));
        let batch = RecordBatch::new_empty(schema);
        assert!(key_column(&batch).is_err());
        let empty = RecordBatch::new_empty(record_schema());
        assert!(batch_to_records(&empty).unwrap().is_empty());
    }
}
