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

//! In-process TeraSort run: generate, range partition, sort, validate.
//!
//! Generation runs through [`TeraGenExec`], one tokio task per input
//! partition. Rows are routed to buckets as they are produced, every bucket
//! is sorted on the blocking pool, and the sorted buckets are validated
//! against the checksum of the generated input.

use std::sync::Arc;
use std::time::{Duration, Instant};

use datafusion::arrow::record_batch::RecordBatch;
use datafusion::execution::context::TaskContext;
use datafusion::physical_plan::ExecutionPlan;
use futures::StreamExt;
use log::{debug, info};
use tokio::task::JoinSet;

use crate::batch::{batch_checksum, batch_to_records, split_by_bucket};
use crate::config::GenerationPlan;
use crate::error::{Result, TeraSortError};
use crate::execution_plans::TeraGenExec;
use crate::partitioner::RangePartitioner;
use crate::record::Record;
use crate::unsigned::Unsigned128;
use crate::validate::{PartitionSummary, ValidationReport, validate_partitions};

/// Wall clock time spent in each phase of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    /// Sampling split keys.
    pub sample: Duration,
    /// Generating and routing records.
    pub generate: Duration,
    /// Sorting buckets.
    pub sort: Duration,
    /// Validating sorted buckets.
    pub validate: Duration,
}

/// Result of [`run_terasort`].
#[derive(Debug)]
pub struct TeraSortOutcome {
    /// Sorted records of every bucket, in bucket order.
    pub buckets: Vec<Vec<Record>>,
    /// Records generated.
    pub records: u64,
    /// Checksum of the generated input.
    pub input_checksum: Unsigned128,
    /// Present if validation was requested.
    pub report: Option<ValidationReport>,
    /// Time per phase.
    pub timings: PhaseTimings,
}

/// Generation output routed to buckets.
pub struct RoutedInput {
    /// Batches of every bucket, in arrival order.
    pub buckets: Vec<Vec<RecordBatch>>,
    /// Records generated.
    pub records: u64,
    /// Checksum of everything generated.
    pub checksum: Unsigned128,
}

async fn generate_partition_routed(
    exec: Arc<TeraGenExec>,
    partition: usize,
    partitioner: Arc<RangePartitioner>,
    context: Arc<TaskContext>,
) -> Result<(Vec<(usize, RecordBatch)>, u64, Unsigned128)> {
    let mut stream = exec.execute(partition, context)?;
    let mut routed = vec![];
    let mut records = 0u64;
    let mut checksum = Unsigned128::ZERO;
    while let Some(batch) = stream.next().await {
        let batch = batch?;
        records += batch.num_rows() as u64;
        checksum += batch_checksum(&batch)?;
        routed.extend(split_by_bucket(&batch, &partitioner)?);
    }
    Ok((routed, records, checksum))
}

/// Executes every partition of `exec` concurrently and routes the rows to
/// the buckets of `partitioner`.
pub async fn generate_routed(
    exec: Arc<TeraGenExec>,
    partitioner: Arc<RangePartitioner>,
    context: Arc<TaskContext>,
) -> Result<RoutedInput> {
    let mut tasks = JoinSet::new();
    for partition in 0..exec.num_partitions() {
        tasks.spawn(generate_partition_routed(
            exec.clone(),
            partition,
            partitioner.clone(),
            context.clone(),
        ));
    }

    let mut input = RoutedInput {
        buckets: vec![vec![]; partitioner.num_buckets()],
        records: 0,
        checksum: Unsigned128::ZERO,
    };
    while let Some(result) = tasks.join_next().await {
        let (routed, records, checksum) = result??;
        input.records += records;
        input.checksum += checksum;
        for (bucket, batch) in routed {
            input.buckets[bucket].push(batch);
        }
    }
    Ok(input)
}

/// Sorts the records of every bucket by key on the blocking thread pool.
pub async fn sort_buckets(
    buckets: Vec<Vec<RecordBatch>>,
    partitioner: Arc<RangePartitioner>,
) -> Result<Vec<Vec<Record>>> {
    let mut tasks = JoinSet::new();
    for (bucket, batches) in buckets.into_iter().enumerate() {
        let partitioner = partitioner.clone();
        tasks.spawn_blocking(move || -> Result<(usize, Vec<Record>)> {
            let mut records = Vec::new();
            for batch in &batches {
                records.extend(batch_to_records(batch)?);
            }
            let comparator = partitioner.comparator();
            records.sort_unstable_by(|a, b| comparator.compare(a.key(), b.key()));
            debug!("Sorted bucket {bucket} with {} records", records.len());
            Ok((bucket, records))
        });
    }

    let mut sorted = vec![vec![]; partitioner.num_buckets()];
    while let Some(result) = tasks.join_next().await {
        let (bucket, records) = result??;
        sorted[bucket] = records;
    }
    Ok(sorted)
}

/// Summarises and validates sorted buckets against `expected_checksum`.
pub fn validate_buckets(
    buckets: &[Vec<Record>],
    partitioner: &RangePartitioner,
    expected_checksum: Unsigned128,
) -> Result<ValidationReport> {
    let comparator = partitioner.comparator();
    let summaries = buckets
        .iter()
        .enumerate()
        .map(|(i, records)| {
            let records = records.iter().map(Record::as_bytes);
            PartitionSummary::from_records(i, records, comparator)
        })
        .collect::<Vec<_>>();
    validate_partitions(&summaries, comparator).check(Some(expected_checksum))
}

/// Runs a complete TeraSort of the dataset described by `plan`.
pub async fn run_terasort(
    plan: &GenerationPlan,
    sample_size: u64,
    verify: bool,
    context: Arc<TaskContext>,
) -> Result<TeraSortOutcome> {
    let mut timings = PhaseTimings::default();

    let start = Instant::now();
    let partitioner = Arc::new(RangePartitioner::try_from_generated_sample(
        plan.output_partitions,
        plan.total_records,
        sample_size,
    )?);
    timings.sample = start.elapsed();

    let start = Instant::now();
    let exec = Arc::new(TeraGenExec::from_plan(plan)?);
    let input = generate_routed(exec, partitioner.clone(), context).await?;
    timings.generate = start.elapsed();
    if input.records != plan.total_records {
        return Err(TeraSortError::Internal(format!(
            "generated {} records, expected {}",
            input.records, plan.total_records
        )));
    }

    let start = Instant::now();
    let buckets = sort_buckets(input.buckets, partitioner.clone()).await?;
    timings.sort = start.elapsed();

    let report = if verify {
        let start = Instant::now();
        let report = validate_buckets(&buckets, &partitioner, input.checksum)?;
        timings.validate = start.elapsed();
        Some(report)
    } else {
        None
    };

    info!(
        "Sorted {} records into {} buckets (sample {:?}, generate {:?}, sort {:?}, validate {:?})",
        input.records,
        buckets.len(),
        timings.sample,
        timings.generate,
        timings.sort,
        timings.validate
    );

    Ok(TeraSortOutcome {
        buckets,
        records: input.records,
        input_checksum: input.checksum,
        report,
        timings,
    })
}
