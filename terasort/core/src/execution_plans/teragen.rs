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

//! Leaf execution plan that generates the TeraSort dataset.
//!
//! Each output partition of [`TeraGenExec`] is one generation partition.
//! Partitions share nothing, so an engine can execute them in any order and
//! on any executor; re-executing a partition yields identical batches.

use std::any::Any;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::stats::Precision;
use datafusion::error::{DataFusionError, Result};
use datafusion::execution::context::TaskContext;
use datafusion::physical_plan::metrics::{
    BaselineMetrics, ExecutionPlanMetricsSet, MetricsSet,
};
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, Partitioning, PlanProperties,
    RecordBatchStream, SendableRecordBatchStream, Statistics,
};
use futures::Stream;
use log::debug;

use crate::batch::{next_batch, record_schema};
use crate::config::GenerationPlan;
use crate::error::TeraSortError;
use crate::generator::{PartitionDescriptor, RecordIterator, MAX_RECORDS_PER_PARTITION};
use crate::record::RECORD_LEN;

/// TeraGenExec produces `num_partitions` partitions of
/// `records_per_partition` records each, as batches of at most the session
/// batch size.
#[derive(Debug, Clone)]
pub struct TeraGenExec {
    num_partitions: usize,
    records_per_partition: u64,
    /// Execution metrics
    metrics: ExecutionPlanMetricsSet,
    properties: PlanProperties,
}

impl TeraGenExec {
    /// Create a new TeraGenExec
    pub fn try_new(
        num_partitions: usize,
        records_per_partition: u64,
    ) -> crate::error::Result<Self> {
        if records_per_partition >= MAX_RECORDS_PER_PARTITION {
            return Err(TeraSortError::Configuration(format!(
                "TeraGenExec cannot generate {records_per_partition} records per partition"
            )));
        }
        if (num_partitions as u64)
            .checked_mul(records_per_partition)
            .is_none()
        {
            return Err(TeraSortError::Configuration(format!(
                "{num_partitions} partitions of {records_per_partition} records exceed the addressable range"
            )));
        }

        let properties = PlanProperties::new(
            datafusion::physical_expr::EquivalenceProperties::new(record_schema()),
            Partitioning::UnknownPartitioning(num_partitions),
            datafusion::physical_plan::execution_plan::EmissionType::Incremental,
            datafusion::physical_plan::execution_plan::Boundedness::Bounded,
        );
        Ok(Self {
            num_partitions,
            records_per_partition,
            metrics: ExecutionPlanMetricsSet::new(),
            properties,
        })
    }

    /// Create a TeraGenExec for the input side of a generation plan.
    pub fn from_plan(plan: &GenerationPlan) -> crate::error::Result<Self> {
        Self::try_new(plan.input_partitions, plan.records_per_partition)
    }

    /// Number of generation partitions.
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// Records generated by every partition.
    pub fn records_per_partition(&self) -> u64 {
        self.records_per_partition
    }

    /// Records generated by all partitions together.
    pub fn total_records(&self) -> u64 {
        self.num_partitions as u64 * self.records_per_partition
    }

    fn check_partition(&self, partition: usize) -> Result<()> {
        if partition >= self.num_partitions {
            return datafusion::common::internal_err!(
                "TeraGenExec invalid partition {}, the partition count is {}",
                partition,
                self.num_partitions
            );
        }
        Ok(())
    }
}

impl DisplayAs for TeraGenExec {
    fn fmt_as(
        &self,
        t: DisplayFormatType,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        match t {
            DisplayFormatType::Default | DisplayFormatType::Verbose => {
                write!(
                    f,
                    "TeraGenExec: partitions={}, records_per_partition={}",
                    self.num_partitions, self.records_per_partition
                )
            }
            DisplayFormatType::TreeRender => {
                writeln!(f, "partitions={}", self.num_partitions)?;
                write!(f, "records_per_partition={}", self.records_per_partition)
            }
        }
    }
}

impl ExecutionPlan for TeraGenExec {
    fn name(&self) -> &str {
        "TeraGenExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        record_schema()
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        if children.is_empty() {
            Ok(self)
        } else {
            Err(DataFusionError::Plan(
                "TeraGenExec does not support children plans".to_owned(),
            ))
        }
    }

    fn execute(
        &self,
        partition: usize,
        context: Arc<TaskContext>,
    ) -> Result<SendableRecordBatchStream> {
        self.check_partition(partition)?;
        let task_id = context.task_id().unwrap_or_else(|| partition.to_string());

        let descriptor =
            PartitionDescriptor::new(partition as u64, self.records_per_partition);
        debug!(
            "TeraGenExec::execute({task_id}) generating records [{}, {})",
            descriptor.first_record(),
            descriptor.first_record() + descriptor.records_per_partition()
        );

        Ok(Box::pin(TeraGenStream {
            schema: self.schema(),
            partition,
            records: descriptor.records(),
            batch_size: context.session_config().batch_size().max(1),
            baseline_metrics: BaselineMetrics::new(&self.metrics, partition),
        }))
    }

    fn metrics(&self) -> Option<MetricsSet> {
        Some(self.metrics.clone_inner())
    }

    fn partition_statistics(&self, partition: Option<usize>) -> Result<Statistics> {
        let rows = match partition {
            Some(idx) => {
                self.check_partition(idx)?;
                self.records_per_partition
            }
            None => self.total_records(),
        } as usize;

        let mut stats = Statistics::new_unknown(&self.schema());
        stats.num_rows = Precision::Exact(rows);
        stats.total_byte_size = Precision::Exact(rows.saturating_mul(RECORD_LEN));
        Ok(stats)
    }
}

struct TeraGenStream {
    schema: SchemaRef,
    partition: usize,
    records: RecordIterator,
    batch_size: usize,
    baseline_metrics: BaselineMetrics,
}

impl Stream for TeraGenStream {
    type Item = Result<RecordBatch>;

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let elapsed_compute = this.baseline_metrics.elapsed_compute().clone();
        let timer = elapsed_compute.timer();
        let batch = next_batch(&mut this.records, this.batch_size)
            .map_err(DataFusionError::from)
            .transpose();
        timer.done();

        if batch.is_none() {
            debug!(
                "TeraGenExec partition {} finished at record {}",
                this.partition,
                this.records.next_index()
            );
        }
        this.baseline_metrics.record_poll(Poll::Ready(batch))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let batches = self.records.len().div_ceil(self.batch_size);
        (batches, Some(batches))
    }
}

impl RecordBatchStream for TeraGenStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::batch_to_records;
    use crate::generator::generate_partition;
    use datafusion::physical_plan::{collect_partitioned, displayable};
    use datafusion::prelude::{SessionConfig, SessionContext};
    use futures::StreamExt;

    fn task_ctx(batch_size: usize) -> Arc<TaskContext> {
        SessionContext::new_with_config(SessionConfig::new().with_batch_size(batch_size))
            .task_ctx()
    }

    #[tokio::test]
    async fn test_partitions_match_generator() -> Result<()> {
        let exec: Arc<dyn ExecutionPlan> = Arc::new(TeraGenExec::try_new(3, 10)?);
        let partitions = collect_partitioned(exec, task_ctx(4)).await?;
        assert_eq!(partitions.len(), 3);

        for (p, batches) in partitions.iter().enumerate() {
            let sizes: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
            assert_eq!(sizes, vec![4, 4, 2]);

            let mut expected = generate_partition(p as u64, 10);
            for batch in batches {
                for record in batch_to_records(batch)? {
                    let want = expected.next().unwrap();
                    assert_eq!(record.as_bytes(), want.as_bytes());
                }
            }
            assert!(expected.next().is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_reexecution_is_deterministic() -> Result<()> {
        let exec = TeraGenExec::try_new(2, 7)?;
        let first: Vec<RecordBatch> = exec
            .execute(1, task_ctx(8192))?
            .map(|b| b.unwrap())
            .collect()
            .await;
        let second: Vec<RecordBatch> = exec
            .execute(1, task_ctx(3))?
            .map(|b| b.unwrap())
            .collect()
            .await;
        assert_eq!(
            datafusion::arrow::compute::concat_batches(&record_schema(), &first)?,
            datafusion::arrow::compute::concat_batches(&record_schema(), &second)?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_record_output_rows() -> Result<()> {
        let exec = TeraGenExec::try_new(1, 25)?;
        let mut stream = exec.execute(0, task_ctx(10))?;
        while let Some(batch) = stream.next().await {
            batch?;
        }
        let metrics = exec.metrics().unwrap();
        assert_eq!(metrics.output_rows(), Some(25));
        Ok(())
    }

    #[test]
    fn test_invalid_partition() -> Result<()> {
        let exec = TeraGenExec::try_new(2, 5)?;
        assert!(exec.execute(2, task_ctx(10)).is_err());
        assert!(exec.partition_statistics(Some(2)).is_err());
        Ok(())
    }

    #[test]
    fn test_statistics_and_display() -> Result<()> {
        let exec = TeraGenExec::try_new(4, 1000)?;
        let stats = exec.partition_statistics(None)?;
        assert_eq!(stats.num_rows, Precision::Exact(4000));
        assert_eq!(stats.total_byte_size, Precision::Exact(400_000));
        assert_eq!(
            exec.partition_statistics(Some(3))?.num_rows,
            Precision::Exact(1000)
        );

        let display = displayable(&exec).one_line().to_string();
        assert!(
            display.contains("TeraGenExec: partitions=4, records_per_partition=1000")
        );
        Ok(())
    }

    #[test]
    fn test_rejects_oversized_partitions() {
        assert!(TeraGenExec::try_new(1, MAX_RECORDS_PER_PARTITION).is_err());
        assert!(TeraGenExec::try_new(usize::MAX, (1 << 31) - 1).is_err());
    }
}
