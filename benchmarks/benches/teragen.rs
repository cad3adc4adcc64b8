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

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use datafusion::physical_plan::ExecutionPlan;
use datafusion::prelude::SessionContext;
use futures::TryStreamExt;
use terasort_core::execution_plans::TeraGenExec;
use terasort_core::generator::RecordIterator;
use terasort_core::partitioner::RangePartitioner;
use terasort_core::random::{SkipAheadRng, skip_ahead};
use terasort_core::record::{RECORD_LEN, Record};
use terasort_core::unsigned::Unsigned128;

const RECORDS: u64 = 100_000;

fn bench_skip_ahead(c: &mut Criterion) {
    let mut group = c.benchmark_group("skip_ahead");

    for advance in [1u64, 1 << 20, u64::MAX] {
        group.bench_with_input(
            BenchmarkId::from_parameter(advance),
            &advance,
            |b, &advance| {
                b.iter(|| skip_ahead(Unsigned128::from(black_box(advance))));
            },
        );
    }

    group.bench_function("seed_then_next", |b| {
        b.iter(|| SkipAheadRng::seed_to(black_box(123_456_789)).next());
    });

    group.finish();
}

fn bench_record_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_generation");
    group.throughput(Throughput::Bytes(RECORDS * RECORD_LEN as u64));

    group.bench_function("fill_next_100k", |b| {
        b.iter(|| {
            let mut records = RecordIterator::new(black_box(1 << 32), RECORDS);
            let mut buf = [0u8; RECORD_LEN];
            while records.fill_next(&mut buf) {
                black_box(&buf);
            }
        });
    });

    let partitioner =
        RangePartitioner::try_from_generated_sample(64, RECORDS, 10_000).unwrap();
    let records: Vec<Record> = RecordIterator::new(0, RECORDS).collect();
    group.bench_function("bucket_for_100k", |b| {
        b.iter(|| {
            for record in &records {
                black_box(partitioner.bucket_for(record.key()));
            }
        });
    });

    group.finish();
}

fn bench_teragen_exec(c: &mut Criterion) {
    let mut group = c.benchmark_group("teragen_exec");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(RECORDS * RECORD_LEN as u64));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let task_ctx = SessionContext::new().task_ctx();
    let exec = Arc::new(TeraGenExec::try_new(1, RECORDS).unwrap());

    group.bench_function("single_partition_100k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut stream = exec.execute(0, task_ctx.clone()).unwrap();
                while let Some(batch) = stream.try_next().await.unwrap() {
                    black_box(batch);
                }
            });
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_skip_ahead,
    bench_record_generation,
    bench_teragen_exec
);
criterion_main!(benches);
