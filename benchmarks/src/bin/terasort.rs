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

//! TeraSort benchmark: generate the dataset and sort it in process.
//!
//! Usage:
//!   cargo run --release --bin terasort -- gen --size 10000000000 --partitions 64
//!   cargo run --release --bin terasort -- run --size 1000000000 --partitions 16 --output-partitions 16

use std::sync::Arc;
use std::time::{Duration, Instant};

use datafusion::execution::context::TaskContext;
use datafusion::physical_plan::ExecutionPlan;
use datafusion::prelude::{SessionConfig, SessionContext};
use futures::StreamExt;
use log::info;
use structopt::StructOpt;
use terasort_core::batch::batch_checksum;
use terasort_core::config::{
    GenerationPlan, TERASORT_INPUT_PARTITIONS, TERASORT_INPUT_SIZE,
    TERASORT_OUTPUT_PARTITIONS, TERASORT_SAMPLE_SIZE, TERASORT_VERIFY, TeraSortConfig,
};
use terasort_core::error::Result;
use terasort_core::execution_plans::TeraGenExec;
use terasort_core::pipeline::run_terasort;
use terasort_core::record::RECORD_LEN;
use terasort_core::unsigned::Unsigned128;
use tokio::task::JoinSet;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, StructOpt, Clone)]
struct GenOpt {
    /// Dataset size in bytes
    #[structopt(short = "s", long = "size", default_value = "1000000000")]
    size: u64,

    /// Number of generation partitions
    #[structopt(short = "p", long = "partitions")]
    partitions: Option<usize>,

    /// Batch size
    #[structopt(short = "b", long = "batch-size", default_value = "8192")]
    batch_size: usize,

    /// Number of iterations
    #[structopt(short = "n", long = "iterations", default_value = "1")]
    iterations: usize,
}

#[derive(Debug, StructOpt, Clone)]
struct RunOpt {
    /// Dataset size in bytes
    #[structopt(short = "s", long = "size", default_value = "1000000000")]
    size: u64,

    /// Number of generation partitions
    #[structopt(short = "p", long = "partitions")]
    partitions: Option<usize>,

    /// Number of sorted output partitions
    #[structopt(short = "o", long = "output-partitions")]
    output_partitions: Option<usize>,

    /// Number of keys sampled for split keys
    #[structopt(long = "sample-size")]
    sample_size: Option<u64>,

    /// Skip validation of the sorted output
    #[structopt(long = "no-verify")]
    no_verify: bool,

    /// Batch size
    #[structopt(short = "b", long = "batch-size", default_value = "8192")]
    batch_size: usize,

    /// Number of iterations
    #[structopt(short = "n", long = "iterations", default_value = "1")]
    iterations: usize,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "terasort",
    about = "Generate and sort the TeraSort benchmark dataset"
)]
enum TeraSortOpt {
    /// Generate the dataset and report its checksum
    Gen(GenOpt),
    /// Generate, range partition, sort and validate the dataset
    Run(RunOpt),
}

fn build_config(
    size: u64,
    partitions: Option<usize>,
    output_partitions: Option<usize>,
    sample_size: Option<u64>,
    verify: bool,
) -> Result<TeraSortConfig> {
    let mut config = TeraSortConfig::default()
        .with_setting(TERASORT_INPUT_SIZE, &size.to_string())?
        .with_setting(TERASORT_VERIFY, &verify.to_string())?;
    if let Some(p) = partitions {
        config = config.with_setting(TERASORT_INPUT_PARTITIONS, &p.to_string())?;
    }
    if let Some(p) = output_partitions {
        config = config.with_setting(TERASORT_OUTPUT_PARTITIONS, &p.to_string())?;
    }
    if let Some(s) = sample_size {
        config = config.with_setting(TERASORT_SAMPLE_SIZE, &s.to_string())?;
    }
    Ok(config)
}

fn task_ctx(batch_size: usize) -> Arc<TaskContext> {
    SessionContext::new_with_config(SessionConfig::new().with_batch_size(batch_size))
        .task_ctx()
}

fn print_plan(plan: &GenerationPlan) {
    println!("  Records: {}", plan.total_records);
    println!("  Bytes: {}", plan.total_records * RECORD_LEN as u64);
    println!("  Input partitions: {}", plan.input_partitions);
    println!("  Records per partition: {}", plan.records_per_partition);
    println!("  Output partitions: {}", plan.output_partitions);
}

fn print_times(name: &str, times: &[Duration], bytes: u64) {
    if times.is_empty() {
        return;
    }
    let avg_time: Duration = times.iter().sum::<Duration>() / times.len() as u32;
    let min_time = times.iter().min().copied().unwrap_or_default();
    let max_time = times.iter().max().copied().unwrap_or_default();

    println!();
    println!("{name} Results:");
    println!("  Average time: {avg_time:?}");
    println!("  Min time: {min_time:?}");
    println!("  Max time: {max_time:?}");
    println!(
        "  Throughput: {:.2} MB/s",
        bytes as f64 / avg_time.as_secs_f64() / 1024.0 / 1024.0
    );
}

async fn generate_checksum(
    exec: Arc<TeraGenExec>,
    context: Arc<TaskContext>,
) -> Result<(u64, Unsigned128)> {
    let mut tasks = JoinSet::new();
    for partition in 0..exec.num_partitions() {
        let exec = exec.clone();
        let context = context.clone();
        tasks.spawn(async move {
            let mut stream = exec.execute(partition, context)?;
            let mut records = 0u64;
            let mut checksum = Unsigned128::ZERO;
            while let Some(batch) = stream.next().await {
                let batch = batch?;
                records += batch.num_rows() as u64;
                checksum += batch_checksum(&batch)?;
            }
            Result::Ok((records, checksum))
        });
    }

    let mut records = 0u64;
    let mut checksum = Unsigned128::ZERO;
    while let Some(result) = tasks.join_next().await {
        let (r, c) = result??;
        records += r;
        checksum += c;
    }
    Ok((records, checksum))
}

async fn benchmark_gen(opt: GenOpt) -> Result<()> {
    let config = build_config(opt.size, opt.partitions, None, None, false)?;
    let plan = config.generation_plan()?;

    println!("TeraGen Benchmark Configuration:");
    print_plan(&plan);
    println!("  Batch size: {}", opt.batch_size);
    println!("  Iterations: {}", opt.iterations);
    println!();

    let exec = Arc::new(TeraGenExec::from_plan(&plan)?);
    info!("Generating with {plan:?}");
    let mut times = Vec::with_capacity(opt.iterations);
    for i in 0..opt.iterations {
        let start = Instant::now();
        let (records, checksum) =
            generate_checksum(exec.clone(), task_ctx(opt.batch_size)).await?;
        let elapsed = start.elapsed();
        times.push(elapsed);
        println!(
            "  Iteration {}: {elapsed:?} ({records} records, checksum {checksum})",
            i + 1
        );
    }

    print_times("TeraGen", &times, plan.total_records * RECORD_LEN as u64);
    Ok(())
}

async fn benchmark_run(opt: RunOpt) -> Result<()> {
    let config = build_config(
        opt.size,
        opt.partitions,
        opt.output_partitions,
        opt.sample_size,
        !opt.no_verify,
    )?;
    let plan = config.generation_plan()?;

    println!("TeraSort Benchmark Configuration:");
    print_plan(&plan);
    println!("  Sample size: {}", config.sample_size());
    println!("  Verify: {}", config.verify());
    println!("  Batch size: {}", opt.batch_size);
    println!("  Iterations: {}", opt.iterations);
    println!();

    info!("Sorting with {plan:?}");
    let mut times = Vec::with_capacity(opt.iterations);
    for i in 0..opt.iterations {
        let start = Instant::now();
        let outcome = run_terasort(
            &plan,
            config.sample_size(),
            config.verify(),
            task_ctx(opt.batch_size),
        )
        .await?;
        let elapsed = start.elapsed();
        times.push(elapsed);

        let largest = outcome.buckets.iter().map(Vec::len).max().unwrap_or(0);
        let smallest = outcome.buckets.iter().map(Vec::len).min().unwrap_or(0);
        println!(
            "  Iteration {}: {elapsed:?} (sample {:?}, generate {:?}, sort {:?}, validate {:?})",
            i + 1,
            outcome.timings.sample,
            outcome.timings.generate,
            outcome.timings.sort,
            outcome.timings.validate,
        );
        println!(
            "    {} records, checksum {}, bucket sizes {smallest}..={largest}{}",
            outcome.records,
            outcome.input_checksum,
            if outcome.report.is_some() {
                ", output validated"
            } else {
                ""
            }
        );
    }

    print_times("TeraSort", &times, plan.total_records * RECORD_LEN as u64);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    terasort_core::print_version();
    match TeraSortOpt::from_args() {
        TeraSortOpt::Gen(opt) => benchmark_gen(opt).await,
        TeraSortOpt::Run(opt) => benchmark_run(opt).await,
    }
}
