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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// The current version of the TeraSort toolkit, derived from the Cargo package version.
pub const TERASORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prints the current TeraSort version to stdout.
pub fn print_version() {
    println!("TeraSort version: {TERASORT_VERSION}")
}

/// Arrow schema and record batch conversion for TeraSort records.
pub mod batch;
/// Configuration options and derived generation plans.
pub mod config;
/// Error types and result definitions for TeraSort operations.
pub mod error;
/// Physical execution plans exposing data generation to DataFusion.
pub mod execution_plans;
/// Per-partition record generation.
pub mod generator;
/// Range partitioning of records by key.
pub mod partitioner;
/// In-process generate, partition, sort and validate pipeline.
pub mod pipeline;
/// Skip-ahead linear congruential generator.
pub mod random;
/// Fixed 100-byte record layout.
pub mod record;
/// 128-bit unsigned arithmetic.
pub mod unsigned;
/// Validation of sorted output and dataset checksums.
pub mod validate;
