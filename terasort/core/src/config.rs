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

//! TeraSort configuration

use std::collections::HashMap;
use std::result;
use std::sync::LazyLock;

use crate::error::{Result, TeraSortError};
use crate::generator::MAX_RECORDS_PER_PARTITION;
use crate::record::RECORD_LEN;

use datafusion::{arrow::datatypes::DataType, common::config_err};

/// Size of the generated dataset in bytes.
pub const TERASORT_INPUT_SIZE: &str = "terasort.input_size";
/// Number of partitions the dataset is generated in.
pub const TERASORT_INPUT_PARTITIONS: &str = "terasort.input_partitions";
/// Number of range partitioned, sorted output buckets.
pub const TERASORT_OUTPUT_PARTITIONS: &str = "terasort.output_partitions";
/// Number of keys sampled to pick split keys.
pub const TERASORT_SAMPLE_SIZE: &str = "terasort.sample_size";
/// Whether sorted output is validated.
pub const TERASORT_VERIFY: &str = "terasort.verify";

/// Result of validating a raw setting value.
pub type ParseResult<T> = result::Result<T, String>;

static CONFIG_ENTRIES: LazyLock<HashMap<String, ConfigEntry>> = LazyLock::new(|| {
    let parallelism = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1)
        .to_string();
    let entries = vec![
        ConfigEntry::new(TERASORT_INPUT_SIZE.to_string(),
                         "Size of the generated dataset in bytes, rounded down to whole records per partition".to_string(),
                         DataType::UInt64, Some(1_000_000_000u64.to_string())),
        ConfigEntry::new(TERASORT_INPUT_PARTITIONS.to_string(),
                         "Number of partitions the dataset is generated in".to_string(),
                         DataType::UInt32, Some(parallelism.clone())),
        ConfigEntry::new(TERASORT_OUTPUT_PARTITIONS.to_string(),
                         "Number of range partitioned output buckets".to_string(),
                         DataType::UInt32, Some(parallelism)),
        ConfigEntry::new(TERASORT_SAMPLE_SIZE.to_string(),
                         "Number of keys sampled to choose split keys".to_string(),
                         DataType::UInt64, Some(100_000u64.to_string())),
        ConfigEntry::new(TERASORT_VERIFY.to_string(),
                         "Validate ordering and checksum of the sorted output".to_string(),
                         DataType::Boolean, Some(true.to_string())),
    ];
    entries
        .into_iter()
        .map(|e| (e.name.clone(), e))
        .collect::<HashMap<_, _>>()
});

/// Configuration option meta-data
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    name: String,
    description: String,
    data_type: DataType,
    default_value: Option<String>,
}

impl ConfigEntry {
    fn new(
        name: String,
        description: String,
        data_type: DataType,
        default_value: Option<String>,
    ) -> Self {
        Self {
            name,
            description,
            data_type,
            default_value,
        }
    }
}

/// Dataset shape derived from a [`TeraSortConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPlan {
    /// Partitions the dataset is generated in.
    pub input_partitions: usize,
    /// Records in every input partition.
    pub records_per_partition: u64,
    /// Records in the whole dataset.
    pub total_records: u64,
    /// Sorted output buckets.
    pub output_partitions: usize,
}

impl GenerationPlan {
    /// Derives the plan for `input_size` bytes split over `input_partitions`.
    ///
    /// Records per partition are rounded down, so the dataset can be slightly
    /// smaller than requested.
    pub fn try_new(
        input_size: u64,
        input_partitions: usize,
        output_partitions: usize,
    ) -> Result<Self> {
        if input_partitions == 0 || output_partitions == 0 {
            return Err(TeraSortError::Configuration(format!(
                "partition counts must be positive, got {input_partitions} input and {output_partitions} output partitions"
            )));
        }
        let total_requested = input_size / RECORD_LEN as u64;
        let records_per_partition = total_requested / input_partitions as u64;
        if records_per_partition == 0 {
            return Err(TeraSortError::Configuration(format!(
                "{input_size} bytes is less than one record per partition for {input_partitions} partitions"
            )));
        }
        if records_per_partition >= MAX_RECORDS_PER_PARTITION {
            return Err(TeraSortError::Configuration(format!(
                "{records_per_partition} records per partition is too many, use more than {input_partitions} partitions"
            )));
        }
        Ok(Self {
            input_partitions,
            records_per_partition,
            total_records: records_per_partition * input_partitions as u64,
            output_partitions,
        })
    }
}

/// TeraSort configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeraSortConfig {
    /// Settings stored in map for easy serde
    settings: HashMap<String, String>,
}

impl TeraSortConfig {
    /// Create a new configuration based on key-value pairs
    pub fn with_settings(settings: HashMap<String, String>) -> Result<Self> {
        let supported_entries = TeraSortConfig::valid_entries();
        for name in settings.keys() {
            if !supported_entries.contains_key(name) {
                return Err(TeraSortError::Configuration(format!(
                    "Unknown configuration setting '{name}'"
                )));
            }
        }
        for (name, entry) in supported_entries {
            if let Some(v) = settings.get(name) {
                // validate that we can parse the user-supplied value
                Self::parse_value(v.as_str(), entry.data_type.clone()).map_err(|e| {
                    TeraSortError::Configuration(format!(
                        "Failed to parse user-supplied value '{v}' for configuration setting '{name}': {e}"
                    ))
                })?;
            } else if let Some(v) = entry.default_value.clone() {
                Self::parse_value(v.as_str(), entry.data_type.clone()).map_err(|e| {
                    TeraSortError::Configuration(format!(
                        "Failed to parse default value '{v}' for configuration setting '{name}': {e}"
                    ))
                })?;
            } else {
                return Err(TeraSortError::Configuration(format!(
                    "No value specified for mandatory configuration setting '{name}'"
                )));
            }
        }

        Ok(Self { settings })
    }

    /// Builder style setter, validating the value.
    pub fn with_setting(mut self, key: &str, value: &str) -> Result<Self> {
        self.settings.insert(key.to_owned(), value.to_owned());
        Self::with_settings(self.settings)
    }

    /// Checks that `val` parses as `data_type`.
    pub fn parse_value(val: &str, data_type: DataType) -> ParseResult<()> {
        match data_type {
            DataType::UInt32 => {
                val.parse::<u32>().map_err(|e| format!("{e:?}"))?;
            }
            DataType::UInt64 => {
                val.parse::<u64>().map_err(|e| format!("{e:?}"))?;
            }
            DataType::Boolean => {
                val.parse::<bool>().map_err(|e| format!("{e:?}"))?;
            }
            _ => {
                return Err(format!("not support data type: {data_type}"));
            }
        }

        Ok(())
    }

    /// All available configuration options.
    pub fn valid_entries() -> &'static HashMap<String, ConfigEntry> {
        &CONFIG_ENTRIES
    }

    /// Explicitly set values.
    pub fn settings(&self) -> &HashMap<String, String> {
        &self.settings
    }

    /// Dataset size in bytes.
    pub fn input_size(&self) -> u64 {
        self.get_u64_setting(TERASORT_INPUT_SIZE)
    }

    /// Number of generation partitions.
    pub fn input_partitions(&self) -> usize {
        self.get_u64_setting(TERASORT_INPUT_PARTITIONS) as usize
    }

    /// Number of sorted output buckets.
    pub fn output_partitions(&self) -> usize {
        self.get_u64_setting(TERASORT_OUTPUT_PARTITIONS) as usize
    }

    /// Keys sampled to choose split keys.
    pub fn sample_size(&self) -> u64 {
        self.get_u64_setting(TERASORT_SAMPLE_SIZE)
    }

    /// Whether sorted output is validated.
    pub fn verify(&self) -> bool {
        self.get_bool_setting(TERASORT_VERIFY)
    }

    /// Derives records per partition and total records.
    pub fn generation_plan(&self) -> Result<GenerationPlan> {
        GenerationPlan::try_new(
            self.input_size(),
            self.input_partitions(),
            self.output_partitions(),
        )
    }

    fn get_u64_setting(&self, key: &str) -> u64 {
        // infallible because we validate all configs in the constructor
        self.get_string_setting(key).parse().unwrap_or_default()
    }

    fn get_bool_setting(&self, key: &str) -> bool {
        // infallible because we validate all configs in the constructor
        self.get_string_setting(key).parse().unwrap_or_default()
    }

    fn get_string_setting(&self, key: &str) -> String {
        if let Some(v) = self.settings.get(key) {
            v.to_string()
        } else {
            Self::valid_entries()
                .get(key)
                .and_then(|entry| entry.default_value.clone())
                .unwrap_or_default()
        }
    }
}

impl datafusion::config::ExtensionOptions for TeraSortConfig {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn cloned(&self) -> Box<dyn datafusion::config::ExtensionOptions> {
        Box::new(self.clone())
    }

    fn set(&mut self, key: &str, value: &str) -> datafusion::error::Result<()> {
        let entries = Self::valid_entries();
        let prefix = <TeraSortConfig as datafusion::config::ConfigExtension>::PREFIX;
        let k = format!("{prefix}.{key}");

        match entries.get(&k) {
            Some(entry) => {
                if let Err(e) = Self::parse_value(value, entry.data_type.clone()) {
                    return config_err!("invalid value `{}` for `{}`: {}", value, k, e);
                }
                self.settings.insert(k, value.to_string());
                Ok(())
            }
            None => config_err!("configuration key `{}` does not exist", key),
        }
    }

    fn entries(&self) -> Vec<datafusion::config::ConfigEntry> {
        Self::valid_entries()
            .iter()
            .map(|(key, value)| datafusion::config::ConfigEntry {
                key: key.clone(),
                value: self
                    .settings
                    .get(key)
                    .cloned()
                    .or(value.default_value.clone()),
                description: &value.description,
            })
            .collect()
    }
}

impl datafusion::config::ConfigExtension for TeraSortConfig {
    const PREFIX: &'static str = "terasort";
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::config::ExtensionOptions;

    #[test]
    fn default_config() -> Result<()> {
        let config = TeraSortConfig::default();
        assert_eq!(1_000_000_000, config.input_size());
        assert_eq!(100_000, config.sample_size());
        assert!(config.verify());
        assert!(config.input_partitions() >= 1);
        Ok(())
    }

    #[test]
    fn derived_plan() -> Result<()> {
        let config = TeraSortConfig::default()
            .with_setting(TERASORT_INPUT_SIZE, "1000000")?
            .with_setting(TERASORT_INPUT_PARTITIONS, "3")?
            .with_setting(TERASORT_OUTPUT_PARTITIONS, "5")?;
        let plan = config.generation_plan()?;
        assert_eq!(
            plan,
            GenerationPlan {
                input_partitions: 3,
                records_per_partition: 3333,
                total_records: 9999,
                output_partitions: 5,
            }
        );
        Ok(())
    }

    #[test]
    fn invalid_settings() {
        let config = TeraSortConfig::default();
        assert!(config.clone().with_setting(TERASORT_INPUT_SIZE, "lots").is_err());
        assert!(config.clone().with_setting("terasort.unknown", "1").is_err());
        assert!(config.with_setting(TERASORT_VERIFY, "maybe").is_err());
    }

    #[test]
    fn plan_limits() {
        assert!(GenerationPlan::try_new(99, 1, 1).is_err());
        assert!(GenerationPlan::try_new(1000, 0, 1).is_err());
        assert!(GenerationPlan::try_new(1000, 1, 0).is_err());
        let too_big = MAX_RECORDS_PER_PARTITION * RECORD_LEN as u64;
        assert!(matches!(
            GenerationPlan::try_new(too_big, 1, 1),
            Err(TeraSortError::Configuration(_))
        ));
        assert!(GenerationPlan::try_new(too_big, 2, 1).is_ok());
    }

    #[test]
    fn extension_options() {
        let mut config = TeraSortConfig::default();
        ExtensionOptions::set(&mut config, "sample_size", "42").unwrap();
        assert_eq!(config.sample_size(), 42);
        assert!(ExtensionOptions::set(&mut config, "sample_size", "x").is_err());
        assert!(ExtensionOptions::set(&mut config, "nope", "1").is_err());
        assert_eq!(config.entries().len(), 5);
    }
}
