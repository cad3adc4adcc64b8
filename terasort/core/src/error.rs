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

//! TeraSort error types

use std::{
    error::Error,
    fmt::{Display, Formatter},
    io, result,
};

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;

/// Result type alias for TeraSort operations.
pub type Result<T> = result::Result<T, TeraSortError>;

/// TeraSort error types.
///
/// The generator, encoder and 128-bit arithmetic never return errors; contract
/// violations there panic. These variants cover the orchestration boundary.
#[derive(Debug)]
pub enum TeraSortError {
    /// General error with a descriptive message.
    General(String),
    /// Internal error indicating a bug or unexpected state.
    Internal(String),
    /// Configuration error with invalid settings.
    Configuration(String),
    /// Sorted output failed validation.
    Validation(String),
    /// Error from Arrow operations.
    ArrowError(Box<ArrowError>),
    /// Error from DataFusion operations.
    DataFusionError(Box<DataFusionError>),
    /// I/O operation error.
    IoError(io::Error),
    /// Tokio task join error.
    TokioError(tokio::task::JoinError),
}

impl From<String> for TeraSortError {
    fn from(e: String) -> Self {
        TeraSortError::General(e)
    }
}

impl From<ArrowError> for TeraSortError {
    fn from(e: ArrowError) -> Self {
        match e {
            ArrowError::ExternalError(e)
                if e.downcast_ref::<TeraSortError>().is_some() =>
            {
                match e.downcast::<TeraSortError>() {
                    Ok(e) => *e,
                    Err(e) => TeraSortError::ArrowError(Box::new(
                        ArrowError::ExternalError(e),
                    )),
                }
            }
            other => TeraSortError::ArrowError(Box::new(other)),
        }
    }
}

impl From<DataFusionError> for TeraSortError {
    fn from(e: DataFusionError) -> Self {
        match e {
            DataFusionError::ArrowError(e, _) => Self::from(e),
            _ => TeraSortError::DataFusionError(Box::new(e)),
        }
    }
}

impl From<io::Error> for TeraSortError {
    fn from(e: io::Error) -> Self {
        TeraSortError::IoError(e)
    }
}

impl From<tokio::task::JoinError> for TeraSortError {
    fn from(e: tokio::task::JoinError) -> Self {
        TeraSortError::TokioError(e)
    }
}

impl From<TeraSortError> for DataFusionError {
    fn from(e: TeraSortError) -> Self {
        match e {
            TeraSortError::DataFusionError(e) => *e,
            TeraSortError::ArrowError(e) => DataFusionError::ArrowError(*e, None),
            other => DataFusionError::External(Box::new(other)),
        }
    }
}

impl Display for TeraSortError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TeraSortError::General(desc) => write!(f, "General error: {desc}"),
            TeraSortError::Internal(desc) => {
                write!(f, "Internal TeraSort error: {desc}")
            }
            TeraSortError::Configuration(desc) => {
                write!(f, "Configuration error: {desc}")
            }
            TeraSortError::Validation(desc) => {
                write!(f, "Validation failed: {desc}")
            }
            TeraSortError::ArrowError(desc) => write!(f, "Arrow error: {desc}"),
            TeraSortError::DataFusionError(desc) => {
                write!(f, "DataFusion error: {desc}")
            }
            TeraSortError::IoError(desc) => write!(f, "IO error: {desc}"),
            TeraSortError::TokioError(desc) => write!(f, "Tokio join error: {desc}"),
        }
    }
}

impl Error for TeraSortError {}
