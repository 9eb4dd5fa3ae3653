// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON-lines latency profile files.
//!
//! One record per observation:
//!
//! ```text
//! {"model":"mobilenet","subgraph":0,"device":"gpu","timestamp_us":1700000000000000,"latency_us":5120.0}
//! ```
//!
//! Records name the model rather than its engine-assigned id so a profile
//! written by one engine instance can warm-start another.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use model_ir::DeviceKind;

use crate::CostModelError;

/// One persisted latency observation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProfileRecord {
    pub model: String,
    pub subgraph: u32,
    pub device: DeviceKind,
    pub timestamp_us: u64,
    pub latency_us: f64,
}

/// Reads every record of a profile file. Blank lines are skipped.
pub fn load_records(path: &Path) -> Result<Vec<ProfileRecord>, CostModelError> {
    let file = File::open(path).map_err(|source| CostModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| CostModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| CostModelError::Parse {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Appends `records` to the profile file, creating it if needed.
pub fn append_records(path: &Path, records: &[ProfileRecord]) -> Result<(), CostModelError> {
    let io_err = |source| CostModelError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| CostModelError::Parse {
            path: path.to_path_buf(),
            line: 0,
            source,
        })?;
        writeln!(writer, "{line}").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}
