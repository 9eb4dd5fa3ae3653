// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the cost model.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CostModelError {
    /// The smoothing factor lies outside `(0, 1]`.
    #[error("smoothing factor must be in (0, 1], got {0}")]
    InvalidSmoothing(f64),

    /// A configuration value is out of range.
    #[error("invalid cost model configuration: {0}")]
    InvalidConfig(String),

    /// The profile file could not be read or written.
    #[error("profile I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A profile record could not be parsed.
    #[error("malformed profile record at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
