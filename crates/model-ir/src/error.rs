// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model graph construction.

/// Errors that can occur when building or validating a model graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An operator definition is invalid (e.g., references an unknown tensor).
    #[error("invalid operator '{op}': {detail}")]
    InvalidOp { op: String, detail: String },

    /// The model graph is malformed as a whole.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    /// A device name could not be parsed.
    #[error("unknown device kind `{0}`")]
    UnknownDevice(String),
}
