// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor handling.

use crate::{DType, Shape};

/// Errors raised when creating or copying tensors.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// A tensor does not match the specification it is bound to.
    #[error("tensor `{name}` expects {expected_dtype} {expected_shape}, got {dtype} {shape}")]
    SpecMismatch {
        name: String,
        expected_dtype: DType,
        expected_shape: Shape,
        dtype: DType,
        shape: Shape,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// A shape string could not be parsed.
    #[error("invalid shape `{0}`")]
    InvalidShape(String),
}
