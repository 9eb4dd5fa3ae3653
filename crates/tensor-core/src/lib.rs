// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Owned tensor buffers and the specifications that describe them.
//!
//! This crate provides:
//! - [`Tensor`]: a typed, shaped, exclusively owned byte buffer.
//! - [`TensorSpec`]: the declared name, type, shape and quantization of a model tensor.
//! - [`Shape`] and [`DType`] descriptors.
//! - [`Quantization`] parameters for integer tensors.
//!
//! Tensors never alias. A tensor handed to the engine moves with the job that
//! consumes it and is handed back (or dropped) when the job terminates.

mod dtype;
mod error;
mod shape;
mod spec;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use shape::Shape;
pub use spec::{Quantization, TensorSpec};
pub use tensor::Tensor;
