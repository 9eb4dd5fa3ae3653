// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Declared properties of model input, output and intermediate tensors.

use crate::{DType, Shape};

/// Quantization parameters attached to a tensor specification.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Quantization {
    /// Real-valued tensor; values are stored as-is.
    #[default]
    None,
    /// `real = scale * (stored - zero_point)`.
    Affine { scale: f32, zero_point: i32 },
}

impl Quantization {
    /// Converts a stored integer value into its real value.
    pub fn dequantize(&self, stored: i32) -> f32 {
        match *self {
            Quantization::None => stored as f32,
            Quantization::Affine { scale, zero_point } => scale * (stored - zero_point) as f32,
        }
    }
}

/// Name, element type, shape and quantization of one model tensor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    #[serde(default)]
    pub quantization: Quantization,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, dtype: DType, shape: impl Into<Shape>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: shape.into(),
            quantization: Quantization::None,
        }
    }

    /// Attaches affine quantization parameters.
    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    /// Number of bytes a tensor matching this spec occupies.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_size() {
        let spec = TensorSpec::new("input", DType::U8, vec![1, 8, 8, 3]);
        assert_eq!(spec.size_bytes(), 192);
        assert_eq!(spec.quantization, Quantization::None);
    }

    #[test]
    fn test_affine_dequantize() {
        let q = Quantization::Affine {
            scale: 0.5,
            zero_point: 128,
        };
        assert_eq!(q.dequantize(130), 1.0);
        assert_eq!(Quantization::None.dequantize(7), 7.0);
    }
}
