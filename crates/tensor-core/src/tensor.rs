// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned tensor buffers.

use crate::{DType, Quantization, Shape, TensorError, TensorSpec};

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the data carrier between the caller and the engine. It owns its
/// byte buffer exclusively; moving a tensor into a request transfers it to the
/// engine for the lifetime of the job.
///
/// # Memory Layout
/// Data is stored in row-major (C) order as a flat little-endian byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    quantization: Quantization,
    data: Vec<u8>,
}

impl Tensor {
    /// Creates a zero-filled tensor.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::new(vec![2, 3]), DType::F32);
    /// assert_eq!(t.size_bytes(), 24);
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            quantization: Quantization::None,
            data: vec![0u8; size],
        }
    }

    /// Allocates a zero-filled tensor matching `spec`.
    pub fn from_spec(spec: &TensorSpec) -> Self {
        let mut tensor = Self::zeros(spec.shape.clone(), spec.dtype);
        tensor.quantization = spec.quantization;
        tensor
    }

    /// Creates a tensor from raw bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape,
            dtype,
            quantization: Quantization::None,
            data,
        })
    }

    /// Creates an `f32` tensor from values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(shape, DType::F32, data)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn quantization(&self) -> Quantization {
        self.quantization
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Decodes the buffer as `f32` values.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        if self.dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "to_f32_vec",
                dtype: self.dtype,
            });
        }
        Ok(self
            .data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Overwrites the buffer with `values`; the element count must match.
    pub fn write_f32(&mut self, values: &[f32]) -> Result<(), TensorError> {
        if self.dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "write_f32",
                dtype: self.dtype,
            });
        }
        if values.len() != self.shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: self.data.len(),
                actual: values.len() * 4,
            });
        }
        for (dst, v) in self.data.chunks_exact_mut(4).zip(values) {
            dst.copy_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    /// Checks that this tensor can be bound to `spec`.
    pub fn matches(&self, spec: &TensorSpec) -> Result<(), TensorError> {
        if self.dtype != spec.dtype || self.shape != spec.shape {
            return Err(TensorError::SpecMismatch {
                name: spec.name.clone(),
                expected_dtype: spec.dtype,
                expected_shape: spec.shape.clone(),
                dtype: self.dtype,
                shape: self.shape.clone(),
            });
        }
        Ok(())
    }

    /// Copies `other`'s contents into this tensor in place.
    ///
    /// Both tensors must agree on dtype and shape.
    pub fn copy_from(&mut self, other: &Tensor) -> Result<(), TensorError> {
        if self.dtype != other.dtype || self.shape != other.shape {
            return Err(TensorError::SpecMismatch {
                name: "copy destination".to_string(),
                expected_dtype: self.dtype,
                expected_shape: self.shape.clone(),
                dtype: other.dtype,
                shape: other.shape.clone(),
            });
        }
        self.data.copy_from_slice(&other.data);
        self.quantization = other.quantization;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(Shape::new(vec![2, 3]), DType::F32);
        assert_eq!(t.size_bytes(), 24);
        assert!(t.to_f32_vec().unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_spec_keeps_quantization() {
        let spec = TensorSpec::new("q", DType::U8, vec![4]).with_quantization(Quantization::Affine {
            scale: 0.1,
            zero_point: 3,
        });
        let t = Tensor::from_spec(&spec);
        assert_eq!(t.size_bytes(), 4);
        assert!(t.matches(&spec).is_ok());
        assert_eq!(t.quantization(), spec.quantization);
    }

    #[test]
    fn test_from_bytes_size_mismatch() {
        let result = Tensor::from_bytes(Shape::new(vec![2, 3]), DType::F32, vec![0u8; 10]);
        assert!(matches!(
            result,
            Err(TensorError::BufferSizeMismatch {
                expected: 24,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_write_and_read_f32() {
        let mut t = Tensor::zeros(Shape::vector(3), DType::F32);
        t.write_f32(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(t.to_f32_vec().unwrap(), vec![10.0, 20.0, 30.0]);
        assert!(t.write_f32(&[1.0]).is_err());
    }

    #[test]
    fn test_to_f32_rejects_integer_tensor() {
        let t = Tensor::zeros(Shape::vector(4), DType::I8);
        assert!(t.to_f32_vec().is_err());
    }

    #[test]
    fn test_copy_from_checks_shape() {
        let src = Tensor::from_f32(Shape::vector(2), &[1.5, 2.5]).unwrap();
        let mut dst = Tensor::zeros(Shape::vector(2), DType::F32);
        dst.copy_from(&src).unwrap();
        assert_eq!(dst, src);

        let mut wrong = Tensor::zeros(Shape::vector(3), DType::F32);
        assert!(wrong.copy_from(&src).is_err());
    }

    #[test]
    fn test_matches_reports_spec_name() {
        let spec = TensorSpec::new("image", DType::F32, vec![1, 4]);
        let t = Tensor::zeros(Shape::vector(4), DType::F32);
        let err = t.matches(&spec).unwrap_err();
        assert!(err.to_string().contains("image"));
    }
}
