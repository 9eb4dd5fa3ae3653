// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors.

use std::fmt;
use std::str::FromStr;

use crate::{DType, TensorError};

/// Row-major dimensions of a [`crate::Tensor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![1, 224, 224, 3]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), 150_528);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Rank-0 shape holding a single element.
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total element count; 1 for a scalar.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Memory footprint in bytes for elements of `dtype`.
    pub fn size_bytes(&self, dtype: DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dims.is_empty() {
            return f.write_str("scalar");
        }
        let parts: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        f.write_str(&parts.join("x"))
    }
}

/// Parses the `1x224x224x3` notation used in configuration files and the CLI.
impl FromStr for Shape {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "scalar" {
            return Ok(Shape::scalar());
        }
        let dims = s
            .split('x')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| TensorError::InvalidShape(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Shape::new(dims))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.to_string(), "scalar");
    }

    #[test]
    fn test_size_bytes() {
        let s = Shape::new(vec![10, 20]);
        assert_eq!(s.size_bytes(DType::F32), 800);
        assert_eq!(s.size_bytes(DType::U8), 200);
    }

    #[test]
    fn test_parse_and_display() {
        let s: Shape = "1x224x224x3".parse().unwrap();
        assert_eq!(s.dims(), &[1, 224, 224, 3]);
        assert_eq!(s.to_string(), "1x224x224x3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("4xbad".parse::<Shape>().is_err());
    }

    #[test]
    fn test_from_conversions() {
        let s1: Shape = vec![2, 3].into();
        let s2: Shape = (&[2, 3][..]).into();
        assert_eq!(s1, s2);
    }
}
