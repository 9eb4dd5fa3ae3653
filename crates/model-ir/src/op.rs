// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator definitions.
//!
//! An [`OpDef`] only describes *where* an operator may run and which tensors
//! it touches. Kernels are provided by the device backend.

use crate::DeviceSet;

/// A single operator in the model graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpDef {
    /// Position in the topological order (0-based).
    pub index: usize,
    pub name: String,
    /// Backend-defined operator type, e.g. `"conv_2d"`.
    pub op_type: String,
    /// Tensor ids consumed by this operator.
    pub inputs: Vec<usize>,
    /// Tensor ids produced by this operator.
    pub outputs: Vec<usize>,
    /// Device kinds whose backend implements this operator.
    pub supported: DeviceSet,
}

impl OpDef {
    pub fn new(
        index: usize,
        op_type: impl Into<String>,
        inputs: Vec<usize>,
        outputs: Vec<usize>,
        supported: DeviceSet,
    ) -> Self {
        let op_type = op_type.into();
        Self {
            index,
            name: format!("{op_type}_{index}"),
            op_type,
            inputs,
            outputs,
            supported,
        }
    }

    /// One-line description used in graph dumps.
    pub fn summary(&self) -> String {
        format!(
            "[{:>3}] {:<20} {:?} -> {:?} on {}",
            self.index, self.name, self.inputs, self.outputs, self.supported
        )
    }
}
