// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: a topologically ordered operator list over a tensor table.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelGraph<Loaded>     : operators declared, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated>  : tensor references resolved, ready for partitioning.
//! ```
//!
//! The partitioner and the engine only accept `ModelGraph<Validated>`.

use std::fmt;
use std::ops::Range;

use tensor_core::TensorSpec;

use crate::{DeviceKind, DeviceSet, ModelError, OpDef};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been declared but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for partitioning.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A model's operator graph together with its I/O bindings.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable model name; also the key for persisted profiles.
    pub name: String,
    /// Specification of every tensor, indexed by tensor id.
    pub tensors: Vec<TensorSpec>,
    /// Operators in topological order.
    pub ops: Vec<OpDef>,
    /// Tensor ids the caller provides, in binding order.
    pub inputs: Vec<usize>,
    /// Tensor ids returned to the caller, in binding order.
    pub outputs: Vec<usize>,
    /// Devices the model may run on at all, applied on top of per-op support.
    pub supported_devices: DeviceSet,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    pub fn new(
        name: impl Into<String>,
        tensors: Vec<TensorSpec>,
        ops: Vec<OpDef>,
        inputs: Vec<usize>,
        outputs: Vec<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            tensors,
            ops,
            inputs,
            outputs,
            supported_devices: DeviceSet::all(),
            _state: std::marker::PhantomData,
        }
    }

    /// Builds a linear chain with one operator per entry of `supports`.
    ///
    /// Every tensor shares `spec`'s type and shape; operator `i` reads tensor
    /// `i` and writes tensor `i + 1`.
    pub fn sequential(name: impl Into<String>, spec: TensorSpec, supports: &[DeviceSet]) -> Self {
        let tensors = (0..=supports.len())
            .map(|i| TensorSpec {
                name: format!("{}_{i}", spec.name),
                ..spec.clone()
            })
            .collect();
        let ops = supports
            .iter()
            .enumerate()
            .map(|(i, supported)| OpDef::new(i, "op", vec![i], vec![i + 1], *supported))
            .collect();
        Self::new(name, tensors, ops, vec![0], vec![supports.len()])
    }

    /// Restricts the devices the whole model may run on.
    pub fn with_supported_devices(mut self, devices: DeviceSet) -> Self {
        self.supported_devices = devices;
        self
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph has at least one operator, one input and one output.
    /// - Operator indices are consecutive starting from 0.
    /// - Every tensor id is in range.
    /// - Every tensor an operator consumes is a model input or produced by an
    ///   earlier operator.
    /// - Every model output is produced by some operator.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.ops.is_empty() {
            return Err(ModelError::InvalidGraph(format!(
                "model '{}' contains no operators",
                self.name
            )));
        }
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return Err(ModelError::InvalidGraph(format!(
                "model '{}' must declare at least one input and one output",
                self.name
            )));
        }

        let num_tensors = self.tensors.len();
        let out_of_range = self
            .inputs
            .iter()
            .chain(&self.outputs)
            .find(|&&t| t >= num_tensors);
        if let Some(t) = out_of_range {
            return Err(ModelError::InvalidGraph(format!(
                "model I/O references unknown tensor {t}"
            )));
        }

        let mut available = vec![false; num_tensors];
        for &t in &self.inputs {
            available[t] = true;
        }

        for (i, op) in self.ops.iter().enumerate() {
            if op.index != i {
                return Err(ModelError::InvalidOp {
                    op: op.name.clone(),
                    detail: format!("expected index {i}, got {}", op.index),
                });
            }
            for &t in op.inputs.iter().chain(&op.outputs) {
                if t >= num_tensors {
                    return Err(ModelError::InvalidOp {
                        op: op.name.clone(),
                        detail: format!("references unknown tensor {t}"),
                    });
                }
            }
            if let Some(&t) = op.inputs.iter().find(|&&t| !available[t]) {
                return Err(ModelError::InvalidOp {
                    op: op.name.clone(),
                    detail: format!("consumes tensor {t} before it is produced"),
                });
            }
            for &t in &op.outputs {
                available[t] = true;
            }
        }

        if let Some(&t) = self.outputs.iter().find(|&&t| !available[t]) {
            return Err(ModelError::InvalidGraph(format!(
                "model output tensor {t} is never produced"
            )));
        }

        if self.supported_devices.is_empty() {
            tracing::warn!("model '{}' declares no supported devices", self.name);
        }

        Ok(ModelGraph {
            name: self.name,
            tensors: self.tensors,
            ops: self.ops,
            inputs: self.inputs,
            outputs: self.outputs,
            supported_devices: self.supported_devices,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    pub fn op(&self, index: usize) -> Option<&OpDef> {
        self.ops.get(index)
    }

    pub fn iter_ops(&self) -> impl Iterator<Item = &OpDef> {
        self.ops.iter()
    }

    pub fn tensor(&self, id: usize) -> Option<&TensorSpec> {
        self.tensors.get(id)
    }

    /// Input specifications in binding order.
    pub fn input_specs(&self) -> impl Iterator<Item = &TensorSpec> {
        self.inputs.iter().map(move |&t| &self.tensors[t])
    }

    /// Output specifications in binding order.
    pub fn output_specs(&self) -> impl Iterator<Item = &TensorSpec> {
        self.outputs.iter().map(move |&t| &self.tensors[t])
    }

    /// Devices that may execute operator `index`, after applying the
    /// model-wide restriction.
    pub fn op_support(&self, index: usize) -> DeviceSet {
        self.ops
            .get(index)
            .map(|op| op.supported.intersection(self.supported_devices))
            .unwrap_or_default()
    }

    /// Devices able to run every operator of the model.
    pub fn full_support(&self) -> DeviceSet {
        (0..self.ops.len()).fold(self.supported_devices, |acc, i| acc.intersection(self.op_support(i)))
    }

    /// Number of operators `device` supports.
    pub fn supported_op_count(&self, device: DeviceKind) -> usize {
        (0..self.ops.len())
            .filter(|&i| self.op_support(i).contains(device))
            .count()
    }

    /// Tensors an op range reads that it does not produce itself.
    pub fn range_inputs(&self, ops: Range<usize>) -> Vec<usize> {
        let slice = &self.ops[ops];
        let mut produced = Vec::new();
        let mut needed = Vec::new();
        for op in slice {
            for &t in &op.inputs {
                if !produced.contains(&t) && !needed.contains(&t) {
                    needed.push(t);
                }
            }
            produced.extend(op.outputs.iter().copied());
        }
        needed
    }

    /// Tensors an op range produces.
    pub fn range_outputs(&self, ops: Range<usize>) -> Vec<usize> {
        let mut produced = Vec::new();
        for op in &self.ops[ops] {
            for &t in &op.outputs {
                if !produced.contains(&t) {
                    produced.push(t);
                }
            }
        }
        produced
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}': {} ops, {} tensors, {} inputs, {} outputs, devices {}",
            self.name,
            self.ops.len(),
            self.tensors.len(),
            self.inputs.len(),
            self.outputs.len(),
            self.supported_devices,
        )
    }
}

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} ops):", self.name, self.ops.len())?;
        for op in &self.ops {
            writeln!(f, "  {}", op.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::DType;

    fn spec() -> TensorSpec {
        TensorSpec::new("t", DType::F32, vec![1, 8])
    }

    fn chain(n: usize) -> ModelGraph<Loaded> {
        ModelGraph::sequential("chain", spec(), &vec![DeviceSet::all(); n])
    }

    #[test]
    fn test_validate_ok() {
        let graph = chain(4).validate().unwrap();
        assert_eq!(graph.num_ops(), 4);
        assert_eq!(graph.inputs, vec![0]);
        assert_eq!(graph.outputs, vec![4]);
        assert_eq!(graph.input_specs().next().unwrap().name, "t_0");
    }

    #[test]
    fn test_validate_empty() {
        let graph = ModelGraph::new("empty", vec![spec()], vec![], vec![0], vec![0]);
        assert!(matches!(graph.validate(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_validate_bad_index() {
        let mut graph = chain(3);
        graph.ops[1].index = 5;
        assert!(matches!(graph.validate(), Err(ModelError::InvalidOp { .. })));
    }

    #[test]
    fn test_validate_use_before_produce() {
        let mut graph = chain(3);
        graph.ops[0].inputs = vec![2];
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("before it is produced"));
    }

    #[test]
    fn test_validate_unknown_tensor() {
        let mut graph = chain(2);
        graph.ops[1].outputs = vec![99];
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_unproduced_output() {
        let tensors = vec![spec(), spec(), spec()];
        let ops = vec![OpDef::new(0, "relu", vec![0], vec![1], DeviceSet::all())];
        let graph = ModelGraph::new("m", tensors, ops, vec![0], vec![2]);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_support_respects_model_restriction() {
        let cpu_gpu: DeviceSet = [DeviceKind::Cpu, DeviceKind::Gpu].into_iter().collect();
        let graph = ModelGraph::sequential(
            "m",
            spec(),
            &[DeviceSet::all(), cpu_gpu, DeviceSet::all()],
        )
        .with_supported_devices([DeviceKind::Cpu, DeviceKind::Npu].into_iter().collect())
        .validate()
        .unwrap();
        assert_eq!(graph.op_support(0).len(), 2);
        assert_eq!(graph.op_support(1), DeviceSet::only(DeviceKind::Cpu));
        assert_eq!(graph.full_support(), DeviceSet::only(DeviceKind::Cpu));
        assert_eq!(graph.supported_op_count(DeviceKind::Npu), 2);
    }

    #[test]
    fn test_range_io() {
        let graph = chain(4).validate().unwrap();
        assert_eq!(graph.range_inputs(1..3), vec![1]);
        assert_eq!(graph.range_outputs(1..3), vec![2, 3]);
    }

    #[test]
    fn test_summary() {
        let graph = chain(2).validate().unwrap();
        let s = graph.summary();
        assert!(s.contains("chain"));
        assert!(s.contains("2 ops"));
    }
}
