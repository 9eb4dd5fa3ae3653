// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The device backend seam and an in-process simulated backend.
//!
//! The engine never executes operators itself. Each worker thread hands a
//! contiguous op range of a model to [`DeviceBackend::execute`] together
//! with the job's tensor slots; the backend reads the range's inputs and
//! writes its outputs back into the slots.

use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;

use model_ir::{DeviceKind, DeviceSet, ModelGraph, Validated};
use parking_lot::Mutex;
use resource_monitor::CpuSet;
use tensor_core::{DType, Tensor, TensorError};

/// Errors reported by a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The device went away. The worker stops pulling jobs until the
    /// device answers [`DeviceBackend::is_available`] again.
    #[error("device {0} is unavailable")]
    Unavailable(DeviceKind),

    #[error("{0}")]
    Execution(String),

    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

// ── Job tensors ────────────────────────────────────────────────

/// Per-job tensor storage, one slot per graph tensor id.
///
/// Tensors move with the job from stage to stage; only the stage currently
/// holding the job touches them.
#[derive(Debug)]
pub struct JobTensors {
    slots: Vec<Option<Tensor>>,
}

impl JobTensors {
    pub fn new(num_tensors: usize) -> Self {
        Self {
            slots: (0..num_tensors).map(|_| None).collect(),
        }
    }

    /// Every slot allocated from the graph's specs. Used for profiling runs.
    pub fn zeroed(graph: &ModelGraph<Validated>) -> Self {
        Self {
            slots: graph.tensors.iter().map(|spec| Some(Tensor::from_spec(spec))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: usize) -> Result<&Tensor, BackendError> {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| BackendError::Execution(format!("tensor {id} has not been produced")))
    }

    pub fn insert(&mut self, id: usize, tensor: Tensor) -> Result<(), BackendError> {
        let slot = self
            .slots
            .get_mut(id)
            .ok_or_else(|| BackendError::Execution(format!("tensor id {id} out of range")))?;
        *slot = Some(tensor);
        Ok(())
    }

    pub fn take(&mut self, id: usize) -> Option<Tensor> {
        self.slots.get_mut(id).and_then(Option::take)
    }
}

// ── Backend trait ──────────────────────────────────────────────

/// Executes operator ranges on physical devices.
///
/// Implementations are shared by every worker thread.
pub trait DeviceBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Runs ops `ops` of `graph` on `device`.
    fn execute(
        &self,
        device: DeviceKind,
        graph: &ModelGraph<Validated>,
        ops: Range<usize>,
        tensors: &mut JobTensors,
    ) -> Result<(), BackendError>;

    /// Probed periodically while a worker is marked unavailable.
    fn is_available(&self, _device: DeviceKind) -> bool {
        true
    }

    /// Called once on every worker thread before it starts pulling jobs.
    fn bind_thread(&self, _device: DeviceKind, _mask: &CpuSet) -> Result<(), BackendError> {
        Ok(())
    }
}

// ── Simulated backend ──────────────────────────────────────────

#[derive(Debug, Default)]
struct SimState {
    op_latency: HashMap<DeviceKind, Duration>,
    pending_failures: HashMap<DeviceKind, usize>,
    unavailable: DeviceSet,
    executions: HashMap<DeviceKind, u64>,
    bound_masks: Vec<(DeviceKind, CpuSet)>,
}

/// A backend that sleeps instead of computing.
///
/// Every op sleeps for its device's per-op latency. F32 outputs are the
/// op's first input plus one, so a chain of `n` ops adds `n` to every
/// element; other dtypes produce zeros. Failures and device outages can be
/// injected at runtime.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    state: Mutex<SimState>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-op latency of `device`.
    pub fn with_op_latency(self, device: DeviceKind, latency: Duration) -> Self {
        self.state.lock().op_latency.insert(device, latency);
        self
    }

    pub fn set_op_latency(&self, device: DeviceKind, latency: Duration) {
        self.state.lock().op_latency.insert(device, latency);
    }

    /// Makes the next `count` executions on `device` fail.
    pub fn fail_next(&self, device: DeviceKind, count: usize) {
        *self.state.lock().pending_failures.entry(device).or_default() += count;
    }

    pub fn set_available(&self, device: DeviceKind, available: bool) {
        let mut state = self.state.lock();
        if available {
            state.unavailable.remove(device);
        } else {
            state.unavailable.insert(device);
        }
    }

    /// Number of successful executions on `device`.
    pub fn executions(&self, device: DeviceKind) -> u64 {
        self.state.lock().executions.get(&device).copied().unwrap_or(0)
    }

    /// Masks passed to [`DeviceBackend::bind_thread`], in call order.
    pub fn bound_masks(&self) -> Vec<(DeviceKind, CpuSet)> {
        self.state.lock().bound_masks.clone()
    }

    fn run_op(graph: &ModelGraph<Validated>, index: usize, tensors: &mut JobTensors) -> Result<(), BackendError> {
        let op = graph
            .op(index)
            .ok_or_else(|| BackendError::Execution(format!("op {index} out of range")))?;
        let source = match op.inputs.first() {
            Some(&id) => Some(tensors.get(id)?.clone()),
            None => None,
        };
        for &out in &op.outputs {
            let spec = graph
                .tensor(out)
                .ok_or_else(|| BackendError::Execution(format!("tensor id {out} out of range")))?;
            let mut tensor = Tensor::from_spec(spec);
            if let Some(src) = &source {
                if src.dtype() == DType::F32
                    && spec.dtype == DType::F32
                    && src.shape().num_elements() == spec.shape.num_elements()
                {
                    let values: Vec<f32> = src.to_f32_vec()?.into_iter().map(|v| v + 1.0).collect();
                    tensor.write_f32(&values)?;
                }
            }
            tensors.insert(out, tensor)?;
        }
        Ok(())
    }
}

impl DeviceBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn execute(
        &self,
        device: DeviceKind,
        graph: &ModelGraph<Validated>,
        ops: Range<usize>,
        tensors: &mut JobTensors,
    ) -> Result<(), BackendError> {
        let per_op = {
            let mut state = self.state.lock();
            if state.unavailable.contains(device) {
                return Err(BackendError::Unavailable(device));
            }
            if let Some(n) = state.pending_failures.get_mut(&device).filter(|n| **n > 0) {
                *n -= 1;
                return Err(BackendError::Execution(format!(
                    "injected failure on {device}"
                )));
            }
            state.op_latency.get(&device).copied().unwrap_or_default()
        };

        let num_ops = u32::try_from(ops.len()).unwrap_or(u32::MAX);
        if !per_op.is_zero() {
            std::thread::sleep(per_op.saturating_mul(num_ops));
        }
        for index in ops {
            Self::run_op(graph, index, tensors)?;
        }

        *self.state.lock().executions.entry(device).or_default() += 1;
        Ok(())
    }

    fn is_available(&self, device: DeviceKind) -> bool {
        !self.state.lock().unavailable.contains(device)
    }

    fn bind_thread(&self, device: DeviceKind, mask: &CpuSet) -> Result<(), BackendError> {
        tracing::debug!("binding {device} thread to cpus {mask}");
        self.state.lock().bound_masks.push((device, mask.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, TensorSpec};

    fn chain(len: usize) -> ModelGraph<Validated> {
        let spec = TensorSpec::new("x", DType::F32, vec![4]);
        ModelGraph::sequential("chain", spec, &vec![DeviceSet::all(); len])
            .validate()
            .unwrap()
    }

    fn job_tensors(graph: &ModelGraph<Validated>, values: &[f32]) -> JobTensors {
        let mut tensors = JobTensors::new(graph.tensors.len());
        tensors
            .insert(graph.inputs[0], Tensor::from_f32(Shape::vector(4), values).unwrap())
            .unwrap();
        tensors
    }

    #[test]
    fn test_chain_adds_one_per_op() {
        let graph = chain(3);
        let backend = SimulatedBackend::new();
        let mut tensors = job_tensors(&graph, &[1.0, 2.0, 3.0, 4.0]);
        backend.execute(DeviceKind::Cpu, &graph, 0..3, &mut tensors).unwrap();
        let out = tensors.get(graph.outputs[0]).unwrap().to_f32_vec().unwrap();
        assert_eq!(out, vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(backend.executions(DeviceKind::Cpu), 1);
    }

    #[test]
    fn test_split_ranges_match_whole_run() {
        let graph = chain(4);
        let backend = SimulatedBackend::new();
        let mut tensors = job_tensors(&graph, &[0.0; 4]);
        backend.execute(DeviceKind::Cpu, &graph, 0..1, &mut tensors).unwrap();
        backend.execute(DeviceKind::Gpu, &graph, 1..4, &mut tensors).unwrap();
        let out = tensors.get(graph.outputs[0]).unwrap().to_f32_vec().unwrap();
        assert_eq!(out, vec![4.0; 4]);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let graph = chain(2);
        let backend = SimulatedBackend::new();
        let mut tensors = JobTensors::new(graph.tensors.len());
        let err = backend.execute(DeviceKind::Cpu, &graph, 1..2, &mut tensors);
        assert!(matches!(err, Err(BackendError::Execution(_))));
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let graph = chain(1);
        let backend = SimulatedBackend::new();
        backend.fail_next(DeviceKind::Gpu, 1);
        let mut tensors = job_tensors(&graph, &[0.0; 4]);
        assert!(backend.execute(DeviceKind::Gpu, &graph, 0..1, &mut tensors).is_err());
        assert!(backend.execute(DeviceKind::Gpu, &graph, 0..1, &mut tensors).is_ok());
    }

    #[test]
    fn test_unavailable_device() {
        let graph = chain(1);
        let backend = SimulatedBackend::new();
        backend.set_available(DeviceKind::Npu, false);
        assert!(!backend.is_available(DeviceKind::Npu));
        let mut tensors = job_tensors(&graph, &[0.0; 4]);
        let err = backend.execute(DeviceKind::Npu, &graph, 0..1, &mut tensors);
        assert!(matches!(err, Err(BackendError::Unavailable(DeviceKind::Npu))));
        backend.set_available(DeviceKind::Npu, true);
        assert!(backend.is_available(DeviceKind::Npu));
    }
}
