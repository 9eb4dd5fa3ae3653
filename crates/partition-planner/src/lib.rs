// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # partition-planner
//!
//! Splits a validated `ModelGraph` into *unit subgraphs* (contiguous operator
//! ranges with a uniform device-support set) and, depending on the
//! preparation type, into the schedulable subgraphs the planner assigns to
//! workers.
//!
//! # Preparation types
//!
//! | Type | Schedulable subgraphs |
//! |---|---|
//! | [`NoFallback`] | the whole graph, on devices that run every op |
//! | [`FallbackPerWorker`] | per device, a whole-graph chain with fallback segments |
//! | [`UnitsOnly`] | each unit on its own |
//! | [`MergeUnits`] | units plus every contiguous merge sharing a device |
//!
//! # Example
//! ```
//! use model_ir::{DeviceKind, DeviceSet, ModelGraph};
//! use partition_planner::{partition, PartitionConfig, SubgraphPreparationType};
//! use tensor_core::{DType, TensorSpec};
//!
//! let cpu = DeviceSet::only(DeviceKind::Cpu);
//! let graph = ModelGraph::sequential(
//!     "demo",
//!     TensorSpec::new("x", DType::F32, vec![4]),
//!     &[DeviceSet::all(), cpu, DeviceSet::all()],
//! )
//! .validate()
//! .unwrap();
//! let config = PartitionConfig::new(SubgraphPreparationType::UnitSubgraph, 1);
//! let plan = partition(&graph, &config, DeviceSet::all()).unwrap();
//! assert_eq!(plan.num_units(), 3);
//! println!("{}", plan.summary());
//! ```

mod error;
pub(crate) mod plan;
mod preparation;
pub mod strategy;
mod units;

pub use error::PartitionError;
pub use plan::{PartitionPlan, Subgraph};
pub use preparation::{PartitionConfig, SubgraphPreparationType};
pub use strategy::{FallbackPerWorker, MergeUnits, NoFallback, PartitionStrategy, UnitsOnly};
pub use units::{compute_units, support_table, UnitSubgraph};

use model_ir::{DeviceSet, ModelGraph, Validated};

/// Partitions `graph` for the devices in `available`.
///
/// Computes the unit subgraphs, runs the strategy for the configured
/// preparation type and validates the result.
pub fn partition(
    graph: &ModelGraph<Validated>,
    config: &PartitionConfig,
    available: DeviceSet,
) -> Result<PartitionPlan, PartitionError> {
    config.validate()?;
    let units = compute_units(graph, config.minimum_subgraph_size, available)?;
    let strategy = config.preparation_type.create_strategy();
    let plan = strategy.partition(graph, &units, available)?;
    plan.validate()?;

    tracing::info!(
        "partitioned '{}' with {}: {} units, {} subgraphs",
        graph.name,
        strategy.name(),
        plan.num_units(),
        plan.num_subgraphs(),
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::DeviceKind;
    use tensor_core::{DType, TensorSpec};

    fn mixed_graph(seed: usize) -> ModelGraph<Validated> {
        let patterns: [DeviceSet; 5] = [
            DeviceSet::only(DeviceKind::Cpu),
            [DeviceKind::Cpu, DeviceKind::Gpu].into_iter().collect(),
            [DeviceKind::Gpu, DeviceKind::Npu].into_iter().collect(),
            DeviceSet::all(),
            [DeviceKind::Cpu, DeviceKind::Dsp].into_iter().collect(),
        ];
        let supports: Vec<DeviceSet> = (0..10)
            .map(|i| patterns[(seed + i * (seed % 3 + 1)) % patterns.len()])
            .collect();
        ModelGraph::sequential("mixed", TensorSpec::new("x", DType::F32, vec![8]), &supports)
            .validate()
            .unwrap()
    }

    #[test]
    fn test_no_empty_device_sets_for_any_preparation() {
        for seed in 0..25 {
            let graph = mixed_graph(seed);
            for prep in SubgraphPreparationType::ALL {
                for min in [1, 2, 3, 7] {
                    let config = PartitionConfig::new(prep, min);
                    match partition(&graph, &config, DeviceSet::all()) {
                        Ok(plan) => {
                            assert!(plan.subgraphs.iter().all(|s| !s.devices.is_empty()));
                            assert!(plan.units.iter().all(|u| !u.devices.is_empty()));
                        }
                        Err(PartitionError::NoFullGraphDevice { .. }) => {
                            assert_eq!(prep, SubgraphPreparationType::NoFallback);
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_partition_respects_available_devices() {
        let graph = mixed_graph(4);
        let cpu_gpu: DeviceSet = [DeviceKind::Cpu, DeviceKind::Gpu, DeviceKind::Npu]
            .into_iter()
            .collect();
        let config = PartitionConfig::new(SubgraphPreparationType::MergeUnitSubgraph, 2);
        let plan = partition(&graph, &config, cpu_gpu).unwrap();
        assert!(!plan.devices().contains(DeviceKind::Dsp));
    }

    #[test]
    fn test_partition_rejects_zero_minimum_size() {
        let graph = mixed_graph(0);
        let config = PartitionConfig::new(SubgraphPreparationType::UnitSubgraph, 0);
        assert!(matches!(
            partition(&graph, &config, DeviceSet::all()),
            Err(PartitionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partition_fails_when_no_worker_device_fits() {
        let graph = ModelGraph::sequential(
            "gpu-only",
            TensorSpec::new("x", DType::F32, vec![8]),
            &[DeviceSet::only(DeviceKind::Gpu)],
        )
        .validate()
        .unwrap();
        let config = PartitionConfig::default();
        let err = partition(&graph, &config, DeviceSet::only(DeviceKind::Cpu)).unwrap_err();
        assert!(matches!(err, PartitionError::NoSupportingDevice { .. }));
    }
}
