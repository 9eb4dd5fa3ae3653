// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! No-fallback preparation: the whole graph as one subgraph.
//!
//! Only devices able to execute every operator qualify. Jobs of such a model
//! either run end-to-end on one device or cannot be assigned at all.

use model_ir::{DeviceSet, ModelGraph, Validated};

use crate::plan::PlanBuilder;
use crate::strategy::PartitionStrategy;
use crate::{PartitionError, PartitionPlan, SubgraphPreparationType, UnitSubgraph};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl PartitionStrategy for NoFallback {
    fn name(&self) -> &str {
        SubgraphPreparationType::NoFallback.as_str()
    }

    fn partition(
        &self,
        graph: &ModelGraph<Validated>,
        units: &[UnitSubgraph],
        _available: DeviceSet,
    ) -> Result<PartitionPlan, PartitionError> {
        let mut builder = PlanBuilder::new(units);
        let devices = builder.shared_devices(0..units.len());
        if devices.is_empty() {
            return Err(PartitionError::NoFullGraphDevice {
                model: graph.name.clone(),
            });
        }
        builder.add(0..units.len(), devices);
        Ok(builder.build(&graph.name, SubgraphPreparationType::NoFallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_units;
    use crate::strategy::test_support::{graph, sandwich, set};
    use model_ir::DeviceKind;

    #[test]
    fn test_single_subgraph_on_common_devices() {
        let g = sandwich();
        let units = compute_units(&g, 2, DeviceSet::all()).unwrap();
        let plan = NoFallback.partition(&g, &units, DeviceSet::all()).unwrap();
        assert_eq!(plan.num_subgraphs(), 1);
        assert_eq!(plan.subgraphs[0].ops, 0..6);
        assert_eq!(plan.subgraphs[0].devices, set(&[DeviceKind::Cpu]));
        plan.validate().unwrap();
    }

    #[test]
    fn test_fails_without_full_graph_device() {
        let g = graph(&[set(&[DeviceKind::Gpu]), set(&[DeviceKind::Cpu])]);
        let units = compute_units(&g, 1, DeviceSet::all()).unwrap();
        let err = NoFallback.partition(&g, &units, DeviceSet::all()).unwrap_err();
        assert!(matches!(err, PartitionError::NoFullGraphDevice { .. }));
    }
}
