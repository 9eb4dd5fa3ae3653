// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fallback-per-worker preparation.
//!
//! For every available device `D` that can run at least one unit, builds a
//! chain of subgraphs covering the whole graph:
//!
//! - maximal runs of units `D` supports become subgraphs pinned to `D`;
//! - the runs in between become *fallback* subgraphs on the devices their
//!   units have in common. A run whose units share no device is split so
//!   that each piece keeps a non-empty common set.
//!
//! Chains of different devices share identical fallback segments, which the
//! plan builder deduplicates.

use model_ir::{DeviceKind, DeviceSet, ModelGraph, Validated};

use crate::plan::PlanBuilder;
use crate::strategy::PartitionStrategy;
use crate::{PartitionError, PartitionPlan, SubgraphPreparationType, UnitSubgraph};

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPerWorker;

impl FallbackPerWorker {
    fn add_chain(builder: &mut PlanBuilder<'_>, units: &[UnitSubgraph], device: DeviceKind) {
        let mut start = 0;
        while start < units.len() {
            let on_device = units[start].devices.contains(device);
            let mut end = start + 1;
            if on_device {
                while end < units.len() && units[end].devices.contains(device) {
                    end += 1;
                }
                builder.add(start..end, DeviceSet::only(device));
            } else {
                let mut shared = units[start].devices;
                while end < units.len() && !units[end].devices.contains(device) {
                    let next = shared.intersection(units[end].devices);
                    if next.is_empty() {
                        break;
                    }
                    shared = next;
                    end += 1;
                }
                builder.add(start..end, shared);
            }
            start = end;
        }
    }
}

impl PartitionStrategy for FallbackPerWorker {
    fn name(&self) -> &str {
        SubgraphPreparationType::FallbackPerWorker.as_str()
    }

    fn partition(
        &self,
        graph: &ModelGraph<Validated>,
        units: &[UnitSubgraph],
        available: DeviceSet,
    ) -> Result<PartitionPlan, PartitionError> {
        let mut builder = PlanBuilder::new(units);
        let capable = units
            .iter()
            .fold(DeviceSet::empty(), |acc, u| acc.union(u.devices))
            .intersection(available);

        for device in capable.iter() {
            let before = builder.len();
            Self::add_chain(&mut builder, units, device);
            tracing::debug!(
                "model '{}': {device} chain added {} subgraphs",
                graph.name,
                builder.len() - before
            );
        }

        Ok(builder.build(&graph.name, SubgraphPreparationType::FallbackPerWorker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_units;
    use crate::strategy::test_support::{graph, sandwich, set};

    #[test]
    fn test_chain_per_device() {
        let g = sandwich();
        let units = compute_units(&g, 2, DeviceSet::all()).unwrap();
        let plan = FallbackPerWorker
            .partition(&g, &units, set(&[DeviceKind::Cpu, DeviceKind::Gpu]))
            .unwrap();

        // CPU chain: one whole-graph subgraph.
        let cpu_whole = plan
            .subgraphs
            .iter()
            .find(|s| s.units == (0..3) && s.devices == set(&[DeviceKind::Cpu]));
        assert!(cpu_whole.is_some());

        // GPU chain: gpu(0..1), cpu fallback(1..2), gpu(2..3).
        let gpu_segments: Vec<_> = plan
            .subgraphs
            .iter()
            .filter(|s| s.devices == set(&[DeviceKind::Gpu]))
            .map(|s| s.units.clone())
            .collect();
        assert_eq!(gpu_segments, vec![0..1, 2..3]);
        let fallback = plan.subgraphs.iter().find(|s| s.units == (1..2)).unwrap();
        assert_eq!(fallback.devices, set(&[DeviceKind::Cpu]));
        plan.validate().unwrap();
    }

    #[test]
    fn test_device_supporting_everything_gets_one_subgraph() {
        let g = graph(&vec![DeviceSet::all(); 4]);
        let units = compute_units(&g, 2, DeviceSet::all()).unwrap();
        let plan = FallbackPerWorker
            .partition(&g, &units, set(&[DeviceKind::Npu]))
            .unwrap();
        assert_eq!(plan.num_subgraphs(), 1);
        assert_eq!(plan.subgraphs[0].units, 0..units.len());
    }

    #[test]
    fn test_fallback_run_splits_when_units_share_nothing() {
        let cpu = set(&[DeviceKind::Cpu]);
        let dsp = set(&[DeviceKind::Dsp]);
        let gpu = set(&[DeviceKind::Gpu]);
        let g = graph(&[gpu, cpu, dsp, gpu]);
        let units = compute_units(&g, 1, DeviceSet::all()).unwrap();
        let plan = FallbackPerWorker.partition(&g, &units, DeviceSet::all()).unwrap();
        assert!(plan.subgraphs.iter().all(|s| !s.devices.is_empty()));
        plan.validate().unwrap();
    }
}
