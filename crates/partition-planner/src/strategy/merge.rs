// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Merge-unit preparation.
//!
//! Starts from the unit subgraphs and adds one merged subgraph for every
//! contiguous run of two or more units that share at least one device. A
//! merged subgraph runs on the intersection of its units' device sets, so a
//! job can cover several units in a single invocation without crossing a
//! device boundary.
//!
//! Runs are enumerated by start unit, growing the end until the shared set
//! becomes empty; a longer run can never regain a device a shorter one lost.

use model_ir::{DeviceSet, ModelGraph, Validated};

use crate::plan::PlanBuilder;
use crate::strategy::PartitionStrategy;
use crate::{PartitionError, PartitionPlan, SubgraphPreparationType, UnitSubgraph};

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeUnits;

impl PartitionStrategy for MergeUnits {
    fn name(&self) -> &str {
        SubgraphPreparationType::MergeUnitSubgraph.as_str()
    }

    fn partition(
        &self,
        graph: &ModelGraph<Validated>,
        units: &[UnitSubgraph],
        _available: DeviceSet,
    ) -> Result<PartitionPlan, PartitionError> {
        let mut builder = PlanBuilder::new(units);
        for unit in units {
            builder.add(unit.index..unit.index + 1, unit.devices);
        }

        let unit_count = builder.len();
        for start in 0..units.len() {
            let mut shared = units[start].devices;
            for end in start + 1..units.len() {
                shared = shared.intersection(units[end].devices);
                if shared.is_empty() {
                    break;
                }
                builder.add(start..end + 1, shared);
            }
        }
        tracing::debug!(
            "model '{}': {} merged subgraphs over {} units",
            graph.name,
            builder.len() - unit_count,
            units.len()
        );

        Ok(builder.build(&graph.name, SubgraphPreparationType::MergeUnitSubgraph))
    }
}
