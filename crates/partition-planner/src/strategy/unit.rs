// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Unit-subgraph preparation: every unit is scheduled separately.

use model_ir::{DeviceSet, ModelGraph, Validated};

use crate::plan::PlanBuilder;
use crate::strategy::PartitionStrategy;
use crate::{PartitionError, PartitionPlan, SubgraphPreparationType, UnitSubgraph};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitsOnly;

impl PartitionStrategy for UnitsOnly {
    fn name(&self) -> &str {
        SubgraphPreparationType::UnitSubgraph.as_str()
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
        Ok(builder.build(&graph.name, SubgraphPreparationType::UnitSubgraph))
    }
}
