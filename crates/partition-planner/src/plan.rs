// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partition plan: the output of the subgraph partitioner.
//!
//! A plan holds the model's unit subgraphs and the schedulable subgraphs
//! built from them. Every schedulable subgraph spans a contiguous range of
//! units, so a job's progress is a single "next unit" cursor and the
//! candidates for its next stage are the subgraphs starting at that unit.

use std::ops::Range;

use model_ir::{DeviceKind, DeviceSet, SubgraphId};

use crate::{PartitionError, SubgraphPreparationType, UnitSubgraph};

/// A schedulable slice of the model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Subgraph {
    pub id: SubgraphId,
    /// Operators covered, half-open.
    pub ops: Range<usize>,
    /// Units covered, half-open.
    pub units: Range<usize>,
    /// Devices allowed to execute this subgraph.
    pub devices: DeviceSet,
}

impl Subgraph {
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn supports(&self, device: DeviceKind) -> bool {
        self.devices.contains(device)
    }
}

/// The complete partition of one model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PartitionPlan {
    pub model_name: String,
    pub preparation: SubgraphPreparationType,
    pub units: Vec<UnitSubgraph>,
    pub subgraphs: Vec<Subgraph>,
    /// `by_start[u]` lists subgraph ids whose unit range starts at `u`.
    #[serde(skip)]
    by_start: Vec<Vec<SubgraphId>>,
}

impl PartitionPlan {
    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn num_subgraphs(&self) -> usize {
        self.subgraphs.len()
    }

    pub fn subgraph(&self, id: SubgraphId) -> Option<&Subgraph> {
        self.subgraphs.get(id.0 as usize)
    }

    /// Subgraphs a job whose next pending unit is `unit` may run next.
    pub fn candidates(&self, unit: usize) -> impl Iterator<Item = &Subgraph> + '_ {
        self.by_start
            .get(unit)
            .into_iter()
            .flatten()
            .map(move |id| &self.subgraphs[id.0 as usize])
    }

    /// Union of the devices any subgraph may run on.
    pub fn devices(&self) -> DeviceSet {
        self.subgraphs
            .iter()
            .fold(DeviceSet::empty(), |acc, s| acc.union(s.devices))
    }

    /// Validates the plan.
    ///
    /// Checks:
    /// - Units are non-empty and tile the operator range without gaps.
    /// - Subgraph ids match their positions.
    /// - Every subgraph has a non-empty device set and a non-empty unit range
    ///   whose operators match the units it claims.
    /// - The last unit is reachable from unit 0 through a chain of subgraphs.
    pub fn validate(&self) -> Result<(), PartitionError> {
        let fail = |detail: String| PartitionError::Inconsistent {
            strategy: self.preparation.as_str().to_string(),
            detail,
        };

        if self.units.is_empty() || self.subgraphs.is_empty() {
            return Err(PartitionError::EmptyModel);
        }

        let mut expected_op = 0;
        for (i, unit) in self.units.iter().enumerate() {
            if unit.index != i || unit.ops.start != expected_op || unit.ops.is_empty() {
                return Err(fail(format!("unit {i} covers {:?}", unit.ops)));
            }
            if unit.devices.is_empty() {
                return Err(fail(format!("unit {i} has no device")));
            }
            expected_op = unit.ops.end;
        }

        for (i, sg) in self.subgraphs.iter().enumerate() {
            if sg.id.0 as usize != i {
                return Err(fail(format!("expected subgraph id {i}, got {}", sg.id.0)));
            }
            if sg.devices.is_empty() {
                return Err(fail(format!("subgraph {i} has an empty device set")));
            }
            if sg.units.is_empty() || sg.units.end > self.units.len() {
                return Err(fail(format!("subgraph {i} covers units {:?}", sg.units)));
            }
            let ops = self.units[sg.units.start].ops.start..self.units[sg.units.end - 1].ops.end;
            if ops != sg.ops {
                return Err(fail(format!(
                    "subgraph {i} claims ops {:?} but its units cover {ops:?}",
                    sg.ops
                )));
            }
        }

        let mut reachable = vec![false; self.units.len() + 1];
        reachable[0] = true;
        for unit in 0..self.units.len() {
            if !reachable[unit] {
                continue;
            }
            for sg in self.candidates(unit) {
                reachable[sg.units.end] = true;
            }
        }
        if !reachable[self.units.len()] {
            return Err(fail("no subgraph chain covers the whole model".into()));
        }

        Ok(())
    }

    /// Renders a per-unit availability table (`O` supported, `X` not).
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Model '{}' [{}]: {} units, {} subgraphs\n",
            self.model_name,
            self.preparation,
            self.units.len(),
            self.subgraphs.len(),
        );
        out.push_str("  unit  ops        ");
        for device in DeviceKind::ALL {
            out.push_str(&format!(" {:>3}", device.as_str()));
        }
        out.push('\n');
        for unit in &self.units {
            out.push_str(&format!(
                "  {:>4}  {:<10}",
                unit.index,
                format!("{}..{}", unit.ops.start, unit.ops.end)
            ));
            for device in DeviceKind::ALL {
                let mark = if unit.devices.contains(device) { "O" } else { "X" };
                out.push_str(&format!(" {mark:>3}"));
            }
            out.push('\n');
        }
        let merged: Vec<String> = self
            .subgraphs
            .iter()
            .filter(|s| s.num_units() > 1)
            .map(|s| format!("{}({}..{}){}", s.id, s.units.start, s.units.end, s.devices))
            .collect();
        if !merged.is_empty() {
            out.push_str(&format!("  multi-unit: {}\n", merged.join(" ")));
        }
        out
    }
}

/// Builder helper for constructing a [`PartitionPlan`] incrementally.
///
/// Used by strategy implementations. Adding a subgraph that duplicates an
/// existing (unit range, device set) pair is a no-op.
pub(crate) struct PlanBuilder<'a> {
    units: &'a [UnitSubgraph],
    subgraphs: Vec<Subgraph>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(units: &'a [UnitSubgraph]) -> Self {
        Self {
            units,
            subgraphs: Vec::new(),
        }
    }

    /// Adds a subgraph spanning `units`, returning its id.
    pub fn add(&mut self, units: Range<usize>, devices: DeviceSet) -> SubgraphId {
        if let Some(existing) = self
            .subgraphs
            .iter()
            .find(|s| s.units == units && s.devices == devices)
        {
            return existing.id;
        }
        let id = SubgraphId(self.subgraphs.len() as u32);
        let ops = self.units[units.start].ops.start..self.units[units.end - 1].ops.end;
        self.subgraphs.push(Subgraph {
            id,
            ops,
            units,
            devices,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.subgraphs.len()
    }

    /// Intersection of the device sets of `units`.
    pub fn shared_devices(&self, units: Range<usize>) -> DeviceSet {
        self.units[units]
            .iter()
            .fold(DeviceSet::all(), |acc, u| acc.intersection(u.devices))
    }

    pub fn build(self, model_name: &str, preparation: SubgraphPreparationType) -> PartitionPlan {
        let mut by_start = vec![Vec::new(); self.units.len()];
        for sg in &self.subgraphs {
            by_start[sg.units.start].push(sg.id);
        }
        PartitionPlan {
            model_name: model_name.to_string(),
            preparation,
            units: self.units.to_vec(),
            subgraphs: self.subgraphs,
            by_start,
        }
    }
}
