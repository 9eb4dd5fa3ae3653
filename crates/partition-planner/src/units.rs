// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Unit subgraph construction.
//!
//! Units are the atoms every preparation mode builds on. They are computed
//! in three passes over the topologically ordered operators:
//!
//! 1. **Support table.** Each operator's device set is its declared support,
//!    restricted to the model's devices and to devices that have a worker.
//!    A non-CPU device supporting fewer than `minimum_size` operators of the
//!    model is dropped, as long as every operator keeps some other device.
//! 2. **Greedy grouping.** Consecutive operators join the current unit while
//!    they share its device set and the unit is below `minimum_size`.
//! 3. **Backward merge.** An undersized unit followed by a unit with a
//!    different device set is folded into its predecessor when the two
//!    device sets intersect; the merged unit runs on the intersection.

use std::ops::Range;

use model_ir::{DeviceKind, DeviceSet, ModelGraph, Validated};

use crate::PartitionError;

/// A contiguous operator range with a uniform device-support set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnitSubgraph {
    /// Position among the model's units.
    pub index: usize,
    /// Operators covered, half-open.
    pub ops: Range<usize>,
    /// Devices able to execute every operator in the unit.
    pub devices: DeviceSet,
}

impl UnitSubgraph {
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }
}

/// Computes the per-operator device sets used for unit construction.
pub fn support_table(
    graph: &ModelGraph<Validated>,
    minimum_size: usize,
    available: DeviceSet,
) -> Result<Vec<DeviceSet>, PartitionError> {
    let devices = graph.supported_devices.intersection(available);
    let mut table: Vec<DeviceSet> = (0..graph.num_ops())
        .map(|i| graph.op_support(i).intersection(devices))
        .collect();

    if let Some(op) = table.iter().position(|s| s.is_empty()) {
        return Err(PartitionError::NoSupportingDevice {
            model: graph.name.clone(),
            op,
            name: graph.ops[op].name.clone(),
        });
    }

    for device in devices.iter().filter(|d| *d != DeviceKind::Cpu) {
        let count = table.iter().filter(|s| s.contains(device)).count();
        if count == 0 || count >= minimum_size {
            continue;
        }
        if table.iter().any(|s| *s == DeviceSet::only(device)) {
            tracing::debug!(
                "model '{}': keeping {device} despite only {count} supported ops",
                graph.name
            );
            continue;
        }
        tracing::debug!(
            "model '{}': ignoring {device}, supports {count} ops (< {minimum_size})",
            graph.name
        );
        for s in table.iter_mut() {
            s.remove(device);
        }
    }

    Ok(table)
}

/// Splits `graph` into unit subgraphs.
pub fn compute_units(
    graph: &ModelGraph<Validated>,
    minimum_size: usize,
    available: DeviceSet,
) -> Result<Vec<UnitSubgraph>, PartitionError> {
    if graph.num_ops() == 0 {
        return Err(PartitionError::EmptyModel);
    }
    if minimum_size == 0 {
        return Err(PartitionError::InvalidConfig(
            "minimum_subgraph_size must be greater than 0".into(),
        ));
    }

    let support = support_table(graph, minimum_size, available)?;

    // ── Greedy grouping ───────────────────────────────────────────
    let mut groups: Vec<(Range<usize>, DeviceSet)> = Vec::new();
    for (op, &devices) in support.iter().enumerate() {
        match groups.last_mut() {
            Some((range, set)) if *set == devices && range.len() < minimum_size => {
                range.end = op + 1;
            }
            _ => groups.push((op..op + 1, devices)),
        }
    }

    // ── Backward merge of undersized units ─────────────────────────
    let mut merged: Vec<(Range<usize>, DeviceSet)> = Vec::with_capacity(groups.len());
    for (k, (range, devices)) in groups.iter().enumerate() {
        let followed_by_incompatible = groups
            .get(k + 1)
            .is_some_and(|(_, next)| next != devices);
        let undersized = range.len() < minimum_size;
        if let Some((prev_range, prev_devices)) = merged.last_mut() {
            let shared = prev_devices.intersection(*devices);
            if undersized && followed_by_incompatible && !shared.is_empty() {
                prev_range.end = range.end;
                *prev_devices = shared;
                continue;
            }
        }
        merged.push((range.clone(), *devices));
    }

    Ok(merged
        .into_iter()
        .enumerate()
        .map(|(index, (ops, devices))| UnitSubgraph {
            index,
            ops,
            devices,
        })
        .collect())
}
