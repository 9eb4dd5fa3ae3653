// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-only inputs of a scheduling pass.

use std::collections::HashMap;
use std::sync::Arc;

use cost_model::CostModel;
use model_ir::{DeviceKind, DeviceSet, ModelId, SubgraphKey};
use partition_planner::{PartitionPlan, Subgraph};

use crate::{PendingJob, WorkerId};

/// State of one worker when the pass starts.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub device: DeviceKind,
    /// Jobs queued but not started.
    pub queue_len: usize,
    /// Expected time until the worker drains its current work, in µs.
    pub backlog_us: f64,
    pub available: bool,
}

impl WorkerSnapshot {
    pub fn idle(id: WorkerId, device: DeviceKind) -> Self {
        Self {
            id,
            device,
            queue_len: 0,
            backlog_us: 0.0,
            available: true,
        }
    }
}

/// Everything a policy may consult while planning.
///
/// `workers` must be ordered by worker id.
pub struct SchedulingContext<'a> {
    pub now_us: u64,
    pub workers: &'a [WorkerSnapshot],
    pub plans: &'a HashMap<ModelId, Arc<PartitionPlan>>,
    pub cost: &'a CostModel,
    /// Queue depth at which a worker stops counting as idle.
    pub idle_threshold: usize,
    /// Penalty for moving intermediate tensors between devices, in µs.
    pub transfer_cost_us: f64,
}

impl<'a> SchedulingContext<'a> {
    pub fn plan(&self, model: ModelId) -> Option<&'a PartitionPlan> {
        self.plans.get(&model).map(Arc::as_ref)
    }

    /// Position of `id` in `workers`.
    pub fn worker_index(&self, id: WorkerId) -> Option<usize> {
        self.workers.iter().position(|w| w.id == id)
    }

    /// Devices that currently have an available worker.
    pub fn available_devices(&self) -> DeviceSet {
        self.workers
            .iter()
            .filter(|w| w.available)
            .map(|w| w.device)
            .collect()
    }

    pub fn latency(&self, model: ModelId, subgraph: &Subgraph, device: DeviceKind, thermal: bool) -> f64 {
        let key = SubgraphKey::new(model, subgraph.id);
        if thermal {
            self.cost.thermal_estimate(key, device)
        } else {
            self.cost.estimate(key, device)
        }
    }

    /// Workers allowed to run `subgraph` for `job`, ignoring availability.
    ///
    /// A job with a target override only ever sees that worker.
    pub fn supporting_workers<'s>(
        &'s self,
        job: &'s PendingJob,
        subgraph: &'s Subgraph,
    ) -> impl Iterator<Item = (usize, &'a WorkerSnapshot)> + 's {
        self.workers
            .iter()
            .enumerate()
            .filter(move |(_, w)| subgraph.supports(w.device))
            .filter(move |(_, w)| job.target_worker.map_or(true, |t| t == w.id))
    }

    /// Like [`supporting_workers`](Self::supporting_workers), restricted to
    /// available workers.
    pub fn eligible_workers<'s>(
        &'s self,
        job: &'s PendingJob,
        subgraph: &'s Subgraph,
    ) -> impl Iterator<Item = (usize, &'a WorkerSnapshot)> + 's {
        self.supporting_workers(job, subgraph).filter(|(_, w)| w.available)
    }

    /// The candidate next subgraph of `job` covering the most units that
    /// `device` can run. Ties go to the lowest subgraph id.
    pub fn largest_subgraph(&self, job: &PendingJob, device: DeviceKind) -> Option<&'a Subgraph> {
        let plan = self.plan(job.model)?;
        let mut best: Option<&Subgraph> = None;
        for sg in plan.candidates(job.next_unit).filter(|s| s.supports(device)) {
            if best.map_or(true, |b| sg.num_units() > b.num_units()) {
                best = Some(sg);
            }
        }
        best
    }

    /// Expected latency of the rest of `job`'s model from `from_unit`, with
    /// every stage on its fastest available device and no queueing.
    pub fn remaining_latency(&self, model: ModelId, from_unit: usize) -> f64 {
        match self.plan(model) {
            Some(plan) => remaining_latency(plan, model, self.cost, self.available_devices(), from_unit),
            None => f64::INFINITY,
        }
    }
}

/// Shortest expected latency to execute units `from_unit..` of `plan` on
/// `devices`, chaining candidate subgraphs. Returns infinity when the end of
/// the model cannot be reached.
pub fn remaining_latency(
    plan: &PartitionPlan,
    model: ModelId,
    cost: &CostModel,
    devices: DeviceSet,
    from_unit: usize,
) -> f64 {
    let n = plan.num_units();
    if from_unit >= n {
        return 0.0;
    }
    let mut best = vec![f64::INFINITY; n + 1];
    best[n] = 0.0;
    for unit in (from_unit..n).rev() {
        for sg in plan.candidates(unit) {
            let rest = best[sg.units.end];
            if !rest.is_finite() {
                continue;
            }
            for device in sg.devices.intersection(devices).iter() {
                let total = cost.estimate(SubgraphKey::new(model, sg.id), device) + rest;
                if total < best[unit] {
                    best[unit] = total;
                }
            }
        }
    }
    best[from_unit]
}
