// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Heterogeneous earliest finish time.
//!
//! Plans the full remaining chain of every job, accounting for each
//! worker's backlog and the transfer penalty between devices, and commits
//! the first stage of the job whose earliest finish is the latest.
//!
//! The reserved variant remembers the second stage of every committed
//! route. Until that job comes back for its next stage, the reserved
//! latency counts against the reserved worker when other jobs are planned.

use std::collections::BTreeMap;

use crate::policy::SchedulingPolicy;
use crate::{
    JobId, PendingJob, Route, Schedule, ScheduleBuilder, SchedulerType, SchedulingContext, WorkerId,
};

#[derive(Debug, Default)]
pub struct Heft {
    reserve: bool,
    reserved: BTreeMap<JobId, (WorkerId, f64)>,
}

impl Heft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserved() -> Self {
        Self {
            reserve: true,
            reserved: BTreeMap::new(),
        }
    }

    /// Outstanding reservations, by job.
    pub fn reservations(&self) -> &BTreeMap<JobId, (WorkerId, f64)> {
        &self.reserved
    }

    /// Reserved latency per worker position, excluding `job`'s own slot.
    fn reserved_load(&self, ctx: &SchedulingContext<'_>, job: JobId) -> Vec<f64> {
        let mut load = vec![0.0; ctx.workers.len()];
        for (owner, (worker, latency)) in &self.reserved {
            if *owner == job {
                continue;
            }
            if let Some(idx) = ctx.worker_index(*worker) {
                load[idx] += latency;
            }
        }
        load
    }
}

impl SchedulingPolicy for Heft {
    fn name(&self) -> &str {
        if self.reserve {
            SchedulerType::HeftReserved.as_str()
        } else {
            SchedulerType::Heft.as_str()
        }
    }

    fn schedule(&mut self, ctx: &SchedulingContext<'_>, jobs: &[PendingJob]) -> Schedule {
        let mut builder = ScheduleBuilder::new(ctx);
        let mut remaining: Vec<&PendingJob> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if builder.admit(job) {
                remaining.push(job);
            }
        }
        remaining.sort_by_key(|j| j.id);

        while !remaining.is_empty() {
            let mut latest: Option<(usize, Route<'_>)> = None;
            for (i, job) in remaining.iter().enumerate() {
                let load = self.reserve.then(|| self.reserved_load(ctx, job.id));
                let Some(route) = builder.route(job, false, load.as_deref()) else {
                    continue;
                };
                if latest.as_ref().map_or(true, |(_, r)| route.finish_us > r.finish_us) {
                    latest = Some((i, route));
                }
            }
            let Some((i, route)) = latest else {
                for job in remaining.drain(..) {
                    builder.fail(job, "no device chain can complete the model");
                }
                break;
            };

            let job = remaining.remove(i);
            let first = route.first();
            let assigned = builder.assign(job, first.subgraph, first.worker);
            if self.reserve {
                match route.stages.get(1) {
                    Some(next) if assigned => {
                        let worker = ctx.workers[next.worker].id;
                        self.reserved.insert(job.id, (worker, next.latency_us));
                    }
                    _ => {
                        self.reserved.remove(&job.id);
                    }
                }
            }
        }
        builder.finish()
    }

    fn forget(&mut self, job: JobId) {
        self.reserved.remove(&job);
    }
}
