// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Round-robin over workers in registration order.
//!
//! The idle variant only hands work to workers whose queue is below the
//! idle threshold. When every eligible worker is busy the job goes to the
//! least-loaded one instead, so a pass still decides every job.

use crate::policy::SchedulingPolicy;
use crate::{PendingJob, Schedule, ScheduleBuilder, SchedulerType, SchedulingContext};

#[derive(Debug, Default)]
pub struct RoundRobin {
    next: usize,
    idle_only: bool,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle() -> Self {
        Self {
            next: 0,
            idle_only: true,
        }
    }
}

impl SchedulingPolicy for RoundRobin {
    fn name(&self) -> &str {
        if self.idle_only {
            SchedulerType::RoundRobinIdle.as_str()
        } else {
            SchedulerType::RoundRobin.as_str()
        }
    }

    fn schedule(&mut self, ctx: &SchedulingContext<'_>, jobs: &[PendingJob]) -> Schedule {
        let mut builder = ScheduleBuilder::new(ctx);
        let n = ctx.workers.len();

        for job in jobs {
            if !builder.admit(job) {
                continue;
            }
            let eligible = |idx: usize| {
                let w = &ctx.workers[idx];
                if !w.available || job.target_worker.is_some_and(|t| t != w.id) {
                    return None;
                }
                ctx.largest_subgraph(job, w.device).map(|sg| (idx, sg))
            };

            let mut chosen = (0..n)
                .map(|step| (self.next + step) % n)
                .filter(|&idx| !self.idle_only || builder.is_idle(idx))
                .find_map(eligible);
            if chosen.is_none() && self.idle_only {
                chosen = (0..n)
                    .filter_map(eligible)
                    .min_by_key(|&(idx, _)| (builder.queue_len(idx), idx));
            }

            match chosen {
                Some((idx, subgraph)) => {
                    builder.assign(job, subgraph, idx);
                    self.next = (idx + 1) % n;
                }
                None => builder.fail(job, "no eligible worker"),
            }
        }
        builder.finish()
    }
}
