// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Least slack time first.
//!
//! `slack = deadline - (now + expected remaining latency)`. Jobs are placed
//! in ascending slack order, each on the worker that finishes it earliest
//! (the most slack it can get). Jobs without an SLO have infinite slack and
//! keep their submission order behind every SLO job.

use std::cmp::Ordering;

use crate::policy::SchedulingPolicy;
use crate::{PendingJob, Schedule, ScheduleBuilder, SchedulerType, SchedulingContext};

#[derive(Debug, Default)]
pub struct LeastSlackTimeFirst;

impl SchedulingPolicy for LeastSlackTimeFirst {
    fn name(&self) -> &str {
        SchedulerType::LeastSlackTimeFirst.as_str()
    }

    fn schedule(&mut self, ctx: &SchedulingContext<'_>, jobs: &[PendingJob]) -> Schedule {
        let mut builder = ScheduleBuilder::new(ctx);
        let mut ordered: Vec<(f64, &PendingJob)> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if !builder.admit(job) {
                continue;
            }
            let remaining = builder
                .route(job, false, None)
                .map_or(f64::INFINITY, |r| r.finish_us);
            let slack = match job.time_to_deadline(ctx.now_us) {
                Some(left) => left - remaining,
                None => f64::INFINITY,
            };
            ordered.push((slack, job));
        }
        ordered.sort_by(|(a, ja), (b, jb)| {
            a.partial_cmp(b).unwrap_or(Ordering::Equal).then(ja.id.cmp(&jb.id))
        });

        for (slack, job) in ordered {
            tracing::trace!("{} slack {slack:.0}us", job.id);
            match builder.route(job, false, None) {
                Some(route) => {
                    let first = route.first();
                    builder.assign(job, first.subgraph, first.worker);
                }
                None => builder.fail(job, "no device chain can complete the model"),
            }
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use crate::{Decision, JobId};
    use model_ir::DeviceKind;

    #[test]
    fn test_earlier_deadline_is_placed_first() {
        let fx = Fixture::single(&[(DeviceKind::Cpu, 1_000.0)]);
        let ctx = fx.context(0);
        // submitted in the opposite order of their deadlines
        let jobs = vec![
            fx.job(0).with_deadline(50_000),
            fx.job(1).with_deadline(20_000),
            fx.job(2),
        ];
        let schedule = LeastSlackTimeFirst.schedule(&ctx, &jobs);
        assert!(schedule.position(JobId(1)).unwrap() < schedule.position(JobId(0)).unwrap());
        assert_eq!(schedule.position(JobId(2)), Some(2));
    }

    #[test]
    fn test_urgent_job_gets_the_empty_queue() {
        let fx = Fixture::single(&[(DeviceKind::Cpu, 4_000.0)]);
        let ctx = fx.context(0);
        let jobs = vec![fx.job(0).with_deadline(10_000), fx.job(1).with_deadline(5_000)];
        let schedule = LeastSlackTimeFirst.schedule(&ctx, &jobs);
        // job 1 runs first and fits; job 0 then finishes at 8 ms, still in time
        assert!(matches!(schedule.decision(JobId(1)), Some(Decision::Assign { .. })));
        assert!(matches!(schedule.decision(JobId(0)), Some(Decision::Assign { .. })));

        // in submission order job 1 would miss
        let fifo = crate::policy::RoundRobin::new().schedule(&ctx, &jobs);
        assert!(matches!(fifo.decision(JobId(1)), Some(Decision::DeadlineMissed { .. })));
    }
}
