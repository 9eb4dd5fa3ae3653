// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pins each job to the worker named in its request.

use crate::policy::SchedulingPolicy;
use crate::{PendingJob, Schedule, ScheduleBuilder, SchedulerType, SchedulingContext};

#[derive(Debug, Default)]
pub struct FixedDevice;

impl SchedulingPolicy for FixedDevice {
    fn name(&self) -> &str {
        SchedulerType::FixedDevice.as_str()
    }

    fn schedule(&mut self, ctx: &SchedulingContext<'_>, jobs: &[PendingJob]) -> Schedule {
        let mut builder = ScheduleBuilder::new(ctx);
        for job in jobs {
            let Some(target) = job.target_worker else {
                builder.fail(job, "fixed-device scheduling requires a target worker");
                continue;
            };
            let Some(idx) = ctx.worker_index(target) else {
                builder.fail(job, format!("unknown target {target}"));
                continue;
            };
            let worker = &ctx.workers[idx];
            let Some(subgraph) = ctx.largest_subgraph(job, worker.device) else {
                builder.fail(
                    job,
                    format!(
                        "{target} ({}) cannot run unit {} of model {}",
                        worker.device, job.next_unit, job.model
                    ),
                );
                continue;
            };
            if worker.available {
                builder.assign(job, subgraph, idx);
            } else {
                builder.defer(job);
            }
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use crate::{Decision, JobId, WorkerId};
    use model_ir::DeviceKind;

    #[test]
    fn test_honors_target_worker() {
        let fx = Fixture::single(&[(DeviceKind::Cpu, 1_000.0), (DeviceKind::Gpu, 500.0)]);
        let ctx = fx.context(0);
        let jobs = vec![
            fx.job(0).with_target(WorkerId(0)),
            fx.job(1).with_target(WorkerId(1)),
        ];
        let schedule = FixedDevice.schedule(&ctx, &jobs);
        assert_eq!(schedule.worker_of(JobId(0)), Some(WorkerId(0)));
        assert_eq!(schedule.worker_of(JobId(1)), Some(WorkerId(1)));
    }

    #[test]
    fn test_fails_on_unsupported_or_missing_target() {
        // model runs on CPU only, GPU worker exists
        let fx = Fixture::single_with_workers(
            &[(DeviceKind::Cpu, 1_000.0)],
            &[DeviceKind::Cpu, DeviceKind::Gpu],
        );
        let ctx = fx.context(0);
        let jobs = vec![
            fx.job(0).with_target(WorkerId(1)),
            fx.job(1),
            fx.job(2).with_target(WorkerId(9)),
            fx.job(3).with_target(WorkerId(0)),
        ];
        let schedule = FixedDevice.schedule(&ctx, &jobs);
        for id in 0..3 {
            assert!(matches!(schedule.decision(JobId(id)), Some(Decision::Fail { .. })));
        }
        assert_eq!(schedule.worker_of(JobId(3)), Some(WorkerId(0)));
    }

    #[test]
    fn test_down_target_misses_expired_deadline() {
        let mut fx = Fixture::single(&[(DeviceKind::Cpu, 1_000.0), (DeviceKind::Gpu, 500.0)]);
        fx.workers[1].available = false;
        let ctx = fx.context(20_000);
        let jobs = vec![
            fx.job(0).with_target(WorkerId(1)).with_deadline(10_000),
            fx.job(1).with_target(WorkerId(1)).with_deadline(90_000),
        ];
        let schedule = FixedDevice.schedule(&ctx, &jobs);
        assert!(matches!(
            schedule.decision(JobId(0)),
            Some(Decision::DeadlineMissed { .. })
        ));
        assert_eq!(schedule.decision(JobId(1)), Some(&Decision::Defer { job: JobId(1) }));
    }
}
