// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scheduling decisions and the builder policies record them with.
//!
//! The builder tracks how much work the pass has already placed on every
//! worker, so later decisions in the same pass see the load added by earlier
//! ones. It is also where the SLO admission check lives: an assignment whose
//! expected completion lies past the job's deadline is recorded as
//! [`Decision::DeadlineMissed`] instead.

use model_ir::{DeviceKind, SubgraphKey};
use partition_planner::Subgraph;
use tracing::debug;

use crate::{JobId, PendingJob, SchedulingContext, WorkerId};

/// Outcome of a pass for one job.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Enqueue the job's next stage on a worker.
    Assign {
        job: JobId,
        subgraph: SubgraphKey,
        worker: WorkerId,
        expected_latency_us: f64,
    },
    /// No worker can ever run the job's next stage.
    Fail { job: JobId, reason: String },
    /// The job cannot finish before its deadline.
    DeadlineMissed { job: JobId, expected_finish_us: f64 },
    /// Every worker able to run the job is currently unavailable.
    Defer { job: JobId },
}

impl Decision {
    pub fn job(&self) -> JobId {
        match self {
            Decision::Assign { job, .. }
            | Decision::Fail { job, .. }
            | Decision::DeadlineMissed { job, .. }
            | Decision::Defer { job } => *job,
        }
    }
}

/// The decisions of one pass, in the order they were made.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Schedule {
    pub decisions: Vec<Decision>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter()
    }

    pub fn decision(&self, job: JobId) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.job() == job)
    }

    /// Position of `job`'s decision within the pass.
    pub fn position(&self, job: JobId) -> Option<usize> {
        self.decisions.iter().position(|d| d.job() == job)
    }

    pub fn worker_of(&self, job: JobId) -> Option<WorkerId> {
        match self.decision(job)? {
            Decision::Assign { worker, .. } => Some(*worker),
            _ => None,
        }
    }

    /// Number of assignments per worker.
    pub fn assignment_counts(&self) -> std::collections::BTreeMap<WorkerId, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for d in &self.decisions {
            if let Decision::Assign { worker, .. } = d {
                *counts.entry(*worker).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// One stage of a [`Route`]: a subgraph on the worker at `worker` in the
/// context's worker list.
#[derive(Debug, Clone, Copy)]
pub struct Stage<'a> {
    pub subgraph: &'a Subgraph,
    pub worker: usize,
    pub latency_us: f64,
}

/// The earliest-finishing chain of stages covering a job's remaining units.
#[derive(Debug, Clone)]
pub struct Route<'a> {
    pub stages: Vec<Stage<'a>>,
    /// Expected completion relative to the start of the pass, in µs.
    pub finish_us: f64,
}

impl<'a> Route<'a> {
    pub fn first(&self) -> Stage<'a> {
        self.stages[0]
    }
}

/// The single best next stage of a job.
#[derive(Debug, Clone, Copy)]
pub struct Choice<'a> {
    pub subgraph: &'a Subgraph,
    pub worker: usize,
    /// Backlog plus this stage plus the fastest completion of the rest.
    pub finish_us: f64,
}

pub struct ScheduleBuilder<'c, 'a> {
    ctx: &'c SchedulingContext<'a>,
    backlog_us: Vec<f64>,
    queue_len: Vec<usize>,
    decisions: Vec<Decision>,
}

impl<'c, 'a> ScheduleBuilder<'c, 'a> {
    pub fn new(ctx: &'c SchedulingContext<'a>) -> Self {
        Self {
            ctx,
            backlog_us: ctx.workers.iter().map(|w| w.backlog_us).collect(),
            queue_len: ctx.workers.iter().map(|w| w.queue_len).collect(),
            decisions: Vec::new(),
        }
    }

    pub fn context(&self) -> &'c SchedulingContext<'a> {
        self.ctx
    }

    pub fn backlog_us(&self, worker: usize) -> f64 {
        self.backlog_us[worker]
    }

    pub fn queue_len(&self, worker: usize) -> usize {
        self.queue_len[worker]
    }

    /// A worker is idle while its queue is shorter than the idle threshold.
    pub fn is_idle(&self, worker: usize) -> bool {
        self.queue_len[worker] < self.ctx.idle_threshold
    }

    /// Checks that some available worker can take `job`'s next stage.
    ///
    /// Records a failure when no worker supports any candidate subgraph and
    /// a deferral when all supporting workers are unavailable.
    pub fn admit(&mut self, job: &PendingJob) -> bool {
        let Some(plan) = self.ctx.plan(job.model) else {
            self.fail(job, format!("model {} is not registered", job.model));
            return false;
        };
        let mut supported = false;
        for sg in plan.candidates(job.next_unit) {
            for (_, worker) in self.ctx.supporting_workers(job, sg) {
                if worker.available {
                    return true;
                }
                supported = true;
            }
        }
        if supported {
            self.defer(job);
        } else {
            let reason = match job.target_worker {
                Some(target) => format!("{target} cannot run unit {} of model {}", job.next_unit, job.model),
                None => format!("no worker can run unit {} of model {}", job.next_unit, job.model),
            };
            self.fail(job, reason);
        }
        false
    }

    /// Best next stage by backlog plus expected latency, assuming the rest
    /// of the model runs on its fastest devices.
    pub fn shortest(&self, job: &PendingJob, thermal: bool) -> Option<Choice<'a>> {
        let plan = self.ctx.plan(job.model)?;
        let mut best: Option<Choice<'a>> = None;
        for sg in plan.candidates(job.next_unit) {
            let rest = self.ctx.remaining_latency(job.model, sg.units.end);
            for (idx, worker) in self.ctx.eligible_workers(job, sg) {
                let finish = self.backlog_us[idx]
                    + self.ctx.latency(job.model, sg, worker.device, thermal)
                    + rest;
                if best.map_or(true, |b| finish < b.finish_us) {
                    best = Some(Choice {
                        subgraph: sg,
                        worker: idx,
                        finish_us: finish,
                    });
                }
            }
        }
        best.filter(|b| b.finish_us.is_finite())
    }

    /// Earliest-finish chain of stages for `job`.
    ///
    /// Each stage starts once both the previous stage and the target
    /// worker's backlog (plus `reserved`, if given) are done; a device
    /// change between stages costs the context's transfer penalty.
    pub fn route(&self, job: &PendingJob, thermal: bool, reserved: Option<&[f64]>) -> Option<Route<'a>> {
        let plan = self.ctx.plan(job.model)?;
        let n = plan.num_units();
        if job.next_unit >= n {
            return None;
        }

        let mut finish: Vec<Option<(f64, Option<DeviceKind>)>> = vec![None; n + 1];
        let mut back: Vec<Option<(usize, Stage<'a>)>> = vec![None; n + 1];
        finish[job.next_unit] = Some((0.0, job.last_device));

        for unit in job.next_unit..n {
            let Some((ready, device)) = finish[unit] else {
                continue;
            };
            for sg in plan.candidates(unit) {
                for (idx, worker) in self.ctx.eligible_workers(job, sg) {
                    let wait = self.backlog_us[idx] + reserved.map_or(0.0, |r| r[idx]);
                    let transfer = match device {
                        Some(d) if d != worker.device => self.ctx.transfer_cost_us,
                        _ => 0.0,
                    };
                    let latency = self.ctx.latency(job.model, sg, worker.device, thermal);
                    let end = ready.max(wait) + transfer + latency;
                    let slot = sg.units.end;
                    if finish[slot].map_or(true, |(t, _)| end < t) {
                        finish[slot] = Some((end, Some(worker.device)));
                        back[slot] = Some((
                            unit,
                            Stage {
                                subgraph: sg,
                                worker: idx,
                                latency_us: latency,
                            },
                        ));
                    }
                }
            }
        }

        let (finish_us, _) = finish[n]?;
        let mut stages = Vec::new();
        let mut slot = n;
        while slot != job.next_unit {
            let (prev, stage) = back[slot]?;
            stages.push(stage);
            slot = prev;
        }
        stages.reverse();
        Some(Route { stages, finish_us })
    }

    /// Assigns `job`'s next stage to the worker at index `worker`, unless the
    /// job would then miss its deadline. Returns `true` on assignment.
    pub fn assign(&mut self, job: &PendingJob, subgraph: &Subgraph, worker: usize) -> bool {
        let ctx = self.ctx;
        let w = &ctx.workers[worker];
        let latency = ctx.latency(job.model, subgraph, w.device, false);

        if let Some(deadline) = job.deadline_us {
            let expected_finish = ctx.now_us as f64
                + self.backlog_us[worker]
                + latency
                + ctx.remaining_latency(job.model, subgraph.units.end);
            if expected_finish > deadline as f64 {
                debug!(
                    "{} misses its deadline: expected {expected_finish:.0} > {deadline}",
                    job.id
                );
                self.decisions.push(Decision::DeadlineMissed {
                    job: job.id,
                    expected_finish_us: expected_finish,
                });
                return false;
            }
        }

        debug!(
            "{} -> {} ({}), subgraph {} units {:?}, expected {latency:.0}us",
            job.id, w.id, w.device, subgraph.id, subgraph.units
        );
        self.backlog_us[worker] += latency;
        self.queue_len[worker] += 1;
        self.decisions.push(Decision::Assign {
            job: job.id,
            subgraph: SubgraphKey::new(job.model, subgraph.id),
            worker: w.id,
            expected_latency_us: latency,
        });
        true
    }

    pub fn fail(&mut self, job: &PendingJob, reason: impl Into<String>) {
        let reason = reason.into();
        debug!("{} failed assignment: {reason}", job.id);
        self.decisions.push(Decision::Fail { job: job.id, reason });
    }

    /// Parks the job until a supporting worker comes back. A job whose
    /// deadline has already passed is marked missed instead.
    pub fn defer(&mut self, job: &PendingJob) {
        match job.deadline_us {
            Some(deadline) if deadline <= self.ctx.now_us => {
                debug!("{} expired while its workers were unavailable", job.id);
                self.decisions.push(Decision::DeadlineMissed {
                    job: job.id,
                    expected_finish_us: self.ctx.now_us as f64,
                });
            }
            _ => self.decisions.push(Decision::Defer { job: job.id }),
        }
    }

    pub fn finish(self) -> Schedule {
        Schedule {
            decisions: self.decisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[test]
    fn test_deadline_admission() {
        let fx = Fixture::single(&[(DeviceKind::Cpu, 5_000.0)]);
        let ctx = fx.context(10_000);
        let mut builder = ScheduleBuilder::new(&ctx);
        let sg = ctx.largest_subgraph(&fx.job(0), DeviceKind::Cpu).unwrap();

        let tight = fx.job(1).with_deadline(11_000);
        assert!(!builder.assign(&tight, sg, 0));
        let loose = fx.job(2).with_deadline(20_000);
        assert!(builder.assign(&loose, sg, 0));
        // the second job now waits behind the first
        let queued = fx.job(3).with_deadline(19_000);
        assert!(!builder.assign(&queued, sg, 0));

        let schedule = builder.finish();
        assert!(matches!(
            schedule.decision(crate::JobId(1)),
            Some(Decision::DeadlineMissed { .. })
        ));
        assert_eq!(schedule.worker_of(crate::JobId(2)), Some(WorkerId(0)));
        assert!(matches!(
            schedule.decision(crate::JobId(3)),
            Some(Decision::DeadlineMissed { .. })
        ));
    }

    #[test]
    fn test_route_chains_stages_and_charges_transfers() {
        let fx = Fixture::two_stage();
        let ctx = fx.context(0);
        let builder = ScheduleBuilder::new(&ctx);

        let route = builder.route(&fx.job(0), false, None).unwrap();
        assert_eq!(route.stages.len(), 1);
        assert_eq!(route.finish_us, 5_000.0);

        // with the GPU busy for 10 ms, two CPU stages finish first
        let reserved = [0.0, 10_000.0];
        let route = builder.route(&fx.job(0), false, Some(&reserved)).unwrap();
        assert_eq!(route.stages.len(), 2);
        assert!(route.stages.iter().all(|s| s.worker == 0));
        assert_eq!(route.finish_us, 8_000.0);
    }

    #[test]
    fn test_admit_defers_when_workers_unavailable() {
        let mut fx = Fixture::single(&[(DeviceKind::Gpu, 1_000.0)]);
        fx.workers[0].available = false;
        let ctx = fx.context(0);
        let mut builder = ScheduleBuilder::new(&ctx);
        assert!(!builder.admit(&fx.job(0)));
        assert_eq!(builder.finish().decisions, vec![Decision::Defer { job: crate::JobId(0) }]);
    }

    #[test]
    fn test_expired_job_is_not_deferred() {
        let mut fx = Fixture::single(&[(DeviceKind::Gpu, 1_000.0)]);
        fx.workers[0].available = false;
        let ctx = fx.context(50_000);
        let mut builder = ScheduleBuilder::new(&ctx);
        assert!(!builder.admit(&fx.job(0).with_deadline(50_000)));
        assert!(!builder.admit(&fx.job(1).with_deadline(80_000)));

        let schedule = builder.finish();
        assert!(matches!(
            schedule.decision(crate::JobId(0)),
            Some(Decision::DeadlineMissed { .. })
        ));
        assert_eq!(
            schedule.decision(crate::JobId(1)),
            Some(&Decision::Defer { job: crate::JobId(1) })
        );
    }
}
