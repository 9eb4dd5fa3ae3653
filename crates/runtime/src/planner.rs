// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The planning loop: pending jobs in, queue assignments out.
//!
//! A pass takes up to `schedule_window_size` pending jobs, hands them to the
//! configured policy (or, with two schedulers, SLO jobs to the first and the
//! rest to the second) and applies the resulting decisions. Passes are
//! serialized by the policy lock, whether they run on the planner thread or
//! inline on a submitting thread.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use cost_model::unix_micros;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use model_ir::ModelId;
use parking_lot::Mutex;
use partition_planner::PartitionPlan;
use scheduler::{Decision, JobId, PendingJob, SchedulingContext, SchedulingPolicy};

use crate::config::PlannerConfig;
use crate::engine::Core;
use crate::job::Job;
use crate::{JobError, JobStatus};

/// A job the pass terminated, finished once the policy lock is released.
type Terminated = (Job, JobStatus, JobError);

pub(crate) struct Planner {
    window: usize,
    pending: Mutex<Vec<Job>>,
    policies: Mutex<Vec<Box<dyn SchedulingPolicy>>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Planner {
    pub fn new(config: &PlannerConfig) -> Self {
        let (wake_tx, wake_rx) = channel::unbounded();
        let policies = config.schedulers.iter().map(|s| s.create_policy()).collect();
        Self {
            window: config.schedule_window_size,
            pending: Mutex::new(Vec::new()),
            policies: Mutex::new(policies),
            wake_tx,
            wake_rx,
        }
    }

    pub fn policy_names(&self) -> Vec<String> {
        self.policies.lock().iter().map(|p| p.name().to_string()).collect()
    }

    pub fn push(&self, jobs: impl IntoIterator<Item = Job>) {
        self.pending.lock().extend(jobs);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Wakes the planner thread. A no-op in online mode, where nobody listens.
    pub fn wake(&self) {
        let _ = self.wake_tx.send(());
    }

    pub fn forget(&self, job: JobId) {
        for policy in self.policies.lock().iter_mut() {
            policy.forget(job);
        }
    }

    pub fn drain(&self) -> Vec<Job> {
        let mut jobs = std::mem::take(&mut *self.pending.lock());
        jobs.sort_by_key(|j| j.id);
        jobs
    }

    pub fn receiver(&self) -> Receiver<()> {
        self.wake_rx.clone()
    }

    /// Fresh jobs in submission order, then jobs deferred by earlier passes.
    fn take_window(&self) -> Vec<Job> {
        let mut pending = self.pending.lock();
        pending.sort_by_key(|j| (j.deferred, j.id));
        let n = self.window.min(pending.len());
        pending.drain(..n).collect()
    }
}

/// Runs one pass. Returns the number of jobs that left the pending set.
pub(crate) fn run_pass(core: &Core) -> usize {
    let mut terminated = Vec::new();
    let progress = {
        let mut policies = core.planner.policies.lock();
        let window = core.planner.take_window();
        if window.is_empty() {
            return 0;
        }
        let plans = core.plans();
        let groups: Vec<Vec<Job>> = if policies.len() == 2 {
            let (slo, rest): (Vec<Job>, Vec<Job>) = window
                .into_iter()
                .partition(|j| j.deadline_us().is_some());
            vec![slo, rest]
        } else {
            vec![window]
        };

        let mut progress = 0;
        for (policy, group) in policies.iter_mut().zip(groups) {
            if !group.is_empty() {
                progress += plan_group(core, policy.as_mut(), &plans, group, &mut terminated);
            }
        }
        progress
    };

    for (job, status, error) in terminated {
        core.terminate(job, status, Some(error), Vec::new());
    }
    progress
}

/// Passes until the pending set stops shrinking.
pub(crate) fn run_until_idle(core: &Core) {
    while run_pass(core) > 0 {}
}

fn plan_group(
    core: &Core,
    policy: &mut dyn SchedulingPolicy,
    plans: &HashMap<ModelId, Arc<PartitionPlan>>,
    group: Vec<Job>,
    terminated: &mut Vec<Terminated>,
) -> usize {
    let now_us = unix_micros();
    let workers = core.dispatch.snapshot(now_us);
    let ctx = SchedulingContext {
        now_us,
        workers: &workers,
        plans,
        cost: &core.cost,
        idle_threshold: core.config.planner.idle_threshold,
        transfer_cost_us: core.config.planner.transfer_cost_us,
    };
    let pending: Vec<PendingJob> = group.iter().map(Job::pending).collect();
    let schedule = policy.schedule(&ctx, &pending);

    let mut jobs: BTreeMap<JobId, Job> = group.into_iter().map(|j| (j.id, j)).collect();
    let mut deferred = Vec::new();
    let mut progress = 0;

    for decision in schedule.iter() {
        let Some(mut job) = jobs.remove(&decision.job()) else {
            continue;
        };
        match decision {
            Decision::Assign {
                subgraph,
                worker,
                expected_latency_us,
                ..
            } => {
                let sg = ctx
                    .plan(job.model)
                    .and_then(|p| p.subgraph(subgraph.subgraph))
                    .cloned();
                match (sg, ctx.worker_index(*worker)) {
                    (Some(sg), Some(index)) => {
                        tracing::debug!(
                            "{}: {} assigned {} on {worker} ({:.0}us)",
                            policy.name(),
                            job.id,
                            sg.id,
                            expected_latency_us
                        );
                        job.deferred = false;
                        core.tracker.set_status(job.id, JobStatus::Assigned);
                        core.dispatch.enqueue(job, sg, index, *expected_latency_us);
                    }
                    _ => {
                        policy.forget(job.id);
                        let reason =
                            format!("{} assigned unknown {subgraph} on {worker}", policy.name());
                        let error = JobError::AssignmentFailure(reason);
                        terminated.push((job, JobStatus::Failed, error));
                    }
                }
                progress += 1;
            }
            Decision::Fail { reason, .. } => {
                tracing::debug!("{}: {} failed: {reason}", policy.name(), job.id);
                policy.forget(job.id);
                let error = JobError::AssignmentFailure(reason.clone());
                terminated.push((job, JobStatus::Failed, error));
                progress += 1;
            }
            Decision::DeadlineMissed {
                expected_finish_us, ..
            } => {
                tracing::debug!(
                    "{}: {} would finish at {:.0}us past its deadline",
                    policy.name(),
                    job.id,
                    expected_finish_us - job.deadline_us().unwrap_or(0) as f64
                );
                policy.forget(job.id);
                terminated.push((job, JobStatus::DeadlineMissed, JobError::DeadlineMissed));
                progress += 1;
            }
            Decision::Defer { .. } => {
                job.deferred = true;
                deferred.push(job);
            }
        }
    }

    for (id, mut job) in jobs {
        tracing::warn!("{} left {id} undecided; deferring it", policy.name());
        job.deferred = true;
        deferred.push(job);
    }
    if !deferred.is_empty() {
        core.planner.push(deferred);
    }
    progress
}

/// Body of the planner thread in batched mode.
///
/// Wakes on every submission or stage completion, and at least once per
/// `interval` so deferred jobs are retried.
pub(crate) fn run_planner(core: Arc<Core>, wake: Receiver<()>, interval: Duration) {
    tracing::debug!("planner thread started");
    loop {
        match wake.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if core.is_shutdown() {
            break;
        }
        while wake.try_recv().is_ok() {}
        run_until_idle(&core);
    }
    tracing::debug!("planner thread stopped");
}
