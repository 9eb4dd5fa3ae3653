// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Worker queues and worker threads.
//!
//! ```text
//!   planner ──enqueue──▶ ┌──────────────┐ ◀──next── worker-0-0, worker-0-1
//!                        │   Dispatch   │ ◀──next── worker-1-0
//!                        └──────────────┘       (steal: oldest compatible job)
//! ```
//!
//! All queues live behind one mutex and one condition variable. A worker
//! thread sleeps on the condition variable until something is enqueued, so
//! an enqueue can never slip between a thief's scan and its sleep.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cost_model::unix_micros;
use model_ir::{DeviceKind, SubgraphKey};
use parking_lot::{Condvar, Mutex, MutexGuard};
use partition_planner::Subgraph;
use scheduler::{JobId, WorkerId, WorkerSnapshot};

use crate::backend::{BackendError, DeviceBackend};
use crate::config::{DeadlinePolicy, WorkerConfig, WorkerType};
use crate::engine::Core;
use crate::job::{Job, StageRecord};
use crate::{JobError, JobStatus, WorkerMetrics, WorkerStats};

/// A job placed on a queue for one stage.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub job: Job,
    pub subgraph: Subgraph,
    /// Index of the worker the planner chose.
    pub worker: usize,
    pub expected_latency_us: f64,
    seq: u64,
}

/// A job handed to a worker thread.
#[derive(Debug)]
pub(crate) struct Dequeued {
    pub queued: QueuedJob,
    pub stolen: bool,
    /// Its deadline had passed when it was dequeued.
    pub expired: bool,
}

#[derive(Debug)]
pub(crate) enum Next {
    Job(Dequeued),
    /// The worker's device answered the availability probe again.
    Recovered,
    Shutdown,
}

/// How a started stage ended, for the per-worker counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageOutcome {
    Executed,
    Failed,
    /// Returned to the planner unexecuted.
    Returned,
}

#[derive(Debug)]
struct Running {
    job: JobId,
    expected_us: f64,
    started_us: u64,
}

#[derive(Debug)]
struct WorkerSlot {
    id: WorkerId,
    device: DeviceKind,
    num_threads: usize,
    available: bool,
    /// Last availability probe, or the outage that started the wait.
    probed_at: Option<Instant>,
    running: Vec<Running>,
    stats: WorkerStats,
}

#[derive(Debug, Default)]
struct DispatchState {
    /// One queue per worker, or a single shared one.
    queues: Vec<VecDeque<QueuedJob>>,
    workers: Vec<WorkerSlot>,
    shutdown: bool,
    next_seq: u64,
}

// ── Dispatch ───────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct Dispatch {
    worker_type: WorkerType,
    allow_steal: bool,
    deadline_policy: DeadlinePolicy,
    probe_interval: Duration,
    state: Mutex<DispatchState>,
    ready: Condvar,
}

impl Dispatch {
    pub fn new(config: &WorkerConfig) -> Self {
        let workers: Vec<WorkerSlot> = config
            .workers
            .iter()
            .enumerate()
            .map(|(i, spec)| WorkerSlot {
                id: WorkerId(i as u32),
                device: spec.device,
                num_threads: spec.num_threads.max(1),
                available: true,
                probed_at: None,
                running: Vec::new(),
                stats: WorkerStats::default(),
            })
            .collect();
        let num_queues = match config.worker_type {
            WorkerType::DeviceQueue => workers.len(),
            WorkerType::GlobalQueue => 1,
        };
        Self {
            worker_type: config.worker_type,
            allow_steal: config.allow_work_steal,
            deadline_policy: config.deadline_policy,
            probe_interval: Duration::from_millis(config.availability_check_interval_ms),
            state: Mutex::new(DispatchState {
                queues: (0..num_queues).map(|_| VecDeque::new()).collect(),
                workers,
                shutdown: false,
                next_seq: 0,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.state.lock().workers.len()
    }

    pub fn worker(&self, index: usize) -> (WorkerId, DeviceKind) {
        let state = self.state.lock();
        let slot = &state.workers[index];
        (slot.id, slot.device)
    }

    /// First worker of `device` in configuration order.
    pub fn worker_for(&self, device: DeviceKind) -> Option<WorkerId> {
        self.state
            .lock()
            .workers
            .iter()
            .find(|w| w.device == device)
            .map(|w| w.id)
    }

    pub fn enqueue(&self, job: Job, subgraph: Subgraph, worker: usize, expected_latency_us: f64) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let queue = match self.worker_type {
            WorkerType::DeviceQueue => worker,
            WorkerType::GlobalQueue => 0,
        };
        state.queues[queue].push_back(QueuedJob {
            job,
            subgraph,
            worker,
            expected_latency_us,
            seq,
        });
        drop(state);
        self.ready.notify_all();
    }

    /// Blocks until worker `index` has something to do.
    pub fn next(&self, index: usize, backend: &dyn DeviceBackend) -> Next {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return Next::Shutdown;
            }
            if !state.workers[index].available {
                let since = state.workers[index]
                    .probed_at
                    .map_or(self.probe_interval, |t| t.elapsed());
                if since < self.probe_interval {
                    // Enqueues wake us early; probe only once the interval is up.
                    self.ready.wait_for(&mut state, self.probe_interval - since);
                    continue;
                }
                let device = state.workers[index].device;
                state.workers[index].probed_at = Some(Instant::now());
                let up = MutexGuard::unlocked(&mut state, || backend.is_available(device));
                if up {
                    state.workers[index].available = true;
                    return Next::Recovered;
                }
                continue;
            }

            let now = unix_micros();
            if let Some(dequeued) = self.take(&mut state, index, now) {
                let marked_missed =
                    dequeued.expired && self.deadline_policy == DeadlinePolicy::MarkMissed;
                let slot = &mut state.workers[index];
                if !marked_missed {
                    slot.running.push(Running {
                        job: dequeued.queued.job.id,
                        expected_us: dequeued.queued.expected_latency_us,
                        started_us: now,
                    });
                }
                if dequeued.stolen {
                    slot.stats.stolen += 1;
                }
                return Next::Job(dequeued);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Picks the next job for worker `index`: its own queue first, then, if
    /// allowed, the oldest compatible untargeted job of a busy peer.
    fn take(&self, state: &mut DispatchState, index: usize, now: u64) -> Option<Dequeued> {
        let id = state.workers[index].id;
        let device = state.workers[index].device;
        let compatible = move |q: &QueuedJob| {
            q.subgraph.supports(device) && q.job.options.target_worker.map_or(true, |t| t == id)
        };

        let own = match self.worker_type {
            WorkerType::DeviceQueue => index,
            WorkerType::GlobalQueue => 0,
        };
        let queue = &state.queues[own];
        let position = match self.deadline_policy {
            DeadlinePolicy::MarkMissed => queue.iter().position(compatible),
            DeadlinePolicy::Deprioritize => queue
                .iter()
                .position(|q| compatible(q) && !q.job.is_expired(now))
                .or_else(|| queue.iter().position(compatible)),
        };
        if let Some(position) = position {
            let queued = state.queues[own].remove(position)?;
            return Some(Dequeued {
                expired: queued.job.is_expired(now),
                queued,
                stolen: false,
            });
        }

        if !self.allow_steal || self.worker_type == WorkerType::GlobalQueue {
            return None;
        }
        let mut victim: Option<(usize, usize, u64)> = None;
        for (v, queue) in state.queues.iter().enumerate() {
            if v == index || queue.len() + state.workers[v].running.len() < 2 {
                continue;
            }
            let candidate = queue.iter().enumerate().find(|(_, q)| {
                q.job.options.target_worker.is_none() && q.subgraph.supports(device)
            });
            if let Some((position, q)) = candidate {
                if victim.map_or(true, |(_, _, seq)| q.seq < seq) {
                    victim = Some((v, position, q.seq));
                }
            }
        }
        let (v, position, _) = victim?;
        let queued = state.queues[v].remove(position)?;
        Some(Dequeued {
            expired: queued.job.is_expired(now),
            queued,
            stolen: true,
        })
    }

    /// Ends the running entry of `job` on worker `index`.
    pub fn release(&self, index: usize, job: JobId, outcome: StageOutcome, latency_us: f64) {
        let mut state = self.state.lock();
        let slot = &mut state.workers[index];
        slot.running.retain(|r| r.job != job);
        match outcome {
            StageOutcome::Executed => {
                slot.stats.executed += 1;
                slot.stats.busy_us += latency_us;
            }
            StageOutcome::Failed => slot.stats.failed += 1,
            StageOutcome::Returned => {}
        }
    }

    pub fn count_deadline_missed(&self, index: usize) {
        self.state.lock().workers[index].stats.deadline_missed += 1;
    }

    /// Marks worker `index` unavailable and returns the jobs queued for it.
    ///
    /// In global-queue mode the shared queue is left alone; other workers
    /// keep consuming it.
    pub fn mark_unavailable(&self, index: usize) -> Vec<Job> {
        let mut state = self.state.lock();
        state.workers[index].available = false;
        state.workers[index].probed_at = Some(Instant::now());
        match self.worker_type {
            WorkerType::DeviceQueue => state.queues[index].drain(..).map(|q| q.job).collect(),
            WorkerType::GlobalQueue => Vec::new(),
        }
    }

    /// Per-worker load as seen by the planner.
    pub fn snapshot(&self, now: u64) -> Vec<WorkerSnapshot> {
        let state = self.state.lock();
        state
            .workers
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let (queue_len, queued_us) = state
                    .queues
                    .iter()
                    .flatten()
                    .filter(|q| q.worker == i)
                    .fold((0usize, 0.0f64), |(n, t), q| (n + 1, t + q.expected_latency_us));
                let running_us: f64 = w
                    .running
                    .iter()
                    .map(|r| (r.expected_us - now.saturating_sub(r.started_us) as f64).max(0.0))
                    .sum();
                WorkerSnapshot {
                    id: w.id,
                    device: w.device,
                    queue_len,
                    backlog_us: (queued_us + running_us) / w.num_threads as f64,
                    available: w.available,
                }
            })
            .collect()
    }

    pub fn metrics(&self) -> Vec<WorkerMetrics> {
        let state = self.state.lock();
        state
            .workers
            .iter()
            .enumerate()
            .map(|(i, w)| WorkerMetrics {
                id: w.id,
                device: w.device,
                available: w.available,
                queue_len: state.queues.iter().flatten().filter(|q| q.worker == i).count(),
                running: w.running.len(),
                stats: w.stats,
            })
            .collect()
    }

    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.ready.notify_all();
    }

    /// Removes every queued job, oldest first.
    pub fn drain(&self) -> Vec<Job> {
        let mut state = self.state.lock();
        let mut queued: Vec<QueuedJob> = state.queues.iter_mut().flat_map(|q| q.drain(..)).collect();
        queued.sort_by_key(|q| q.seq);
        queued.into_iter().map(|q| q.job).collect()
    }
}

// ── Worker threads ─────────────────────────────────────────────

/// Body of every worker thread.
pub(crate) fn run_worker(core: Arc<Core>, index: usize) {
    let (id, device) = core.dispatch.worker(index);
    let mask = core.config.worker.mask_of(index);
    if let Err(e) = core.backend.bind_thread(device, &mask) {
        tracing::warn!("{id} ({device}): cannot bind to cpus {mask}: {e}");
    }
    tracing::debug!("{id} ({device}) thread started");

    loop {
        match core.dispatch.next(index, core.backend.as_ref()) {
            Next::Shutdown => break,
            Next::Recovered => {
                tracing::info!("{id} ({device}) is available again");
                core.request_planning();
            }
            Next::Job(dequeued) => execute(&core, index, dequeued),
        }
    }
    tracing::debug!("{id} ({device}) thread stopped");
}

fn execute(core: &Core, index: usize, dequeued: Dequeued) {
    let Dequeued {
        queued,
        stolen,
        expired,
    } = dequeued;
    let QueuedJob { mut job, subgraph, .. } = queued;
    let (worker_id, device) = core.dispatch.worker(index);
    let job_id = job.id;

    if expired {
        match core.config.worker.deadline_policy {
            DeadlinePolicy::MarkMissed => {
                tracing::debug!("{job_id} expired in the queue of {worker_id}");
                core.dispatch.count_deadline_missed(index);
                core.terminate(
                    job,
                    JobStatus::DeadlineMissed,
                    Some(JobError::DeadlineMissed),
                    Vec::new(),
                );
                core.planner.forget(job_id);
                return;
            }
            DeadlinePolicy::Deprioritize => job.late = true,
        }
    }
    if stolen {
        tracing::warn!("{worker_id} ({device}) stole {job_id}");
    }

    let Some(entry) = core.model(job.model) else {
        core.dispatch.release(index, job_id, StageOutcome::Failed, 0.0);
        let reason = format!("{} is no longer registered", job.model);
        core.terminate(job, JobStatus::Failed, Some(JobError::ExecutionError(reason)), Vec::new());
        core.planner.forget(job_id);
        return;
    };

    core.tracker.set_status(job_id, JobStatus::Running);
    let started_us = unix_micros();
    let timer = Instant::now();
    let result = core
        .backend
        .execute(device, &entry.graph, subgraph.ops.clone(), &mut job.tensors);
    let latency_us = timer.elapsed().as_secs_f64() * 1e6;

    match result {
        Ok(()) => {
            core.dispatch
                .release(index, job_id, StageOutcome::Executed, latency_us);
            core.cost
                .observe(SubgraphKey::new(job.model, subgraph.id), device, latency_us);
            job.record.invoke_time_us.get_or_insert(started_us);
            job.record.stages.push(StageRecord {
                subgraph: subgraph.id,
                worker: worker_id,
                device,
                latency_us,
                stolen,
            });
            job.next_unit = subgraph.units.end;
            job.last_device = Some(device);
            tracing::debug!(
                "{job_id}: {} on {worker_id} took {:.0}us",
                subgraph.id,
                latency_us
            );

            if job.next_unit >= entry.plan.num_units() {
                core.complete(job, &entry.graph.outputs);
            } else {
                core.requeue(vec![job]);
            }
        }
        Err(BackendError::Unavailable(_)) => {
            tracing::warn!(
                "{worker_id} ({device}) became unavailable, returning its jobs to the planner"
            );
            core.dispatch.release(index, job_id, StageOutcome::Returned, 0.0);
            let mut jobs = vec![job];
            jobs.extend(core.dispatch.mark_unavailable(index));
            core.requeue(jobs);
        }
        Err(e) => {
            tracing::warn!("{job_id} failed on {worker_id}: {e}");
            core.dispatch.release(index, job_id, StageOutcome::Failed, 0.0);
            core.terminate(
                job,
                JobStatus::Failed,
                Some(JobError::ExecutionError(e.to_string())),
                Vec::new(),
            );
            core.planner.forget(job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JobTensors, SimulatedBackend};
    use crate::config::WorkerSpec;
    use crate::RequestOptions;
    use model_ir::{DeviceSet, ModelGraph, ModelId, SubgraphId, Validated};
    use std::ops::Range;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn config(devices: &[DeviceKind], steal: bool) -> WorkerConfig {
        WorkerConfig {
            workers: devices.iter().map(|d| WorkerSpec::new(*d)).collect(),
            allow_work_steal: steal,
            ..Default::default()
        }
    }

    fn subgraph(devices: DeviceSet) -> Subgraph {
        Subgraph {
            id: SubgraphId(0),
            ops: 0..1,
            units: 0..1,
            devices,
        }
    }

    fn job(id: u64, deadline_us: Option<u64>) -> Job {
        Job::new(
            JobId(id),
            ModelId(0),
            RequestOptions::default(),
            JobTensors::new(0),
            0,
            deadline_us,
        )
    }

    fn take(dispatch: &Dispatch, index: usize) -> Option<Dequeued> {
        let mut state = dispatch.state.lock();
        dispatch.take(&mut state, index, 1_000)
    }

    fn ids(range: Range<u64>) -> Vec<JobId> {
        range.map(JobId).collect()
    }

    #[test]
    fn test_own_queue_is_fifo() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu], false));
        for id in 0..3 {
            dispatch.enqueue(job(id, None), subgraph(DeviceSet::all()), 0, 10.0);
        }
        let order: Vec<JobId> = (0..3).filter_map(|_| take(&dispatch, 0)).map(|d| d.queued.job.id).collect();
        assert_eq!(order, ids(0..3));
    }

    #[test]
    fn test_steal_takes_oldest_compatible_job() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], true));
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::only(DeviceKind::Gpu)), 1, 10.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 1, 10.0);
        dispatch.enqueue(job(2, None), subgraph(DeviceSet::all()), 1, 10.0);

        let stolen = take(&dispatch, 0).unwrap();
        assert!(stolen.stolen);
        assert_eq!(stolen.queued.job.id, JobId(1));
    }

    #[test]
    fn test_steal_ignores_deadlines() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], true));
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::all()), 1, 10.0);
        dispatch.enqueue(job(1, Some(2_000)), subgraph(DeviceSet::all()), 1, 10.0);
        assert_eq!(take(&dispatch, 0).unwrap().queued.job.id, JobId(0));
    }

    #[test]
    fn test_no_steal_from_single_job_queue_or_when_disabled() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], true));
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::all()), 1, 10.0);
        assert!(take(&dispatch, 0).is_none());

        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], false));
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::all()), 1, 10.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 1, 10.0);
        assert!(take(&dispatch, 0).is_none());
    }

    #[test]
    fn test_targeted_jobs_are_never_stolen() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], true));
        for id in 0..2 {
            let mut j = job(id, None);
            j.options.target_worker = Some(WorkerId(1));
            dispatch.enqueue(j, subgraph(DeviceSet::all()), 1, 10.0);
        }
        assert!(take(&dispatch, 0).is_none());
    }

    #[test]
    fn test_deprioritize_runs_fresh_jobs_first() {
        let mut cfg = config(&[DeviceKind::Cpu], false);
        cfg.deadline_policy = DeadlinePolicy::Deprioritize;
        let dispatch = Dispatch::new(&cfg);
        dispatch.enqueue(job(0, Some(500)), subgraph(DeviceSet::all()), 0, 10.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 0, 10.0);

        let first = take(&dispatch, 0).unwrap();
        assert_eq!(first.queued.job.id, JobId(1));
        assert!(!first.expired);
        let second = take(&dispatch, 0).unwrap();
        assert_eq!(second.queued.job.id, JobId(0));
        assert!(second.expired);
    }

    #[test]
    fn test_mark_missed_pops_expired_front() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu], false));
        dispatch.enqueue(job(0, Some(500)), subgraph(DeviceSet::all()), 0, 10.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 0, 10.0);
        let first = take(&dispatch, 0).unwrap();
        assert_eq!(first.queued.job.id, JobId(0));
        assert!(first.expired);
    }

    #[test]
    fn test_global_queue_matches_capability() {
        let mut cfg = config(&[DeviceKind::Cpu, DeviceKind::Gpu], false);
        cfg.worker_type = WorkerType::GlobalQueue;
        let dispatch = Dispatch::new(&cfg);
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::only(DeviceKind::Gpu)), 1, 10.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 1, 10.0);

        let cpu = take(&dispatch, 0).unwrap();
        assert_eq!(cpu.queued.job.id, JobId(1));
        assert!(!cpu.stolen);
        assert_eq!(take(&dispatch, 1).unwrap().queued.job.id, JobId(0));
    }

    #[test]
    fn test_snapshot_counts_queued_backlog() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], false));
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::all()), 1, 300.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 1, 200.0);
        let snapshot = dispatch.snapshot(0);
        assert_eq!(snapshot[0].queue_len, 0);
        assert_eq!(snapshot[1].queue_len, 2);
        assert_eq!(snapshot[1].backlog_us, 500.0);
    }

    #[test]
    fn test_unavailable_worker_hands_back_its_queue() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu, DeviceKind::Gpu], false));
        dispatch.enqueue(job(0, None), subgraph(DeviceSet::all()), 1, 10.0);
        dispatch.enqueue(job(1, None), subgraph(DeviceSet::all()), 1, 10.0);
        let returned = dispatch.mark_unavailable(1);
        assert_eq!(returned.len(), 2);
        assert!(!dispatch.snapshot(0)[1].available);
    }

    #[test]
    fn test_next_recovers_after_probe() {
        let mut cfg = config(&[DeviceKind::Gpu], false);
        cfg.availability_check_interval_ms = 5;
        let dispatch = Dispatch::new(&cfg);
        let backend = SimulatedBackend::new();
        dispatch.mark_unavailable(0);
        assert!(matches!(dispatch.next(0, &backend), Next::Recovered));
        assert!(dispatch.snapshot(0)[0].available);
    }

    #[derive(Default)]
    struct CountingBackend {
        up: AtomicBool,
        probes: AtomicUsize,
    }

    impl DeviceBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn execute(
            &self,
            _device: DeviceKind,
            _graph: &ModelGraph<Validated>,
            _ops: Range<usize>,
            _tensors: &mut JobTensors,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        fn is_available(&self, _device: DeviceKind) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.up.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_enqueues_do_not_trigger_extra_probes() {
        let mut cfg = config(&[DeviceKind::Gpu], false);
        cfg.availability_check_interval_ms = 200;
        let dispatch = Dispatch::new(&cfg);
        let backend = CountingBackend::default();
        dispatch.mark_unavailable(0);

        std::thread::scope(|s| {
            let waiter = s.spawn(|| dispatch.next(0, &backend));
            for id in 0..50 {
                dispatch.enqueue(job(id, None), subgraph(DeviceSet::all()), 0, 10.0);
            }
            std::thread::sleep(Duration::from_millis(20));
            assert_eq!(backend.probes.load(Ordering::SeqCst), 0);
            backend.up.store(true, Ordering::SeqCst);
            assert!(matches!(waiter.join().unwrap(), Next::Recovered));
        });
        assert_eq!(backend.probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_next_returns_on_shutdown() {
        let dispatch = Dispatch::new(&config(&[DeviceKind::Cpu], false));
        dispatch.shutdown();
        assert!(matches!(dispatch.next(0, &SimulatedBackend::new()), Next::Shutdown));
    }
}
