// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Request options, job states and the per-job execution record.

use std::fmt;

use model_ir::{DeviceKind, ModelId, SubgraphId};
use scheduler::{JobId, PendingJob, WorkerId};

use crate::backend::JobTensors;
use crate::JobError;

/// Per-request knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Pins every stage of the job to this worker.
    pub target_worker: Option<WorkerId>,
    /// Latency objective relative to submission, in µs.
    pub slo_us: Option<u64>,
    /// Deadline as a multiple of the model's expected latency. Ignored when
    /// `slo_us` is set.
    pub slo_scale: Option<f64>,
    /// Fire the engine's end-of-request callback for this job.
    pub require_callback: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, worker: WorkerId) -> Self {
        self.target_worker = Some(worker);
        self
    }

    pub fn with_slo_us(mut self, slo_us: u64) -> Self {
        self.slo_us = Some(slo_us);
        self
    }

    pub fn with_slo_scale(mut self, scale: f64) -> Self {
        self.slo_scale = Some(scale);
        self
    }

    pub fn with_callback(mut self) -> Self {
        self.require_callback = true;
        self
    }
}

/// Lifecycle of a job.
///
/// `Queued → Assigned → Running → Done | Failed | DeadlineMissed`. A
/// multi-stage job goes back to `Queued` between stages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Assigned,
    Running,
    Done,
    Failed,
    DeadlineMissed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::DeadlineMissed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Assigned => "assigned",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::DeadlineMissed => "deadline_missed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed subgraph of a job.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StageRecord {
    pub subgraph: SubgraphId,
    pub worker: WorkerId,
    pub device: DeviceKind,
    pub latency_us: f64,
    /// Taken from another worker's queue.
    pub stolen: bool,
}

/// What happened to a job, returned by `wait` and written to the planner log.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub model: ModelId,
    pub status: JobStatus,
    pub enqueue_time_us: u64,
    /// Start of the first stage.
    pub invoke_time_us: Option<u64>,
    pub end_time_us: Option<u64>,
    pub deadline_us: Option<u64>,
    pub stages: Vec<StageRecord>,
    pub error: Option<JobError>,
}

impl JobRecord {
    pub fn new(job_id: JobId, model: ModelId, enqueue_time_us: u64) -> Self {
        Self {
            job_id,
            model,
            status: JobStatus::Queued,
            enqueue_time_us,
            invoke_time_us: None,
            end_time_us: None,
            deadline_us: None,
            stages: Vec::new(),
            error: None,
        }
    }

    /// Submission-to-completion time in µs.
    pub fn latency_us(&self) -> Option<u64> {
        self.end_time_us.map(|end| end.saturating_sub(self.enqueue_time_us))
    }

    /// Workers that ran the job, in stage order.
    pub fn workers(&self) -> Vec<WorkerId> {
        self.stages.iter().map(|s| s.worker).collect()
    }
}

/// A request in flight, owned by exactly one of: the planner's pending
/// set, a worker queue, or the worker thread executing it.
#[derive(Debug)]
pub(crate) struct Job {
    pub id: JobId,
    pub model: ModelId,
    pub options: RequestOptions,
    pub tensors: JobTensors,
    pub next_unit: usize,
    pub last_device: Option<DeviceKind>,
    /// Dequeued after its deadline under the deprioritize policy.
    pub late: bool,
    /// Deferred by the last pass; planned after fresh jobs.
    pub deferred: bool,
    pub record: JobRecord,
}

impl Job {
    pub fn new(
        id: JobId,
        model: ModelId,
        options: RequestOptions,
        tensors: JobTensors,
        enqueue_time_us: u64,
        deadline_us: Option<u64>,
    ) -> Self {
        let mut record = JobRecord::new(id, model, enqueue_time_us);
        record.deadline_us = deadline_us;
        Self {
            id,
            model,
            options,
            tensors,
            next_unit: 0,
            last_device: None,
            late: false,
            deferred: false,
            record,
        }
    }

    pub fn deadline_us(&self) -> Option<u64> {
        self.record.deadline_us
    }

    pub fn is_expired(&self, now_us: u64) -> bool {
        self.deadline_us().map_or(false, |d| now_us > d)
    }

    /// The planner's view of this job.
    pub fn pending(&self) -> PendingJob {
        let mut job = PendingJob::new(self.id, self.model, self.record.enqueue_time_us);
        job.next_unit = self.next_unit;
        job.target_worker = self.options.target_worker;
        job.deadline_us = self.deadline_us();
        job.last_device = self.last_device;
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::DeadlineMissed.is_terminal());
        assert_eq!(JobStatus::DeadlineMissed.to_string(), "deadline_missed");
    }

    #[test]
    fn test_pending_view_carries_progress() {
        let options = RequestOptions::new().with_target(WorkerId(1)).with_slo_us(500);
        let mut job = Job::new(JobId(3), ModelId(0), options, JobTensors::new(2), 1_000, Some(1_500));
        job.next_unit = 2;
        job.last_device = Some(DeviceKind::Gpu);

        let pending = job.pending();
        assert_eq!(pending.id, JobId(3));
        assert_eq!(pending.next_unit, 2);
        assert_eq!(pending.target_worker, Some(WorkerId(1)));
        assert_eq!(pending.deadline_us, Some(1_500));
        assert_eq!(pending.last_device, Some(DeviceKind::Gpu));
        assert!(!job.is_expired(1_500));
        assert!(job.is_expired(1_501));
    }

    #[test]
    fn test_record_serializes_for_the_planner_log() {
        let mut record = JobRecord::new(JobId(7), ModelId(1), 10);
        record.status = JobStatus::Failed;
        record.end_time_us = Some(40);
        record.error = Some(JobError::AssignmentFailure("no worker".into()));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["job_id"], 7);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "assignment_failure");
        assert_eq!(record.latency_us(), Some(30));
    }
}
