// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the engine and for individual jobs.

use model_ir::ModelId;
use scheduler::JobId;

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Invalid or contradictory configuration, raised at engine construction.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The model cannot be partitioned for the configured workers.
    #[error("partition error: {0}")]
    PartitionError(#[from] partition_planner::PartitionError),

    /// The model graph is malformed.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// A tensor does not fit the model's specification.
    #[error("tensor error: {0}")]
    TensorError(#[from] tensor_core::TensorError),

    #[error("cost model error: {0}")]
    CostModelError(#[from] cost_model::CostModelError),

    #[error("resource monitor error: {0}")]
    MonitorError(#[from] resource_monitor::MonitorError),

    #[error("scheduler error: {0}")]
    SchedulerError(#[from] scheduler::SchedulerError),

    #[error("model {0} is not registered")]
    UnknownModel(ModelId),

    /// The job id was never issued, was already claimed, or its record was
    /// evicted.
    #[error("no record of {0}")]
    UnknownJob(JobId),

    /// The request does not match the model's inputs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The job terminated without producing a result.
    #[error("{job_id} terminated: {error}")]
    Job {
        job_id: JobId,
        #[source]
        error: JobError,
    },

    /// The blocking task behind an async wait panicked or was cancelled.
    #[error("wait task failed: {0}")]
    WaitTask(String),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal per-job failures. These never abort the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JobError {
    /// No eligible worker exists for the job.
    #[error("assignment failure: {0}")]
    AssignmentFailure(String),

    /// The backend failed while executing the job.
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// The SLO elapsed before the job could complete.
    #[error("deadline missed")]
    DeadlineMissed,

    /// The engine shut down before the job finished.
    #[error("engine shut down")]
    Shutdown,
}
