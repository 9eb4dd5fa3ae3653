// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Identifiers and the planner's view of a pending job.

use std::fmt;

use model_ir::{DeviceKind, ModelId};

/// Engine-wide job identifier, assigned in submission order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Worker identifier; workers are numbered in configuration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

/// A job waiting for its next stage to be assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingJob {
    pub id: JobId,
    pub model: ModelId,
    /// First unit subgraph not yet executed.
    pub next_unit: usize,
    /// Explicit worker override from the request.
    pub target_worker: Option<WorkerId>,
    /// Absolute SLO deadline in microseconds since the Unix epoch.
    pub deadline_us: Option<u64>,
    pub enqueue_time_us: u64,
    /// Device that produced the job's current intermediate tensors.
    pub last_device: Option<DeviceKind>,
}

impl PendingJob {
    pub fn new(id: JobId, model: ModelId, enqueue_time_us: u64) -> Self {
        Self {
            id,
            model,
            next_unit: 0,
            target_worker: None,
            deadline_us: None,
            enqueue_time_us,
            last_device: None,
        }
    }

    pub fn with_target(mut self, worker: WorkerId) -> Self {
        self.target_worker = Some(worker);
        self
    }

    pub fn with_deadline(mut self, deadline_us: u64) -> Self {
        self.deadline_us = Some(deadline_us);
        self
    }

    pub fn has_slo(&self) -> bool {
        self.deadline_us.is_some()
    }

    /// Time left until the deadline, `None` without an SLO. Negative once the
    /// deadline has passed.
    pub fn time_to_deadline(&self, now_us: u64) -> Option<f64> {
        self.deadline_us.map(|d| d as f64 - now_us as f64)
    }
}
