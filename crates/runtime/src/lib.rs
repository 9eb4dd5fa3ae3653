// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The engine that runs many independent inference requests across the
//! devices of one machine.
//!
//! The runtime takes:
//! - Validated `ModelGraph`s from `model-ir`, partitioned at registration by
//!   `partition-planner`.
//! - A shared `CostModel` from `cost-model`, fed by every executed stage and
//!   by the `resource-monitor` sampler.
//! - The assignment policies of `scheduler`.
//!
//! And drives them with one planner thread and a configurable number of
//! threads per worker. Operators are executed by a [`DeviceBackend`]; the
//! bundled [`SimulatedBackend`] sleeps instead of computing and is what the
//! tests and the CLI use.
//!
//! # Threads
//! ```text
//! caller ──request_async──▶ planner ──▶ worker-<id>-<n> ──▶ DeviceBackend
//!    ▲                                        │
//!    └───────────────── wait ◀────────────────┘
//! ```
//! `request_async` never blocks on planning or execution. `wait` sleeps on
//! a condition variable until the job reaches a terminal state;
//! `wait_async` bridges that onto tokio's blocking pool.

mod backend;
mod config;
mod engine;
mod error;
mod job;
mod metrics;
mod planner;
mod tracker;
mod worker;

pub use backend::{BackendError, DeviceBackend, JobTensors, SimulatedBackend};
pub use config::{
    DeadlinePolicy, PlannerConfig, PlanningMode, ProfileConfig, RuntimeConfig, WorkerConfig,
    WorkerSpec, WorkerType,
};
pub use engine::{EndCallback, Engine};
pub use error::{JobError, RuntimeError};
pub use job::{JobRecord, JobStatus, RequestOptions, StageRecord};
pub use metrics::{EngineMetrics, WorkerMetrics, WorkerStats};
pub use scheduler::{JobId, SchedulerType, WorkerId};
