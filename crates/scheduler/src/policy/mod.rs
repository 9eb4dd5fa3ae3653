// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scheduling policies.
//!
//! Each policy turns a window of pending jobs into a [`Schedule`]. Policies
//! are pure with respect to the engine: they read a [`SchedulingContext`]
//! and return decisions, which the runtime then applies. Some keep state
//! between passes (the round-robin cursor, HEFT reservations), hence
//! `&mut self`.

mod fixed_device;
mod heft;
mod least_slack;
mod round_robin;
mod shortest_latency;

pub use fixed_device::FixedDevice;
pub use heft::Heft;
pub use least_slack::LeastSlackTimeFirst;
pub use round_robin::RoundRobin;
pub use shortest_latency::ShortestExpectedLatency;

use crate::{JobId, PendingJob, Schedule, SchedulingContext};

/// A job-to-worker assignment policy.
///
/// Implementations must decide every job they are given: assign it, fail
/// it, mark its deadline missed, or defer it when all its workers are
/// temporarily unavailable.
pub trait SchedulingPolicy: Send {
    /// Human-readable policy name.
    fn name(&self) -> &str;

    /// Plans one pass over `jobs`, given in submission order.
    fn schedule(&mut self, ctx: &SchedulingContext<'_>, jobs: &[PendingJob]) -> Schedule;

    /// Drops any state kept for `job`, called once the job terminates.
    fn forget(&mut self, _job: JobId) {}
}
