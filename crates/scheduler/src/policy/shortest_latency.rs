// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shortest-expected-latency placement, optionally thermal-aware.
//!
//! Jobs are placed most-urgent first: on every round the job whose best
//! achievable completion is the latest gets its best worker, then backlogs
//! are updated and the remaining jobs are re-evaluated.

use crate::policy::SchedulingPolicy;
use crate::{Choice, PendingJob, Schedule, ScheduleBuilder, SchedulerType, SchedulingContext};

#[derive(Debug, Default)]
pub struct ShortestExpectedLatency {
    thermal: bool,
}

impl ShortestExpectedLatency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scales every estimate by the device's thermal index.
    pub fn thermal() -> Self {
        Self { thermal: true }
    }
}

impl SchedulingPolicy for ShortestExpectedLatency {
    fn name(&self) -> &str {
        if self.thermal {
            SchedulerType::Thermal.as_str()
        } else {
            SchedulerType::ShortestExpectedLatency.as_str()
        }
    }

    fn schedule(&mut self, ctx: &SchedulingContext<'_>, jobs: &[PendingJob]) -> Schedule {
        let mut builder = ScheduleBuilder::new(ctx);
        let mut remaining: Vec<&PendingJob> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if builder.admit(job) {
                remaining.push(job);
            }
        }
        remaining.sort_by_key(|j| j.id);

        while !remaining.is_empty() {
            let mut urgent: Option<(usize, Choice<'_>)> = None;
            for (i, job) in remaining.iter().enumerate() {
                if let Some(choice) = builder.shortest(job, self.thermal) {
                    if urgent.map_or(true, |(_, best)| choice.finish_us > best.finish_us) {
                        urgent = Some((i, choice));
                    }
                }
            }
            let Some((i, choice)) = urgent else {
                for job in remaining.drain(..) {
                    builder.fail(job, "no device can complete the model");
                }
                break;
            };
            let job = remaining.remove(i);
            builder.assign(job, choice.subgraph, choice.worker);
        }
        builder.finish()
    }
}
