// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # scheduler
//!
//! Job-to-worker assignment policies for the runtime's planner.
//!
//! A scheduling pass receives a window of [`PendingJob`]s and a
//! [`SchedulingContext`] (worker states, partition plans, cost model) and
//! returns a [`Schedule`]: one [`Decision`] per job. Every job is decided in
//! the pass it is given to; ties go to the lowest worker id, then to the
//! earliest job id.
//!
//! | Type | Placement |
//! |---|---|
//! | `fixed_device` | the request's target worker |
//! | `round_robin` | workers in turn |
//! | `round_robin_idle` | workers in turn, skipping busy ones |
//! | `shortest_expected_latency` | lowest backlog plus estimate |
//! | `heft` / `heft_reserved` | earliest finish over the whole stage chain |
//! | `least_slack_time_first` | least slack first, each on its earliest finish |
//! | `thermal` | like `shortest_expected_latency`, scaled by thermal index |

mod context;
mod error;
mod job;
pub mod policy;
mod schedule;
mod scheduler_type;

pub use context::{remaining_latency, SchedulingContext, WorkerSnapshot};
pub use error::SchedulerError;
pub use job::{JobId, PendingJob, WorkerId};
pub use policy::SchedulingPolicy;
pub use schedule::{Choice, Decision, Route, Schedule, ScheduleBuilder, Stage};
pub use scheduler_type::{validate_schedulers, SchedulerType};

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use cost_model::{CostModel, CostModelConfig, ThermalSample};
    use model_ir::{DeviceKind, DeviceSet, ModelGraph, ModelId, SubgraphKey};
    use partition_planner::{partition, PartitionConfig, PartitionPlan, SubgraphPreparationType};
    use tensor_core::{DType, TensorSpec};

    use crate::{JobId, PendingJob, SchedulingContext, WorkerId, WorkerSnapshot};

    pub struct Fixture {
        pub model: ModelId,
        pub plans: HashMap<ModelId, Arc<PartitionPlan>>,
        pub cost: CostModel,
        pub workers: Vec<WorkerSnapshot>,
    }

    impl Fixture {
        fn build(supports: &[DeviceSet], workers: &[DeviceKind]) -> Self {
            let graph = ModelGraph::sequential(
                "fixture",
                TensorSpec::new("x", DType::F32, vec![4]),
                supports,
            )
            .validate()
            .unwrap();
            let config = PartitionConfig::new(SubgraphPreparationType::MergeUnitSubgraph, 1);
            let available: DeviceSet = workers.iter().copied().collect();
            let plan = partition(&graph, &config, available).unwrap();
            let model = ModelId(0);
            Self {
                model,
                plans: HashMap::from([(model, Arc::new(plan))]),
                cost: CostModel::new(CostModelConfig::default()).unwrap(),
                workers: workers
                    .iter()
                    .enumerate()
                    .map(|(i, d)| WorkerSnapshot::idle(WorkerId(i as u32), *d))
                    .collect(),
            }
        }

        /// One-op model runnable on the listed devices, one worker each.
        pub fn single(latencies: &[(DeviceKind, f64)]) -> Self {
            let devices: Vec<DeviceKind> = latencies.iter().map(|(d, _)| *d).collect();
            Self::single_with_workers(latencies, &devices)
        }

        pub fn single_with_workers(latencies: &[(DeviceKind, f64)], workers: &[DeviceKind]) -> Self {
            let support: DeviceSet = latencies.iter().map(|(d, _)| *d).collect();
            let fx = Self::build(&[support], workers);
            for (device, latency) in latencies {
                fx.cost.seed(SubgraphKey::new(fx.model, model_ir::SubgraphId(0)), *device, *latency);
            }
            fx
        }

        /// Two units on {CPU, GPU} plus their merge. Units: CPU 4 ms, GPU
        /// 3 ms. Merged: CPU 9 ms, GPU 5 ms.
        pub fn two_stage() -> Self {
            let both: DeviceSet = [DeviceKind::Cpu, DeviceKind::Gpu].into_iter().collect();
            let mut fx = Self::build(&[both, both], &[DeviceKind::Cpu, DeviceKind::Gpu]);
            fx.seed_units(DeviceKind::Cpu, 4_000.0);
            fx.seed_units(DeviceKind::Gpu, 3_000.0);
            fx.seed_merged(DeviceKind::Cpu, 9_000.0);
            fx.seed_merged(DeviceKind::Gpu, 5_000.0);
            fx
        }

        pub fn seed_units(&mut self, device: DeviceKind, latency: f64) {
            let plan = Arc::clone(&self.plans[&self.model]);
            for sg in plan.subgraphs.iter().filter(|s| s.num_units() == 1) {
                self.cost.seed(SubgraphKey::new(self.model, sg.id), device, latency);
            }
        }

        pub fn seed_merged(&mut self, device: DeviceKind, latency: f64) {
            let plan = Arc::clone(&self.plans[&self.model]);
            for sg in plan.subgraphs.iter().filter(|s| s.num_units() > 1) {
                self.cost.seed(SubgraphKey::new(self.model, sg.id), device, latency);
            }
        }

        /// Drives `device`'s thermal index to `index` with one sample.
        pub fn throttle(&self, device: DeviceKind, index: f64) {
            let max = 1_000_000u64;
            self.cost.update_thermal(
                device,
                ThermalSample {
                    timestamp_us: 0,
                    frequency_khz: Some((max as f64 / index) as u64),
                    max_frequency_khz: Some(max),
                    temperature_mc: None,
                },
            );
        }

        pub fn job(&self, id: u64) -> PendingJob {
            PendingJob::new(JobId(id), self.model, 0)
        }

        pub fn context(&self, now_us: u64) -> SchedulingContext<'_> {
            SchedulingContext {
                now_us,
                workers: &self.workers,
                plans: &self.plans,
                cost: &self.cost,
                idle_threshold: 1,
                transfer_cost_us: 100.0,
            }
        }
    }
}
