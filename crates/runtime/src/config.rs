// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! [planner]
//! schedulers = ["least_slack_time_first", "heft"]
//! schedule_window_size = 8
//! planning_mode = "batched"
//! log_path = "planner.jsonl"
//!
//! [subgraph]
//! preparation_type = "merge_unit_subgraph"
//! minimum_subgraph_size = 7
//!
//! [worker]
//! worker_type = "device_queue"
//! allow_work_steal = true
//! availability_check_interval_ms = 100
//! deadline_policy = "mark_missed"
//!
//! [[worker.workers]]
//! device = "cpu"
//! num_threads = 2
//! cpu_mask = "0-3"
//!
//! [[worker.workers]]
//! device = "gpu"
//!
//! [profile]
//! online = true
//! num_warmups = 1
//! num_runs = 3
//! smoothing_factor = 0.1
//! profile_path = "profile.jsonl"
//!
//! [resource_monitor]
//! interval_ms = 500
//!
//! [[resource_monitor.devices]]
//! device = "gpu"
//! freq_path = "/sys/class/devfreq/gpu/cur_freq"
//! freq_unit = "hz"
//! ```

use std::path::{Path, PathBuf};

use cost_model::CostModelConfig;
use model_ir::DeviceKind;
use partition_planner::PartitionConfig;
use resource_monitor::{CpuSet, ResourceMonitorConfig};
use scheduler::{validate_schedulers, SchedulerType};

use crate::RuntimeError;

// ── Planner ────────────────────────────────────────────────────

/// When scheduling passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningMode {
    /// A dedicated planner thread, woken on submissions and completions.
    #[default]
    Batched,
    /// The submitting or completing thread runs the pass itself.
    Online,
}

/// The `[planner]` section.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// One scheduler, or two: SLO jobs go to the first, the rest to the second.
    pub schedulers: Vec<SchedulerType>,
    /// Maximum number of jobs planned per pass.
    pub schedule_window_size: usize,
    pub planning_mode: PlanningMode,
    /// JSON-lines file receiving one record per finished job on shutdown.
    pub log_path: Option<PathBuf>,
    /// Queue depth at which a worker stops counting as idle.
    pub idle_threshold: usize,
    /// Cost of moving intermediate tensors between devices, in µs.
    pub transfer_cost_us: f64,
    /// Unclaimed finished-job records kept for `wait`.
    pub finished_record_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            schedulers: vec![SchedulerType::ShortestExpectedLatency],
            schedule_window_size: 16,
            planning_mode: PlanningMode::Batched,
            log_path: None,
            idle_threshold: 1,
            transfer_cost_us: 0.0,
            finished_record_capacity: 1000,
        }
    }
}

// ── Workers ────────────────────────────────────────────────────

/// How jobs are queued for workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    /// Each worker owns a FIFO queue.
    #[default]
    DeviceQueue,
    /// One engine-wide queue, consumed by every worker able to run the job.
    GlobalQueue,
}

/// What a worker thread does with a dequeued job whose deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePolicy {
    /// Terminate it as `DeadlineMissed` without running it.
    #[default]
    MarkMissed,
    /// Run it after every in-deadline job, then report `DeadlineMissed`.
    Deprioritize,
}

fn default_threads() -> usize {
    1
}

/// One `[[worker.workers]]` entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkerSpec {
    pub device: DeviceKind,
    #[serde(default = "default_threads")]
    pub num_threads: usize,
    /// Overrides the section-wide mask.
    #[serde(default)]
    pub cpu_mask: Option<CpuSet>,
}

impl WorkerSpec {
    pub fn new(device: DeviceKind) -> Self {
        Self {
            device,
            num_threads: 1,
            cpu_mask: None,
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }
}

/// The `[worker]` section.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub workers: Vec<WorkerSpec>,
    pub worker_type: WorkerType,
    pub allow_work_steal: bool,
    /// Probe period of an unavailable device.
    pub availability_check_interval_ms: u64,
    pub deadline_policy: DeadlinePolicy,
    /// Mask for workers without their own.
    pub cpu_mask: CpuSet,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: vec![WorkerSpec::new(DeviceKind::Cpu)],
            worker_type: WorkerType::DeviceQueue,
            allow_work_steal: false,
            availability_check_interval_ms: 100,
            deadline_policy: DeadlinePolicy::MarkMissed,
            cpu_mask: CpuSet::all(),
        }
    }
}

impl WorkerConfig {
    /// Effective affinity mask of worker `index`.
    pub fn mask_of(&self, index: usize) -> CpuSet {
        self.workers
            .get(index)
            .and_then(|w| w.cpu_mask.clone())
            .unwrap_or_else(|| self.cpu_mask.clone())
    }
}

// ── Profiling ──────────────────────────────────────────────────

/// The `[profile]` section: cost model tuning and profiling runs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Profile each (subgraph, device) pair at registration when no record exists.
    pub online: bool,
    pub num_warmups: usize,
    pub num_runs: usize,
    pub smoothing_factor: f64,
    /// Cold-start estimate in µs.
    pub default_latency_us: f64,
    pub therm_window_size: usize,
    pub throttle_temperature_mc: Option<i64>,
    /// JSON-lines profile read at startup, appended on every resource
    /// monitor tick and once more on shutdown.
    pub profile_path: Option<PathBuf>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        let cost = CostModelConfig::default();
        Self {
            online: true,
            num_warmups: 1,
            num_runs: 1,
            smoothing_factor: cost.smoothing_factor,
            default_latency_us: cost.default_latency_us,
            therm_window_size: cost.therm_window_size,
            throttle_temperature_mc: cost.throttle_temperature_mc,
            profile_path: None,
        }
    }
}

impl ProfileConfig {
    pub fn cost_model_config(&self) -> CostModelConfig {
        CostModelConfig {
            smoothing_factor: self.smoothing_factor,
            default_latency_us: self.default_latency_us,
            therm_window_size: self.therm_window_size,
            throttle_temperature_mc: self.throttle_temperature_mc,
            journal: self.profile_path.is_some(),
        }
    }
}

// ── Runtime ────────────────────────────────────────────────────

/// Complete engine configuration. Immutable once the engine is built.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub subgraph: PartitionConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub resource_monitor: ResourceMonitorConfig,
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Convenience constructor: one single-threaded worker per device.
    pub fn with_devices(devices: &[DeviceKind]) -> Self {
        let mut config = Self::default();
        config.worker.workers = devices.iter().map(|d| WorkerSpec::new(*d)).collect();
        config
    }

    pub fn with_schedulers(mut self, schedulers: &[SchedulerType]) -> Self {
        self.planner.schedulers = schedulers.to_vec();
        self
    }

    /// Settings for the background monitor, or `None` when it has nothing
    /// to do: no sensors to sample and no profile journal to flush.
    ///
    /// `profile_path` is the flush target unless the monitor names its own.
    pub fn monitor_config(&self) -> Option<ResourceMonitorConfig> {
        if self.resource_monitor.devices.is_empty() && self.profile.profile_path.is_none() {
            return None;
        }
        let mut config = self.resource_monitor.clone();
        if config.profile_flush_path.is_none() {
            config.profile_flush_path = self.profile.profile_path.clone();
        }
        Some(config)
    }

    /// Checks every section for contradictory or out-of-range values.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        let err = |msg: String| Err(RuntimeError::ConfigError(msg));

        validate_schedulers(&self.planner.schedulers)
            .map_err(|e| RuntimeError::ConfigError(e.to_string()))?;
        if self.planner.schedule_window_size == 0 {
            return err("schedule_window_size must be greater than 0".into());
        }
        if self.planner.idle_threshold == 0 {
            return err("idle_threshold must be greater than 0".into());
        }
        if self.planner.finished_record_capacity == 0 {
            return err("finished_record_capacity must be greater than 0".into());
        }
        if !(self.planner.transfer_cost_us >= 0.0 && self.planner.transfer_cost_us.is_finite()) {
            return err(format!(
                "transfer_cost_us must be non-negative, got {}",
                self.planner.transfer_cost_us
            ));
        }

        self.subgraph
            .validate()
            .map_err(|e| RuntimeError::ConfigError(e.to_string()))?;

        if self.worker.workers.is_empty() {
            return err("at least one worker must be configured".into());
        }
        if let Some(w) = self.worker.workers.iter().find(|w| w.num_threads == 0) {
            return err(format!("{} worker has num_threads = 0", w.device));
        }
        if self.worker.availability_check_interval_ms == 0 {
            return err("availability_check_interval_ms must be greater than 0".into());
        }

        self.profile
            .cost_model_config()
            .validate()
            .map_err(|e| RuntimeError::ConfigError(e.to_string()))?;
        if self.profile.online && self.profile.num_runs == 0 {
            return err("online profiling needs num_runs > 0".into());
        }

        self.resource_monitor
            .validate()
            .map_err(|e| RuntimeError::ConfigError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partition_planner::SubgraphPreparationType;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.planner.schedulers, vec![SchedulerType::ShortestExpectedLatency]);
        assert_eq!(c.planner.finished_record_capacity, 1000);
        assert_eq!(c.worker.workers.len(), 1);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
[planner]
schedulers = ["least_slack_time_first", "round_robin"]
planning_mode = "online"

[subgraph]
preparation_type = "unit_subgraph"
minimum_subgraph_size = 3

[worker]
allow_work_steal = true
worker_type = "global_queue"
cpu_mask = "0-3"

[[worker.workers]]
device = "cpu"
num_threads = 2
cpu_mask = "4-7"

[[worker.workers]]
device = "gpu"

[profile]
smoothing_factor = 0.5
online = false
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.planner.schedulers.len(), 2);
        assert_eq!(c.planner.planning_mode, PlanningMode::Online);
        assert_eq!(c.planner.schedule_window_size, 16);
        assert_eq!(c.subgraph.preparation_type, SubgraphPreparationType::UnitSubgraph);
        assert_eq!(c.worker.worker_type, WorkerType::GlobalQueue);
        assert_eq!(c.worker.workers[0].num_threads, 2);
        assert_eq!(c.worker.workers[1].num_threads, 1);
        assert_eq!(c.worker.mask_of(0).to_string(), "4-7");
        assert_eq!(c.worker.mask_of(1).to_string(), "0-3");
        assert_eq!(c.profile.smoothing_factor, 0.5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut c = RuntimeConfig::with_devices(&[DeviceKind::Cpu, DeviceKind::Npu]);
        c.planner.log_path = Some(PathBuf::from("/tmp/planner.jsonl"));
        let toml = c.to_toml().unwrap();
        let back = RuntimeConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<Box<dyn Fn(&mut RuntimeConfig)>> = vec![
            Box::new(|c| c.planner.schedulers.clear()),
            Box::new(|c| c.planner.schedulers = vec![SchedulerType::Heft; 3]),
            Box::new(|c| c.planner.schedule_window_size = 0),
            Box::new(|c| c.planner.idle_threshold = 0),
            Box::new(|c| c.subgraph.minimum_subgraph_size = 0),
            Box::new(|c| c.worker.workers.clear()),
            Box::new(|c| c.worker.workers[0].num_threads = 0),
            Box::new(|c| c.worker.availability_check_interval_ms = 0),
            Box::new(|c| c.profile.smoothing_factor = 0.0),
            Box::new(|c| c.profile.smoothing_factor = 1.5),
            Box::new(|c| c.resource_monitor.interval_ms = 0),
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut c = RuntimeConfig::default();
            mutate(&mut c);
            assert!(
                matches!(c.validate(), Err(RuntimeError::ConfigError(_))),
                "case {i} should be rejected"
            );
        }
    }

    #[test]
    fn test_monitor_runs_to_flush_profile() {
        let mut c = RuntimeConfig::default();
        assert_eq!(c.monitor_config(), None);

        c.profile.profile_path = Some(PathBuf::from("/tmp/profile.jsonl"));
        let monitor = c.monitor_config().unwrap();
        assert!(monitor.devices.is_empty());
        assert_eq!(monitor.profile_flush_path, c.profile.profile_path);

        c.resource_monitor.profile_flush_path = Some(PathBuf::from("/tmp/other.jsonl"));
        let monitor = c.monitor_config().unwrap();
        assert_eq!(monitor.profile_flush_path, Some(PathBuf::from("/tmp/other.jsonl")));
    }

    #[test]
    fn test_unknown_scheduler_is_a_parse_error() {
        let toml = "[planner]\nschedulers = [\"fifo\"]\n";
        assert!(RuntimeConfig::from_toml(toml).is_err());
    }
}
