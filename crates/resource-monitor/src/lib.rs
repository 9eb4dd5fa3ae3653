// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # resource-monitor
//!
//! Samples per-device frequency and temperature sensors from sysfs and
//! pushes the readings into the shared [`cost_model::CostModel`], where
//! thermal-aware scheduling policies pick them up.
//!
//! # Monitored Metrics
//! - **Frequency**: current and maximum clock (`cpufreq` in kHz or
//!   `devfreq` in Hz), configured per device.
//! - **Temperature**: a thermal zone in millidegrees Celsius.
//!
//! # Graceful Degradation
//! A sensor path that is missing or unreadable yields an *unknown* reading,
//! which the cost model treats as nominal. The polling loop never aborts on
//! sensor errors.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use cost_model::{CostModel, CostModelConfig};
//! use resource_monitor::{ResourceMonitor, ResourceMonitorConfig};
//!
//! let cost = Arc::new(CostModel::new(CostModelConfig::default()).unwrap());
//! let monitor = ResourceMonitor::start(ResourceMonitorConfig::default(), cost).unwrap();
//! println!("{}", monitor.poll_once().summary());
//! ```

mod config;
mod cpu;
mod error;
mod monitor;
mod sensor;
mod snapshot;
mod sysfs;
mod thermal;

pub use config::{DeviceSensorConfig, FrequencyUnit, ResourceMonitorConfig};
pub use cpu::{online_cores, CpuSet};
pub use error::MonitorError;
pub use monitor::ResourceMonitor;
pub use sensor::DeviceReading;
pub use snapshot::MonitorSnapshot;
pub use thermal::read_temperature_mc;
