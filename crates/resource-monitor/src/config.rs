// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sensor configuration, deserialized from the `[resource_monitor]` section.

use std::path::PathBuf;

use model_ir::DeviceKind;

use crate::MonitorError;

/// Unit a frequency file reports in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnit {
    /// `cpufreq` convention.
    #[default]
    Khz,
    /// `devfreq` convention (GPUs, NPUs).
    Hz,
}

impl FrequencyUnit {
    pub fn to_khz(self, raw: i64) -> u64 {
        let raw = raw.max(0) as u64;
        match self {
            FrequencyUnit::Khz => raw,
            FrequencyUnit::Hz => raw / 1000,
        }
    }
}

/// Sensor paths of one device. Any path may be omitted.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceSensorConfig {
    pub device: DeviceKind,
    #[serde(default)]
    pub freq_path: Option<PathBuf>,
    #[serde(default)]
    pub max_freq_path: Option<PathBuf>,
    #[serde(default)]
    pub thermal_path: Option<PathBuf>,
    #[serde(default)]
    pub freq_unit: FrequencyUnit,
}

impl DeviceSensorConfig {
    pub fn new(device: DeviceKind) -> Self {
        Self {
            device,
            freq_path: None,
            max_freq_path: None,
            thermal_path: None,
            freq_unit: FrequencyUnit::Khz,
        }
    }

    /// Standard `cpufreq` and thermal-zone paths for CPU `cpu`.
    pub fn linux_cpu(cpu: u32, thermal_zone: u32) -> Self {
        let base = PathBuf::from(format!("/sys/devices/system/cpu/cpu{cpu}/cpufreq"));
        Self {
            device: DeviceKind::Cpu,
            freq_path: Some(base.join("scaling_cur_freq")),
            max_freq_path: Some(base.join("cpuinfo_max_freq")),
            thermal_path: Some(PathBuf::from(format!(
                "/sys/class/thermal/thermal_zone{thermal_zone}/temp"
            ))),
            freq_unit: FrequencyUnit::Khz,
        }
    }
}

fn default_interval_ms() -> u64 {
    1_000
}

/// Settings of the background sampler.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceMonitorConfig {
    /// Polling period.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Devices to sample. The monitor is idle when this is empty.
    #[serde(default)]
    pub devices: Vec<DeviceSensorConfig>,
    /// File the cost model's observation journal is flushed to on every tick.
    #[serde(default)]
    pub profile_flush_path: Option<PathBuf>,
}

impl Default for ResourceMonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            devices: Vec::new(),
            profile_flush_path: None,
        }
    }
}

impl ResourceMonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "interval_ms must be greater than 0".into(),
            ));
        }
        let mut seen = Vec::new();
        for sensor in &self.devices {
            if seen.contains(&sensor.device) {
                return Err(MonitorError::InvalidConfig(format!(
                    "device {} configured twice",
                    sensor.device
                )));
            }
            seen.push(sensor.device);
        }
        Ok(())
    }
}
