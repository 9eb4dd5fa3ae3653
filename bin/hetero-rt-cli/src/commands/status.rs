// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hetero-rt status` command: one sensor pass over the configured devices.
//!
//! Without a config file the first CPU's `cpufreq` and thermal zone 0 are
//! read. Missing sysfs files show up as per-device errors, not failures.

use std::path::PathBuf;

use resource_monitor::{DeviceSensorConfig, MonitorSnapshot};

/// Below this share of the maximum frequency a device counts as throttled.
const THROTTLE_RATIO: f64 = 0.8;

pub async fn execute(config: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           hetero-rt · Device Status                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut devices = match config {
        Some(path) => super::load_config(Some(path), "")?.resource_monitor.devices,
        None => Vec::new(),
    };
    if devices.is_empty() {
        devices.push(DeviceSensorConfig::linux_cpu(0, 0));
    }

    let snapshot = MonitorSnapshot::capture(&devices);
    for reading in &snapshot.readings {
        let bar = reading
            .frequency_ratio()
            .map(frequency_bar)
            .unwrap_or_else(|| "[n/a]".into());
        println!("  {:<4} {bar}", reading.device.as_str());
    }
    println!();
    println!("{}", snapshot.summary());

    if snapshot.is_throttled(THROTTLE_RATIO) {
        println!();
        println!(
            "  WARNING: a device runs below {:.0}% of its maximum frequency",
            THROTTLE_RATIO * 100.0
        );
    }
    Ok(())
}

/// Visual bar of current over maximum frequency.
fn frequency_bar(ratio: f64) -> String {
    let filled = ((ratio * 20.0).round() as usize).min(20);
    let symbol = if ratio < THROTTLE_RATIO { "#" } else { "=" };
    format!(
        "[{}{}] {:>5.1}%",
        symbol.repeat(filled),
        ".".repeat(20 - filled),
        ratio * 100.0
    )
}
