// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The background sampling thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cost_model::CostModel;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::{MonitorError, MonitorSnapshot, ResourceMonitorConfig};

/// Periodically samples device sensors and feeds the cost model.
///
/// The thread is stopped and joined when the monitor is dropped.
pub struct ResourceMonitor {
    config: ResourceMonitorConfig,
    cost: Arc<CostModel>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    /// Validates `config` and spawns the `resource-monitor` thread.
    pub fn start(config: ResourceMonitorConfig, cost: Arc<CostModel>) -> Result<Self, MonitorError> {
        config.validate()?;
        let (tx, rx) = channel::bounded::<()>(1);
        let thread_config = config.clone();
        let thread_cost = Arc::clone(&cost);

        let handle = std::thread::Builder::new()
            .name("resource-monitor".into())
            .spawn(move || {
                let interval = Duration::from_millis(thread_config.interval_ms);
                info!(
                    devices = thread_config.devices.len(),
                    interval_ms = thread_config.interval_ms,
                    "Resource monitor started"
                );
                loop {
                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => tick(&thread_config, &thread_cost),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Resource monitor stopped");
            })
            .map_err(MonitorError::Spawn)?;

        Ok(Self {
            config,
            cost,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn config(&self) -> &ResourceMonitorConfig {
        &self.config
    }

    /// Samples all devices now, on the calling thread, and records the
    /// readings in the cost model.
    pub fn poll_once(&self) -> MonitorSnapshot {
        record(&self.config, &self.cost)
    }
}

fn record(config: &ResourceMonitorConfig, cost: &CostModel) -> MonitorSnapshot {
    let snapshot = MonitorSnapshot::capture(&config.devices);
    for reading in &snapshot.readings {
        for error in &reading.errors {
            debug!(device = %reading.device, "{error}");
        }
        cost.update_thermal(reading.device, reading.sample);
    }
    snapshot
}

fn tick(config: &ResourceMonitorConfig, cost: &CostModel) {
    record(config, cost);
    if let Some(path) = &config.profile_flush_path {
        match cost.flush_profile(path) {
            Ok(0) => {}
            Ok(n) => debug!(records = n, path = %path.display(), "Flushed profile records"),
            Err(e) => warn!("Profile flush failed: {e}"),
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Resource monitor thread panicked");
            }
        }
    }
}
