// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine-level counters, reported by [`Engine::metrics`](crate::Engine::metrics).

use model_ir::DeviceKind;
use scheduler::WorkerId;

/// Cumulative counters of one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct WorkerStats {
    /// Stages executed successfully.
    pub executed: u64,
    /// Jobs taken from another worker's queue.
    pub stolen: u64,
    /// Stages that ended in a backend error.
    pub failed: u64,
    /// Jobs dropped from the queue after their deadline.
    pub deadline_missed: u64,
    /// Total execution time of successful stages.
    pub busy_us: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WorkerMetrics {
    pub id: WorkerId,
    pub device: DeviceKind,
    pub available: bool,
    pub queue_len: usize,
    pub running: usize,
    pub stats: WorkerStats,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EngineMetrics {
    pub submitted: u64,
    pub done: u64,
    pub failed: u64,
    pub deadline_missed: u64,
    /// Finished records dropped before anyone waited for them.
    pub evicted: u64,
    /// Jobs waiting for the planner.
    pub pending: usize,
    /// Mean submission-to-completion latency of `Done` jobs.
    pub mean_latency_us: f64,
    pub workers: Vec<WorkerMetrics>,
}

impl EngineMetrics {
    /// Jobs not yet in a terminal state.
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.done + self.failed + self.deadline_missed)
    }

    pub fn total_executed(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.executed).sum()
    }

    pub fn total_stolen(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.stolen).sum()
    }

    /// Share of successful stages run by each worker.
    pub fn utilization(&self) -> Vec<(WorkerId, f64)> {
        let total = self.total_executed();
        self.workers
            .iter()
            .map(|w| {
                let share = if total == 0 {
                    0.0
                } else {
                    w.stats.executed as f64 / total as f64
                };
                (w.id, share)
            })
            .collect()
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Jobs: {} submitted, {} done, {} failed, {} deadline missed, {} in flight; \
             mean latency {:.2}ms",
            self.submitted,
            self.done,
            self.failed,
            self.deadline_missed,
            self.in_flight(),
            self.mean_latency_us / 1000.0,
        );
        if self.evicted > 0 {
            out.push_str(&format!(", {} unclaimed results evicted", self.evicted));
        }
        for w in &self.workers {
            out.push_str(&format!(
                "\n  {} {:<4} {:>6} stages ({} stolen, {} failed, {} missed), {:.2}ms busy, queue {}{}",
                w.id,
                w.device.as_str(),
                w.stats.executed,
                w.stats.stolen,
                w.stats.failed,
                w.stats.deadline_missed,
                w.stats.busy_us / 1000.0,
                w.queue_len,
                if w.available { "" } else { " [unavailable]" },
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> EngineMetrics {
        EngineMetrics {
            submitted: 10,
            done: 6,
            failed: 1,
            deadline_missed: 1,
            evicted: 0,
            pending: 0,
            mean_latency_us: 2500.0,
            workers: vec![
                WorkerMetrics {
                    id: WorkerId(0),
                    device: DeviceKind::Cpu,
                    available: true,
                    queue_len: 0,
                    running: 0,
                    stats: WorkerStats {
                        executed: 2,
                        stolen: 1,
                        ..Default::default()
                    },
                },
                WorkerMetrics {
                    id: WorkerId(1),
                    device: DeviceKind::Gpu,
                    available: false,
                    queue_len: 2,
                    running: 1,
                    stats: WorkerStats {
                        executed: 6,
                        ..Default::default()
                    },
                },
            ],
        }
    }

    #[test]
    fn test_totals() {
        let m = metrics();
        assert_eq!(m.in_flight(), 2);
        assert_eq!(m.total_executed(), 8);
        assert_eq!(m.total_stolen(), 1);
        assert_eq!(m.utilization()[1], (WorkerId(1), 0.75));
    }

    #[test]
    fn test_summary() {
        let s = metrics().summary();
        assert!(s.contains("10 submitted"));
        assert!(s.contains("2.50ms"));
        assert!(s.contains("[unavailable]"));
        assert!(s.contains("worker#0"));
    }
}
