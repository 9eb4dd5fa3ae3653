// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hetero-rt benchmark` command: the same workload under several policies.
//!
//! Each policy gets a fresh engine, so cost estimates learned under one
//! policy never leak into the next.

use std::path::PathBuf;

use anyhow::anyhow;
use scheduler::SchedulerType;

use crate::WorkloadArgs;

struct BenchRow {
    scheduler: SchedulerType,
    succeeded: usize,
    failed: usize,
    missed: u64,
    stolen: u64,
    wall_ms: f64,
    mean_ms: f64,
    throughput: f64,
}

pub async fn execute(
    config: Option<PathBuf>,
    workload: WorkloadArgs,
    schedulers: String,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           hetero-rt · Benchmark Suite                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let policies: Vec<SchedulerType> = schedulers
        .split(',')
        .map(|s| {
            s.parse()
                .map_err(|e| anyhow!("invalid scheduler '{}': {e}", s.trim()))
        })
        .collect::<Result<_, _>>()?;
    let base = super::load_config(config, &workload.devices)?;

    println!("  Operators: {}", workload.ops);
    println!("  Requests:  {}", workload.requests);
    println!();
    println!(
        "  {:<28} {:>6} {:>6} {:>6} {:>6} {:>10} {:>10} {:>8}",
        "Scheduler", "Done", "Failed", "Missed", "Stolen", "Wall", "Mean", "Req/s",
    );
    println!("  {}", "-".repeat(88));

    let mut rows = Vec::new();
    for policy in policies {
        let config = base.clone().with_schedulers(&[policy]);
        match super::run_workload(config, &workload).await {
            Ok(report) => {
                let row = BenchRow {
                    scheduler: policy,
                    succeeded: report.succeeded,
                    failed: report.failed,
                    missed: report.metrics.deadline_missed,
                    stolen: report.metrics.total_stolen(),
                    wall_ms: report.elapsed.as_secs_f64() * 1e3,
                    mean_ms: report.metrics.mean_latency_us / 1e3,
                    throughput: report.throughput(),
                };
                println!(
                    "  {:<28} {:>6} {:>6} {:>6} {:>6} {:>8.2}ms {:>8.2}ms {:>8.1}",
                    row.scheduler.as_str(),
                    row.succeeded,
                    row.failed,
                    row.missed,
                    row.stolen,
                    row.wall_ms,
                    row.mean_ms,
                    row.throughput,
                );
                rows.push(row);
            }
            Err(e) => println!("  {:<28} FAILED: {e:#}", policy.as_str()),
        }
    }
    println!();

    // ── Summary ────────────────────────────────────────────────
    let Some(fastest) = rows
        .iter()
        .filter(|r| r.succeeded > 0)
        .max_by(|a, b| a.throughput.total_cmp(&b.throughput))
    else {
        println!("  No successful benchmark runs.");
        return Ok(());
    };
    println!(
        "  Highest throughput: {} ({:.1} req/s)",
        fastest.scheduler, fastest.throughput
    );
    if let Some(best) = rows
        .iter()
        .filter(|r| r.succeeded > 0)
        .min_by(|a, b| a.mean_ms.total_cmp(&b.mean_ms))
    {
        println!(
            "  Lowest mean latency: {} ({:.2} ms)",
            best.scheduler, best.mean_ms
        );
    }
    Ok(())
}
