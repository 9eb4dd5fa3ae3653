// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hetero-rt run` command: push a synthetic workload through one engine.

use std::path::PathBuf;

use anyhow::anyhow;
use scheduler::SchedulerType;

use crate::WorkloadArgs;

pub async fn execute(
    config: Option<PathBuf>,
    workload: WorkloadArgs,
    scheduler: Option<String>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           hetero-rt · Run                            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut config = super::load_config(config, &workload.devices)?;
    if let Some(name) = scheduler {
        let policy: SchedulerType = name
            .parse()
            .map_err(|e| anyhow!("invalid scheduler '{name}': {e}"))?;
        config = config.with_schedulers(&[policy]);
    }
    config.validate()?;

    let policies: Vec<&str> = config.planner.schedulers.iter().map(|s| s.as_str()).collect();
    println!("  Schedulers: {}", policies.join(", "));
    println!(
        "  Workers:    {}",
        config
            .worker
            .workers
            .iter()
            .map(|w| w.device.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Operators:  {}", workload.ops);
    println!("  Requests:   {}", workload.requests);
    println!();

    let report = super::run_workload(config, &workload).await?;

    // ── Results ────────────────────────────────────────────────
    println!("  Results");
    println!("   Succeeded:    {}", report.succeeded);
    println!("   Failed:       {}", report.failed);
    println!("   Wall time:    {:.2} ms", report.elapsed.as_secs_f64() * 1e3);
    println!("   Throughput:   {:.1} req/s", report.throughput());
    println!(
        "   Mean latency: {:.2} ms",
        report.metrics.mean_latency_us / 1e3
    );
    println!();

    println!("  Workers");
    for (id, share) in report.metrics.utilization() {
        println!("   {id}: {:>5.1}% busy", share * 100.0);
    }
    println!();
    println!("{}", report.metrics.summary());
    Ok(())
}
