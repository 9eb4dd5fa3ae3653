// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # hetero-rt
//!
//! Command-line driver for the multi-device inference engine.
//!
//! ## Usage
//! ```bash
//! # Run a synthetic workload and print engine metrics
//! hetero-rt run --devices cpu,gpu --ops cpu+gpu,gpu,cpu --requests 64
//!
//! # Compare scheduling policies on the same workload
//! hetero-rt benchmark --schedulers round_robin,heft,shortest_expected_latency
//!
//! # Show how a model is partitioned under every preparation type
//! hetero-rt inspect --ops cpu,cpu+gpu,gpu,all
//!
//! # Print frequency and temperature readings
//! hetero-rt status
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hetero-rt",
    about = "Multi-device DNN inference scheduling engine",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides --devices).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Shape of the synthetic model and workload.
#[derive(Args, Clone)]
pub struct WorkloadArgs {
    /// Comma-separated worker devices, one worker each.
    #[arg(short, long, default_value = "cpu,gpu")]
    devices: String,

    /// Comma-separated operator support list, e.g. "cpu+gpu,gpu,all".
    #[arg(short, long, default_value = "all,all,gpu,all,cpu")]
    ops: String,

    /// Elements per tensor.
    #[arg(long, default_value_t = 16)]
    width: usize,

    /// Simulated per-operator latency in microseconds, e.g. "cpu=2000,gpu=500".
    #[arg(long, default_value = "cpu=2000,gpu=500")]
    op_latency: String,

    /// Number of requests to submit.
    #[arg(short = 'n', long, default_value_t = 32)]
    requests: usize,

    /// Per-request SLO in microseconds.
    #[arg(long)]
    slo_us: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic workload and print engine metrics.
    Run {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Scheduling policy (overrides the config file).
        #[arg(short, long)]
        scheduler: Option<String>,
    },

    /// Run the same workload under several scheduling policies.
    Benchmark {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Comma-separated policies to compare.
        #[arg(
            long,
            default_value = "round_robin,round_robin_idle,shortest_expected_latency,heft,heft_reserved,least_slack_time_first,thermal"
        )]
        schedulers: String,
    },

    /// Print the partition of a synthetic model for every preparation type.
    Inspect {
        /// Comma-separated operator support list.
        #[arg(short, long, default_value = "all,all,gpu,all,cpu")]
        ops: String,

        /// Devices the partition is computed for.
        #[arg(short, long, default_value = "cpu,gpu")]
        devices: String,

        /// Preferred operator count per unit subgraph.
        #[arg(long, default_value_t = 1)]
        min_size: usize,
    },

    /// Display device frequency and temperature readings.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            workload,
            scheduler,
        } => commands::run::execute(cli.config, workload, scheduler).await,
        Commands::Benchmark {
            workload,
            schedulers,
        } => commands::benchmark::execute(cli.config, workload, schedulers).await,
        Commands::Inspect {
            ops,
            devices,
            min_size,
        } => commands::inspect::execute(ops, devices, min_size).await,
        Commands::Status => commands::status::execute(cli.config).await,
    }
}
