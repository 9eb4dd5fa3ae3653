// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the helpers they share.

pub mod benchmark;
pub mod inspect;
pub mod run;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use model_ir::{DeviceKind, DeviceSet, ModelGraph, ModelId, Validated};
use runtime::{Engine, EngineMetrics, RequestOptions, RuntimeConfig, SimulatedBackend};
use tensor_core::{DType, TensorSpec};
use tracing_subscriber::EnvFilter;

use crate::WorkloadArgs;

/// Installs the global subscriber. `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn parse_devices(list: &str) -> anyhow::Result<Vec<DeviceKind>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<DeviceKind>()
                .map_err(|e| anyhow!("invalid device '{}': {e}", s.trim()))
        })
        .collect()
}

/// Parses "cpu+gpu,gpu,all" into one device set per operator.
pub fn parse_ops(list: &str) -> anyhow::Result<Vec<DeviceSet>> {
    list.split(',')
        .map(|token| {
            let token = token.trim();
            if token.eq_ignore_ascii_case("all") {
                return Ok(DeviceSet::all());
            }
            let mut set = DeviceSet::empty();
            for name in token.split('+') {
                let device = name
                    .parse::<DeviceKind>()
                    .map_err(|e| anyhow!("invalid operator support '{token}': {e}"))?;
                set.insert(device);
            }
            Ok(set)
        })
        .collect()
}

pub fn synthetic_model(ops: &str, width: usize) -> anyhow::Result<ModelGraph<Validated>> {
    let supports = parse_ops(ops)?;
    let spec = TensorSpec::new("x", DType::F32, vec![width]);
    let graph = ModelGraph::sequential("synthetic", spec, &supports)
        .validate()
        .context("synthetic model is invalid")?;
    Ok(graph)
}

/// Loads `--config` when given, otherwise one worker per `--devices` entry.
pub fn load_config(path: Option<PathBuf>, devices: &str) -> anyhow::Result<RuntimeConfig> {
    let config = match path {
        Some(path) => RuntimeConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RuntimeConfig::with_devices(&parse_devices(devices)?),
    };
    Ok(config)
}

pub fn simulated_backend(op_latency: &str) -> anyhow::Result<Arc<SimulatedBackend>> {
    let backend = SimulatedBackend::new();
    for entry in op_latency.split(',').filter(|s| !s.trim().is_empty()) {
        let (device, micros) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("expected device=micros, got '{entry}'"))?;
        let device = device
            .parse::<DeviceKind>()
            .map_err(|e| anyhow!("invalid device in '{entry}': {e}"))?;
        let micros: u64 = micros
            .trim()
            .parse()
            .with_context(|| format!("invalid latency in '{entry}'"))?;
        backend.set_op_latency(device, Duration::from_micros(micros));
    }
    Ok(Arc::new(backend))
}

// ── Workload ───────────────────────────────────────────────────

pub struct WorkloadReport {
    pub elapsed: Duration,
    pub succeeded: usize,
    pub failed: usize,
    pub metrics: EngineMetrics,
}

impl WorkloadReport {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.succeeded as f64 / secs
        } else {
            0.0
        }
    }
}

/// Builds an engine, registers the synthetic model and pushes the whole
/// workload through it as one batch.
pub async fn run_workload(
    config: RuntimeConfig,
    args: &WorkloadArgs,
) -> anyhow::Result<WorkloadReport> {
    let backend = simulated_backend(&args.op_latency)?;
    let engine = Engine::new(config, backend).context("starting engine")?;
    let model = engine.register_model(synthetic_model(&args.ops, args.width)?)?;
    submit(&engine, model, args).await
}

async fn submit(
    engine: &Engine,
    model: ModelId,
    args: &WorkloadArgs,
) -> anyhow::Result<WorkloadReport> {
    let mut options = RequestOptions::new();
    if let Some(slo) = args.slo_us {
        options = options.with_slo_us(slo);
    }
    let inputs = (0..args.requests)
        .map(|_| engine.create_input_tensors(model))
        .collect::<Result<Vec<_>, _>>()?;

    let start = Instant::now();
    let ids = engine.request_async_batch(
        &vec![model; args.requests],
        inputs,
        vec![options; args.requests],
    )?;
    let mut succeeded = 0;
    let mut failed = 0;
    for id in ids {
        match engine.wait_async(id).await {
            Ok(_) => succeeded += 1,
            Err(e) => {
                tracing::debug!("{e}");
                failed += 1;
            }
        }
    }
    Ok(WorkloadReport {
        elapsed: start.elapsed(),
        succeeded,
        failed,
        metrics: engine.metrics(),
    })
}
