// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for request round trips and batched planning passes.
//!
//! The simulated backend runs with zero per-op latency, so the numbers are
//! dominated by partition lookup, policy decisions and queue handoff.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use model_ir::{DeviceKind, DeviceSet, ModelGraph, ModelId};
use runtime::{Engine, RequestOptions, RuntimeConfig, SchedulerType, SimulatedBackend};
use tensor_core::{DType, TensorSpec};

fn engine(scheduler: SchedulerType) -> (Engine, ModelId) {
    let mut config = RuntimeConfig::with_devices(&[DeviceKind::Cpu, DeviceKind::Gpu])
        .with_schedulers(&[scheduler]);
    config.subgraph.minimum_subgraph_size = 1;
    config.profile.online = false;

    let engine = Engine::new(config, Arc::new(SimulatedBackend::new())).unwrap();
    let supports = [
        DeviceSet::all(),
        DeviceSet::only(DeviceKind::Gpu),
        DeviceSet::all(),
        DeviceSet::only(DeviceKind::Cpu),
    ];
    let graph = ModelGraph::sequential("bench", TensorSpec::new("x", DType::F32, vec![64]), &supports)
        .validate()
        .unwrap();
    let model = engine.register_model(graph).unwrap();
    (engine, model)
}

fn bench_request_sync(c: &mut Criterion) {
    let (engine, model) = engine(SchedulerType::Heft);
    let mut outputs = engine.create_output_tensors(model).unwrap();
    c.bench_function("request_sync/heft", |b| {
        b.iter(|| {
            let inputs = engine.create_input_tensors(model).unwrap();
            engine
                .request_sync(model, inputs, &mut outputs, RequestOptions::default())
                .unwrap()
        })
    });
}

fn bench_batch(c: &mut Criterion) {
    const BATCH: usize = 64;
    let mut group = c.benchmark_group("request_batch");
    group.throughput(Throughput::Elements(BATCH as u64));

    for scheduler in [
        SchedulerType::RoundRobin,
        SchedulerType::ShortestExpectedLatency,
        SchedulerType::Heft,
        SchedulerType::LeastSlackTimeFirst,
    ] {
        let (engine, model) = engine(scheduler);
        group.bench_with_input(
            BenchmarkId::from_parameter(scheduler.as_str()),
            &scheduler,
            |b, _| {
                b.iter(|| {
                    let inputs = (0..BATCH)
                        .map(|_| engine.create_input_tensors(model).unwrap())
                        .collect();
                    let ids = engine
                        .request_async_batch(
                            &[model; BATCH],
                            inputs,
                            vec![RequestOptions::default(); BATCH],
                        )
                        .unwrap();
                    engine.wait_batch(&ids)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_request_sync, bench_batch);
criterion_main!(benches);
