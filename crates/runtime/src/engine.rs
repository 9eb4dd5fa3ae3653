// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine façade.
//!
//! ```text
//!  request_async ──▶ pending ──(pass)──▶ worker queues ──▶ worker threads
//!        ▲                ▲                                   │
//!        │                └──── next stage / device lost ─────┤
//!      wait ◀──────────── finished records ◀──────────────────┘
//! ```
//!
//! An [`Engine`] owns its worker threads, the planner thread (batched
//! mode) and the resource monitor. Dropping it stops them all and
//! terminates any job still in flight as `Failed`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cost_model::{unix_micros, CostModel};
use model_ir::{DeviceKind, DeviceSet, ModelGraph, ModelId, SubgraphKey, Validated};
use parking_lot::RwLock;
use partition_planner::{partition, PartitionPlan};
use resource_monitor::{MonitorSnapshot, ResourceMonitor};
use scheduler::{remaining_latency, JobId, WorkerId};
use tensor_core::Tensor;

use crate::backend::{BackendError, DeviceBackend, JobTensors};
use crate::config::PlanningMode;
use crate::job::Job;
use crate::planner::{run_planner, run_until_idle, Planner};
use crate::tracker::{Finished, JobTracker};
use crate::worker::{run_worker, Dispatch};
use crate::{
    EngineMetrics, JobError, JobRecord, JobStatus, RequestOptions, RuntimeConfig, RuntimeError,
};

/// Called with the final state of every job submitted with
/// [`RequestOptions::require_callback`].
pub type EndCallback = Arc<dyn Fn(JobId, JobStatus) + Send + Sync>;

/// A registered model.
pub(crate) struct ModelEntry {
    pub graph: ModelGraph<Validated>,
    pub plan: Arc<PartitionPlan>,
}

// ── Core ───────────────────────────────────────────────────────

/// State shared by the façade, the planner and every worker thread.
pub(crate) struct Core {
    pub config: RuntimeConfig,
    pub backend: Arc<dyn DeviceBackend>,
    pub cost: Arc<CostModel>,
    pub dispatch: Dispatch,
    pub planner: Planner,
    pub tracker: JobTracker,
    models: RwLock<HashMap<ModelId, Arc<ModelEntry>>>,
    plans: RwLock<HashMap<ModelId, Arc<PartitionPlan>>>,
    next_model: AtomicU32,
    on_end: RwLock<Option<EndCallback>>,
    shutdown: AtomicBool,
}

impl Core {
    fn new(config: RuntimeConfig, backend: Arc<dyn DeviceBackend>) -> Result<Self, RuntimeError> {
        let cost = Arc::new(CostModel::new(config.profile.cost_model_config())?);
        if let Some(path) = &config.profile.profile_path {
            if path.exists() {
                cost.load_profile(path)?;
            } else {
                tracing::info!("no profile at {} yet, starting cold", path.display());
            }
        }
        Ok(Self {
            backend,
            cost,
            dispatch: Dispatch::new(&config.worker),
            planner: Planner::new(&config.planner),
            tracker: JobTracker::new(
                config.planner.finished_record_capacity,
                config.planner.log_path.is_some(),
            ),
            models: RwLock::new(HashMap::new()),
            plans: RwLock::new(HashMap::new()),
            next_model: AtomicU32::new(0),
            on_end: RwLock::new(None),
            shutdown: AtomicBool::new(false),
            config,
        })
    }

    pub fn model(&self, id: ModelId) -> Option<Arc<ModelEntry>> {
        self.models.read().get(&id).cloned()
    }

    pub fn plans(&self) -> HashMap<ModelId, Arc<PartitionPlan>> {
        self.plans.read().clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Devices with at least one configured worker.
    fn worker_devices(&self) -> DeviceSet {
        self.config.worker.workers.iter().map(|w| w.device).collect()
    }

    fn available_devices(&self) -> DeviceSet {
        self.dispatch
            .snapshot(unix_micros())
            .iter()
            .filter(|w| w.available)
            .map(|w| w.device)
            .collect()
    }

    /// Triggers a planning pass: wakes the planner thread, or runs the pass
    /// inline in online mode.
    pub fn request_planning(&self) {
        if self.is_shutdown() {
            return;
        }
        match self.config.planner.planning_mode {
            PlanningMode::Batched => self.planner.wake(),
            PlanningMode::Online => run_until_idle(self),
        }
    }

    /// Hands jobs (back) to the planner.
    pub fn requeue(&self, jobs: Vec<Job>) {
        for job in &jobs {
            self.tracker.set_status(job.id, JobStatus::Queued);
        }
        self.planner.push(jobs);
        self.request_planning();
    }

    /// Finishes a job whose last stage just ran.
    pub fn complete(&self, mut job: Job, output_ids: &[usize]) {
        let outputs = output_ids.iter().filter_map(|&t| job.tensors.take(t)).collect();
        let id = job.id;
        if job.late {
            self.terminate(job, JobStatus::DeadlineMissed, Some(JobError::DeadlineMissed), outputs);
        } else {
            self.terminate(job, JobStatus::Done, None, outputs);
        }
        self.planner.forget(id);
    }

    /// Records the terminal state of `job` and releases its waiter.
    pub fn terminate(
        &self,
        mut job: Job,
        status: JobStatus,
        error: Option<JobError>,
        outputs: Vec<Tensor>,
    ) {
        let id = job.id;
        job.record.status = status;
        job.record.end_time_us = Some(unix_micros());
        match &error {
            Some(e) => tracing::debug!("{id} {status}: {e}"),
            None => tracing::debug!(
                "{id} {status} after {}us",
                job.record.latency_us().unwrap_or(0)
            ),
        }
        job.record.error = error;

        if job.options.require_callback {
            let callback = self.on_end.read().clone();
            if let Some(callback) = callback {
                callback(id, status);
            }
        }
        self.tracker.finish(job.record, outputs);
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// Multi-device inference engine.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use model_ir::{DeviceKind, DeviceSet, ModelGraph};
/// use runtime::{Engine, RequestOptions, RuntimeConfig, SimulatedBackend};
/// use tensor_core::{DType, TensorSpec};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RuntimeConfig::with_devices(&[DeviceKind::Cpu, DeviceKind::Gpu]);
/// let engine = Engine::new(config, Arc::new(SimulatedBackend::new()))?;
///
/// let spec = TensorSpec::new("x", DType::F32, vec![4]);
/// let graph = ModelGraph::sequential("chain", spec, &[DeviceSet::all(); 3]).validate()?;
/// let model = engine.register_model(graph)?;
///
/// let inputs = engine.create_input_tensors(model)?;
/// let mut outputs = engine.create_output_tensors(model)?;
/// engine.request_sync(model, inputs, &mut outputs, RequestOptions::default())?;
/// println!("{}", engine.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    core: Arc<Core>,
    threads: Vec<JoinHandle<()>>,
    monitor: Option<ResourceMonitor>,
}

impl Engine {
    /// Validates `config` and starts every worker thread, the planner thread
    /// (batched mode) and the resource monitor (when sensors or a profile
    /// path are configured).
    pub fn new(
        config: RuntimeConfig,
        backend: Arc<dyn DeviceBackend>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let mut engine = Engine {
            core: Arc::new(Core::new(config, backend)?),
            threads: Vec::new(),
            monitor: None,
        };
        let config = &engine.core.config;

        for (index, spec) in config.worker.workers.iter().enumerate() {
            for n in 0..spec.num_threads {
                let core = Arc::clone(&engine.core);
                let handle = thread::Builder::new()
                    .name(format!("worker-{index}-{n}"))
                    .spawn(move || run_worker(core, index))
                    .map_err(RuntimeError::Spawn)?;
                engine.threads.push(handle);
            }
        }

        if config.planner.planning_mode == PlanningMode::Batched {
            let core = Arc::clone(&engine.core);
            let wake = core.planner.receiver();
            let interval = Duration::from_millis(config.worker.availability_check_interval_ms);
            let handle = thread::Builder::new()
                .name("planner".into())
                .spawn(move || run_planner(core, wake, interval))
                .map_err(RuntimeError::Spawn)?;
            engine.threads.push(handle);
        }

        if let Some(monitor_config) = config.monitor_config() {
            let monitor = ResourceMonitor::start(monitor_config, Arc::clone(&engine.core.cost))?;
            engine.monitor = Some(monitor);
        }

        tracing::info!(
            "engine started on '{}' backend: {} workers, schedulers [{}], {:?} planning",
            engine.core.backend.name(),
            engine.core.config.worker.workers.len(),
            engine.core.planner.policy_names().join(", "),
            engine.core.config.planner.planning_mode,
        );
        Ok(engine)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.core.config
    }

    pub fn cost_model(&self) -> &Arc<CostModel> {
        &self.core.cost
    }

    /// Workers in id order.
    pub fn workers(&self) -> Vec<(WorkerId, DeviceKind)> {
        (0..self.core.dispatch.num_workers())
            .map(|i| self.core.dispatch.worker(i))
            .collect()
    }

    /// The first worker of `device`, for use as a target override.
    pub fn worker_for(&self, device: DeviceKind) -> Option<WorkerId> {
        self.core.dispatch.worker_for(device)
    }

    // ── Models ─────────────────────────────────────────────────

    /// Partitions `graph` for the configured workers and makes it
    /// available for requests.
    ///
    /// With online profiling enabled, every (subgraph, device) pair without
    /// a profile record is executed `num_warmups + num_runs` times and the
    /// mean of the timed runs seeds the cost model.
    pub fn register_model(&self, graph: ModelGraph<Validated>) -> Result<ModelId, RuntimeError> {
        let plan = partition(&graph, &self.core.config.subgraph, self.core.worker_devices())?;
        let id = ModelId(self.core.next_model.fetch_add(1, Ordering::Relaxed));
        let warm = self.core.cost.register_model(id, &graph.name);
        tracing::info!(
            "registered '{}' as {id}: {} subgraphs over {} units ({warm} profile records applied)",
            graph.name,
            plan.num_subgraphs(),
            plan.num_units(),
        );
        tracing::debug!("{}", plan.summary());

        if self.core.config.profile.online {
            self.profile_model(id, &graph, &plan);
        }

        let plan = Arc::new(plan);
        self.core.plans.write().insert(id, Arc::clone(&plan));
        self.core
            .models
            .write()
            .insert(id, Arc::new(ModelEntry { graph, plan }));
        Ok(id)
    }

    /// The partition plan of a registered model.
    pub fn plan(&self, model: ModelId) -> Result<Arc<PartitionPlan>, RuntimeError> {
        self.entry(model).map(|e| Arc::clone(&e.plan))
    }

    fn entry(&self, model: ModelId) -> Result<Arc<ModelEntry>, RuntimeError> {
        self.core.model(model).ok_or(RuntimeError::UnknownModel(model))
    }

    fn profile_model(&self, id: ModelId, graph: &ModelGraph<Validated>, plan: &PartitionPlan) {
        let devices = self.core.worker_devices();
        for sg in &plan.subgraphs {
            for device in sg.devices.intersection(devices).iter() {
                let key = SubgraphKey::new(id, sg.id);
                if self.core.cost.is_profiled(key, device) {
                    continue;
                }
                match self.profile_subgraph(graph, sg.ops.clone(), device) {
                    Ok(mean) => {
                        self.core.cost.seed(key, device, mean);
                        tracing::debug!("profiled {key} on {device}: {mean:.0}us");
                    }
                    Err(e) => tracing::warn!("profiling {key} on {device} failed: {e}"),
                }
            }
        }
    }

    fn profile_subgraph(
        &self,
        graph: &ModelGraph<Validated>,
        ops: Range<usize>,
        device: DeviceKind,
    ) -> Result<f64, BackendError> {
        let profile = &self.core.config.profile;
        let mut tensors = JobTensors::zeroed(graph);
        for _ in 0..profile.num_warmups {
            self.core
                .backend
                .execute(device, graph, ops.clone(), &mut tensors)?;
        }
        let runs = profile.num_runs.max(1);
        let mut total_us = 0.0;
        for _ in 0..runs {
            let timer = Instant::now();
            self.core
                .backend
                .execute(device, graph, ops.clone(), &mut tensors)?;
            total_us += timer.elapsed().as_secs_f64() * 1e6;
        }
        Ok(total_us / runs as f64)
    }

    // ── Tensors ────────────────────────────────────────────────

    /// Zeroed tensors matching the model's inputs, in binding order.
    pub fn create_input_tensors(&self, model: ModelId) -> Result<Vec<Tensor>, RuntimeError> {
        let entry = self.entry(model)?;
        Ok(entry.graph.input_specs().map(Tensor::from_spec).collect())
    }

    /// Zeroed tensors matching the model's outputs, in binding order.
    pub fn create_output_tensors(&self, model: ModelId) -> Result<Vec<Tensor>, RuntimeError> {
        let entry = self.entry(model)?;
        Ok(entry.graph.output_specs().map(Tensor::from_spec).collect())
    }

    // ── Requests ───────────────────────────────────────────────

    fn check_request(
        &self,
        model: ModelId,
        inputs: &[Tensor],
        options: &RequestOptions,
    ) -> Result<Arc<ModelEntry>, RuntimeError> {
        let entry = self.entry(model)?;
        let graph = &entry.graph;
        if inputs.len() != graph.inputs.len() {
            return Err(RuntimeError::InvalidRequest(format!(
                "'{}' takes {} inputs, got {}",
                graph.name,
                graph.inputs.len(),
                inputs.len()
            )));
        }
        for (tensor, spec) in inputs.iter().zip(graph.input_specs()) {
            tensor.matches(spec)?;
        }
        if let Some(scale) = options.slo_scale {
            if !(scale > 0.0 && scale.is_finite()) {
                return Err(RuntimeError::InvalidRequest(format!(
                    "slo_scale must be positive, got {scale}"
                )));
            }
        }
        Ok(entry)
    }

    fn build_job(
        &self,
        entry: &ModelEntry,
        model: ModelId,
        inputs: Vec<Tensor>,
        options: RequestOptions,
    ) -> Result<Job, RuntimeError> {
        let now = unix_micros();
        let deadline_us = match (options.slo_us, options.slo_scale) {
            (Some(slo), _) => Some(now + slo),
            (None, Some(scale)) => {
                let expected = remaining_latency(
                    &entry.plan,
                    model,
                    &self.core.cost,
                    self.core.available_devices(),
                    0,
                );
                expected.is_finite().then(|| now + (scale * expected) as u64)
            }
            (None, None) => None,
        };

        let mut tensors = JobTensors::new(entry.graph.tensors.len());
        for (tensor, &slot) in inputs.into_iter().zip(&entry.graph.inputs) {
            tensors
                .insert(slot, tensor)
                .map_err(|e| RuntimeError::InvalidRequest(e.to_string()))?;
        }
        let id = self.core.tracker.register();
        Ok(Job::new(id, model, options, tensors, now, deadline_us))
    }

    /// Submits one request and returns immediately.
    ///
    /// The inputs move into the job; they must match the model's input
    /// specs in binding order.
    pub fn request_async(
        &self,
        model: ModelId,
        inputs: Vec<Tensor>,
        options: RequestOptions,
    ) -> Result<JobId, RuntimeError> {
        let entry = self.check_request(model, &inputs, &options)?;
        let job = self.build_job(&entry, model, inputs, options)?;
        let id = job.id;
        tracing::debug!("submitted {id} for {model}");
        self.core.requeue(vec![job]);
        Ok(id)
    }

    /// Submits several requests in one go. Nothing is submitted unless every
    /// request is valid.
    pub fn request_async_batch(
        &self,
        models: &[ModelId],
        inputs: Vec<Vec<Tensor>>,
        options: Vec<RequestOptions>,
    ) -> Result<Vec<JobId>, RuntimeError> {
        if models.len() != inputs.len() || models.len() != options.len() {
            return Err(RuntimeError::InvalidRequest(format!(
                "batch of {} models with {} input sets and {} option sets",
                models.len(),
                inputs.len(),
                options.len()
            )));
        }
        let entries = models
            .iter()
            .zip(inputs.iter().zip(&options))
            .map(|(&m, (i, o))| self.check_request(m, i, o))
            .collect::<Result<Vec<_>, _>>()?;

        let mut jobs = Vec::with_capacity(models.len());
        let requests = entries.iter().zip(models).zip(inputs.into_iter().zip(options));
        for ((entry, &model), (inputs, options)) in requests {
            jobs.push(self.build_job(entry, model, inputs, options)?);
        }
        let ids: Vec<JobId> = jobs.iter().map(|j| j.id).collect();
        tracing::debug!("submitted batch of {} jobs", ids.len());
        self.core.requeue(jobs);
        Ok(ids)
    }

    /// [`request_async`](Self::request_async) followed by [`wait`](Self::wait).
    pub fn request_sync(
        &self,
        model: ModelId,
        inputs: Vec<Tensor>,
        outputs: &mut [Tensor],
        options: RequestOptions,
    ) -> Result<JobRecord, RuntimeError> {
        let id = self.request_async(model, inputs, options)?;
        self.wait(id, outputs)
    }

    // ── Completion ─────────────────────────────────────────────

    /// Current state of a job without blocking. `None` once the result was
    /// claimed or evicted.
    pub fn poll(&self, id: JobId) -> Option<JobStatus> {
        self.core.tracker.poll(id)
    }

    /// Blocks until `id` terminates and copies its outputs into `outputs`.
    ///
    /// Outputs are also copied for a job that ran past its deadline under
    /// the deprioritize policy, even though the call returns its
    /// `DeadlineMissed` error.
    ///
    /// A wrong number of `outputs` is rejected before the record is claimed,
    /// so the call can be retried.
    pub fn wait(&self, id: JobId, outputs: &mut [Tensor]) -> Result<JobRecord, RuntimeError> {
        let Finished {
            record,
            outputs: produced,
        } = self.core.tracker.wait_checked(id, |record| {
            let Some(entry) = self.core.model(record.model) else {
                return Ok(());
            };
            let expected = entry.graph.output_specs().count();
            if expected != outputs.len() {
                return Err(RuntimeError::InvalidRequest(format!(
                    "{} has {expected} outputs, {} tensors given",
                    record.model,
                    outputs.len()
                )));
            }
            Ok(())
        })?;
        if !produced.is_empty() {
            if produced.len() != outputs.len() {
                return Err(RuntimeError::InvalidRequest(format!(
                    "{id} produced {} outputs, {} tensors given",
                    produced.len(),
                    outputs.len()
                )));
            }
            for (dst, src) in outputs.iter_mut().zip(&produced) {
                dst.copy_from(src)?;
            }
        }
        into_result(record)
    }

    /// Blocks until `id` terminates and returns its output tensors.
    pub fn wait_outputs(&self, id: JobId) -> Result<Vec<Tensor>, RuntimeError> {
        claim_outputs(self.core.tracker.wait(id)?)
    }

    /// Blocks until every listed job terminated, then claims them in order.
    pub fn wait_batch(&self, ids: &[JobId]) -> Vec<Result<Vec<Tensor>, RuntimeError>> {
        self.core.tracker.wait_all(ids);
        ids.iter().map(|&id| self.wait_outputs(id)).collect()
    }

    /// Async counterpart of [`wait_outputs`](Self::wait_outputs); blocks a
    /// tokio blocking-pool thread instead of the caller.
    pub async fn wait_async(&self, id: JobId) -> Result<Vec<Tensor>, RuntimeError> {
        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || claim_outputs(core.tracker.wait(id)?))
            .await
            .map_err(|e| RuntimeError::WaitTask(e.to_string()))?
    }

    /// Registers the end-of-request callback, replacing any previous one.
    ///
    /// It runs on the thread that terminates the job and must not block.
    pub fn set_on_end_request(&self, callback: impl Fn(JobId, JobStatus) + Send + Sync + 'static) {
        *self.core.on_end.write() = Some(Arc::new(callback));
    }

    // ── Observability ──────────────────────────────────────────

    pub fn metrics(&self) -> EngineMetrics {
        let totals = self.core.tracker.totals();
        EngineMetrics {
            submitted: totals.submitted,
            done: totals.done,
            failed: totals.failed,
            deadline_missed: totals.deadline_missed,
            evicted: totals.evicted,
            pending: self.core.planner.pending_len(),
            mean_latency_us: if totals.done == 0 {
                0.0
            } else {
                totals.done_latency_us as f64 / totals.done as f64
            },
            workers: self.core.dispatch.metrics(),
        }
    }

    /// One sensor pass, when the resource monitor is running.
    pub fn monitor_snapshot(&self) -> Option<MonitorSnapshot> {
        self.monitor.as_ref().map(ResourceMonitor::poll_once)
    }
}

fn into_result(record: JobRecord) -> Result<JobRecord, RuntimeError> {
    match record.status {
        JobStatus::Done => Ok(record),
        status => Err(RuntimeError::Job {
            job_id: record.job_id,
            error: record
                .error
                .unwrap_or_else(|| JobError::ExecutionError(format!("terminated as {status}"))),
        }),
    }
}

fn claim_outputs(finished: Finished) -> Result<Vec<Tensor>, RuntimeError> {
    into_result(finished.record).map(|_| finished.outputs)
}

fn write_planner_log(path: &Path, records: &[JobRecord]) -> Result<(), RuntimeError> {
    let io_err = |source: std::io::Error| RuntimeError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    for record in records {
        serde_json::to_writer(&mut out, record).map_err(|e| io_err(e.into()))?;
        writeln!(out).map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

impl Drop for Engine {
    fn drop(&mut self) {
        let core = &self.core;
        core.shutdown.store(true, Ordering::Release);
        core.dispatch.shutdown();
        core.planner.wake();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("a runtime thread panicked");
            }
        }
        self.monitor.take();

        let mut unfinished = core.planner.drain();
        unfinished.extend(core.dispatch.drain());
        if !unfinished.is_empty() {
            tracing::info!("terminating {} unfinished jobs", unfinished.len());
        }
        for job in unfinished {
            core.terminate(job, JobStatus::Failed, Some(JobError::Shutdown), Vec::new());
        }

        if let Some(path) = &core.config.profile.profile_path {
            match core.cost.flush_profile(path) {
                Ok(n) => tracing::info!("appended {n} profile records to {}", path.display()),
                Err(e) => tracing::warn!("cannot flush profile: {e}"),
            }
        }
        if let Some(path) = &core.config.planner.log_path {
            let records = core.tracker.take_log();
            match write_planner_log(path, &records) {
                Ok(()) => tracing::info!("wrote {} job records to {}", records.len(), path.display()),
                Err(e) => tracing::warn!("cannot write planner log: {e}"),
            }
        }
        tracing::info!("engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedBackend;
    use tensor_core::{DType, Shape, TensorSpec};

    fn chain(len: usize) -> ModelGraph<Validated> {
        let spec = TensorSpec::new("x", DType::F32, vec![4]);
        ModelGraph::sequential("chain", spec, &vec![DeviceSet::all(); len])
            .validate()
            .unwrap()
    }

    fn engine() -> Engine {
        let mut config = RuntimeConfig::with_devices(&[DeviceKind::Cpu]);
        config.profile.online = false;
        Engine::new(config, Arc::new(SimulatedBackend::new())).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.worker.workers.clear();
        let err = Engine::new(config, Arc::new(SimulatedBackend::new()));
        assert!(matches!(err, Err(RuntimeError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_model() {
        let engine = engine();
        assert!(matches!(
            engine.create_input_tensors(ModelId(9)),
            Err(RuntimeError::UnknownModel(ModelId(9)))
        ));
        assert!(matches!(
            engine.request_async(ModelId(9), Vec::new(), RequestOptions::default()),
            Err(RuntimeError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_request_validation() {
        let engine = engine();
        let model = engine.register_model(chain(2)).unwrap();

        let err = engine.request_async(model, Vec::new(), RequestOptions::default());
        assert!(matches!(err, Err(RuntimeError::InvalidRequest(_))));

        let wrong = vec![Tensor::zeros(Shape::vector(5), DType::F32)];
        let err = engine.request_async(model, wrong, RequestOptions::default());
        assert!(matches!(err, Err(RuntimeError::TensorError(_))));

        let inputs = engine.create_input_tensors(model).unwrap();
        let err = engine.request_async(model, inputs, RequestOptions::new().with_slo_scale(-1.0));
        assert!(matches!(err, Err(RuntimeError::InvalidRequest(_))));
        assert_eq!(engine.metrics().submitted, 0);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let engine = engine();
        let model = engine.register_model(chain(1)).unwrap();
        let good = engine.create_input_tensors(model).unwrap();
        let err = engine.request_async_batch(
            &[model, model],
            vec![good, Vec::new()],
            vec![RequestOptions::default(); 2],
        );
        assert!(matches!(err, Err(RuntimeError::InvalidRequest(_))));
        assert_eq!(engine.metrics().submitted, 0);
    }

    #[test]
    fn test_sync_request_roundtrip() {
        let engine = engine();
        let model = engine.register_model(chain(3)).unwrap();
        let inputs = vec![Tensor::from_f32(Shape::vector(4), &[1.0, 2.0, 3.0, 4.0]).unwrap()];
        let mut outputs = engine.create_output_tensors(model).unwrap();
        let record = engine
            .request_sync(model, inputs, &mut outputs, RequestOptions::default())
            .unwrap();
        assert_eq!(record.status, JobStatus::Done);
        assert_eq!(outputs[0].to_f32_vec().unwrap(), vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(engine.poll(record.job_id), None);
    }

    #[test]
    fn test_online_profiling_seeds_cost_model() {
        let mut config = RuntimeConfig::with_devices(&[DeviceKind::Cpu, DeviceKind::Gpu]);
        config.profile.num_runs = 2;
        config.subgraph.minimum_subgraph_size = 1;
        let backend = Arc::new(SimulatedBackend::new());
        let engine = Engine::new(config, backend.clone()).unwrap();
        let model = engine.register_model(chain(2)).unwrap();
        let plan = engine.plan(model).unwrap();
        for sg in &plan.subgraphs {
            let key = SubgraphKey::new(model, sg.id);
            assert!(engine.cost_model().is_profiled(key, DeviceKind::Cpu));
            assert!(engine.cost_model().is_profiled(key, DeviceKind::Gpu));
        }
        let per_pair = 1 + 2;
        assert_eq!(backend.executions(DeviceKind::Gpu), (plan.num_subgraphs() * per_pair) as u64);
    }

    #[test]
    fn test_planner_log_written_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("planner.jsonl");
        let mut config = RuntimeConfig::with_devices(&[DeviceKind::Cpu]);
        config.profile.online = false;
        config.planner.log_path = Some(log.clone());
        {
            let engine = Engine::new(config, Arc::new(SimulatedBackend::new())).unwrap();
            let model = engine.register_model(chain(1)).unwrap();
            for _ in 0..2 {
                let inputs = engine.create_input_tensors(model).unwrap();
                let id = engine.request_async(model, inputs, RequestOptions::default()).unwrap();
                engine.wait_outputs(id).unwrap();
            }
        }
        let content = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "done");
        assert_eq!(lines[0]["stages"].as_array().unwrap().len(), 1);
    }
}
