// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Job ids, live states and finished records awaiting `wait`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use scheduler::JobId;
use tensor_core::Tensor;

use crate::{JobRecord, JobStatus, RuntimeError};

/// A terminated job as handed to its waiter.
#[derive(Debug)]
pub(crate) struct Finished {
    pub record: JobRecord,
    pub outputs: Vec<Tensor>,
}

/// Terminal-state counters since engine start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Totals {
    pub submitted: u64,
    pub done: u64,
    pub failed: u64,
    pub deadline_missed: u64,
    pub evicted: u64,
    pub done_latency_us: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    live: HashMap<JobId, JobStatus>,
    finished: HashMap<JobId, Finished>,
    /// Finish order, used to evict the oldest unclaimed record.
    order: VecDeque<JobId>,
    log: Vec<JobRecord>,
    totals: Totals,
}

/// Issues job ids and blocks waiters until their job terminates.
#[derive(Debug)]
pub(crate) struct JobTracker {
    next_id: AtomicU64,
    capacity: usize,
    keep_log: bool,
    state: Mutex<TrackerState>,
    finished: Condvar,
}

impl JobTracker {
    pub fn new(capacity: usize, keep_log: bool) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            capacity,
            keep_log,
            state: Mutex::new(TrackerState::default()),
            finished: Condvar::new(),
        }
    }

    /// Issues a fresh id and tracks it as `Queued`.
    pub fn register(&self) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state.lock();
        state.live.insert(id, JobStatus::Queued);
        state.totals.submitted += 1;
        id
    }

    pub fn set_status(&self, id: JobId, status: JobStatus) {
        if let Some(current) = self.state.lock().live.get_mut(&id) {
            *current = status;
        }
    }

    /// Stores a terminated job and wakes its waiter.
    pub fn finish(&self, record: JobRecord, outputs: Vec<Tensor>) {
        let id = record.job_id;
        let mut state = self.state.lock();
        state.live.remove(&id);
        match record.status {
            JobStatus::Done => {
                state.totals.done += 1;
                state.totals.done_latency_us += record.latency_us().unwrap_or(0);
            }
            JobStatus::DeadlineMissed => state.totals.deadline_missed += 1,
            _ => state.totals.failed += 1,
        }
        if self.keep_log {
            state.log.push(record.clone());
        }
        state.finished.insert(id, Finished { record, outputs });
        state.order.push_back(id);

        while state.finished.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            if state.finished.remove(&oldest).is_some() {
                state.totals.evicted += 1;
                tracing::warn!("evicted unclaimed result of {oldest}");
            }
        }
        drop(state);
        self.finished.notify_all();
    }

    /// Current state of `id` without blocking.
    pub fn poll(&self, id: JobId) -> Option<JobStatus> {
        let state = self.state.lock();
        state
            .live
            .get(&id)
            .copied()
            .or_else(|| state.finished.get(&id).map(|f| f.record.status))
    }

    /// Blocks until `id` terminates, then claims its record.
    pub fn wait(&self, id: JobId) -> Result<Finished, RuntimeError> {
        let mut state = self.state.lock();
        loop {
            if let Some(finished) = state.finished.remove(&id) {
                state.order.retain(|j| *j != id);
                return Ok(finished);
            }
            if !state.live.contains_key(&id) {
                return Err(RuntimeError::UnknownJob(id));
            }
            self.finished.wait(&mut state);
        }
    }

    /// Like [`wait`](Self::wait), but runs `check` on the record first and
    /// leaves it unclaimed when `check` fails.
    pub fn wait_checked(
        &self,
        id: JobId,
        check: impl FnOnce(&JobRecord) -> Result<(), RuntimeError>,
    ) -> Result<Finished, RuntimeError> {
        let mut state = self.state.lock();
        loop {
            if let Some(finished) = state.finished.get(&id) {
                check(&finished.record)?;
                break;
            }
            if !state.live.contains_key(&id) {
                return Err(RuntimeError::UnknownJob(id));
            }
            self.finished.wait(&mut state);
        }
        state.order.retain(|j| *j != id);
        state.finished.remove(&id).ok_or(RuntimeError::UnknownJob(id))
    }

    /// Blocks until every id in `ids` terminated or is unknown.
    pub fn wait_all(&self, ids: &[JobId]) {
        let mut state = self.state.lock();
        while ids.iter().any(|id| state.live.contains_key(id)) {
            self.finished.wait(&mut state);
        }
    }

    pub fn totals(&self) -> Totals {
        self.state.lock().totals
    }

    /// Records of every job finished so far, for the planner log.
    pub fn take_log(&self) -> Vec<JobRecord> {
        std::mem::take(&mut self.state.lock().log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use model_ir::ModelId;

    fn done(id: JobId) -> JobRecord {
        let mut record = JobRecord::new(id, ModelId(0), 0);
        record.status = JobStatus::Done;
        record.end_time_us = Some(100);
        record
    }

    #[test]
    fn test_ids_are_monotonic() {
        let tracker = JobTracker::new(10, false);
        let a = tracker.register();
        let b = tracker.register();
        assert!(b > a);
        assert_eq!(tracker.poll(a), Some(JobStatus::Queued));
        assert_eq!(tracker.totals().submitted, 2);
    }

    #[test]
    fn test_wait_blocks_until_finish() {
        let tracker = Arc::new(JobTracker::new(10, false));
        let id = tracker.register();
        let t = Arc::clone(&tracker);
        let handle = thread::spawn(move || t.wait(id).map(|f| f.record.status));
        thread::sleep(Duration::from_millis(20));
        tracker.finish(done(id), Vec::new());
        assert_eq!(handle.join().unwrap().unwrap(), JobStatus::Done);
    }

    #[test]
    fn test_record_is_claimed_once() {
        let tracker = JobTracker::new(10, false);
        let id = tracker.register();
        tracker.finish(done(id), Vec::new());
        assert_eq!(tracker.poll(id), Some(JobStatus::Done));
        assert!(tracker.wait(id).is_ok());
        assert!(matches!(tracker.wait(id), Err(RuntimeError::UnknownJob(_))));
        assert_eq!(tracker.poll(id), None);
    }

    #[test]
    fn test_failed_check_leaves_record_unclaimed() {
        let tracker = JobTracker::new(10, false);
        let id = tracker.register();
        tracker.finish(done(id), Vec::new());
        let rejected = tracker.wait_checked(id, |_| {
            Err(RuntimeError::InvalidRequest("wrong output count".into()))
        });
        assert!(matches!(rejected, Err(RuntimeError::InvalidRequest(_))));
        assert_eq!(tracker.poll(id), Some(JobStatus::Done));

        let finished = tracker.wait_checked(id, |record| {
            assert_eq!(record.job_id, id);
            Ok(())
        });
        assert!(finished.is_ok());
        assert_eq!(tracker.poll(id), None);
    }

    #[test]
    fn test_oldest_unclaimed_record_is_evicted() {
        let tracker = JobTracker::new(2, false);
        let ids: Vec<JobId> = (0..3).map(|_| tracker.register()).collect();
        for id in &ids {
            tracker.finish(done(*id), Vec::new());
        }
        assert!(matches!(tracker.wait(ids[0]), Err(RuntimeError::UnknownJob(_))));
        assert!(tracker.wait(ids[1]).is_ok());
        assert!(tracker.wait(ids[2]).is_ok());
        assert_eq!(tracker.totals().evicted, 1);
    }

    #[test]
    fn test_log_keeps_every_finished_record() {
        let tracker = JobTracker::new(1, true);
        for _ in 0..3 {
            let id = tracker.register();
            tracker.finish(done(id), Vec::new());
        }
        assert_eq!(tracker.take_log().len(), 3);
        assert!(tracker.take_log().is_empty());
        assert_eq!(tracker.totals().done, 3);
    }
}
