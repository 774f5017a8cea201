//! Bounded-concurrency worker pool for units of work.
//!
//! A fixed set of worker threads pulls units from a FIFO queue. Every unit
//! that starts yields exactly one [`CommandResult`]; a failing or panicking
//! unit never cancels its siblings. [`WorkerPool::halt`] stops scheduling of
//! queued units without interrupting the ones already running.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use segrecover_core::CommandResult;
use tracing::{debug, error, warn};

use crate::command::panic_message;

/// One schedulable piece of per-segment work.
pub trait UnitOfWork: Send {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Run to completion and report the outcome. Must not panic in normal
    /// operation; the pool still accounts for a unit that does.
    fn execute(&self) -> CommandResult;
}

/// Error returned when the pool no longer accepts work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("worker pool is halted or joined")]
pub struct PoolClosedError;

/// Pool metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Units waiting in the queue.
    pub queue_depth: usize,
    /// Units currently executing.
    pub active_units: usize,
    /// Units that produced a result.
    pub units_completed: u64,
    /// Units dropped from the queue by `halt()`.
    pub units_halted: usize,
    /// Number of worker threads.
    pub worker_count: usize,
}

struct PoolInner {
    queue: Mutex<VecDeque<Box<dyn UnitOfWork>>>,
    work_ready: Condvar,
    results: Mutex<Vec<CommandResult>>,
    closed: AtomicBool,
    halted: AtomicBool,
    active_units: AtomicUsize,
    units_completed: AtomicU64,
    units_halted: AtomicUsize,
}

/// A fixed-size pool executing units of work concurrently.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_workers: usize,
}

impl WorkerPool {
    /// Create a pool with `num_workers` threads (at least one).
    ///
    /// Workers are named `segrecover-worker-0`, `segrecover-worker-1`, etc.
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            results: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            active_units: AtomicUsize::new(0),
            units_completed: AtomicU64::new(0),
            units_halted: AtomicUsize::new(0),
        });

        let mut workers = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let inner_clone = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("segrecover-worker-{}", i))
                .spawn(move || worker_loop(&inner_clone))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        Self {
            inner,
            workers: Mutex::new(workers),
            num_workers,
        }
    }

    /// Queue a unit for execution.
    ///
    /// Returns `Err(PoolClosedError)` after `halt()` or `join()`.
    pub fn submit(&self, unit: Box<dyn UnitOfWork>) -> Result<(), PoolClosedError> {
        if self.inner.closed.load(Ordering::Acquire) || self.inner.halted.load(Ordering::Acquire) {
            return Err(PoolClosedError);
        }

        {
            let mut queue = self.inner.queue.lock();
            // Re-check under the lock so a concurrent halt cannot miss this unit.
            if self.inner.halted.load(Ordering::Acquire) {
                return Err(PoolClosedError);
            }
            queue.push_back(unit);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Stop scheduling queued units. In-flight units run to completion and
    /// still report their results. Idempotent.
    pub fn halt(&self) {
        let dropped = {
            let mut queue = self.inner.queue.lock();
            self.inner.halted.store(true, Ordering::Release);
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        self.inner.units_halted.fetch_add(dropped, Ordering::Relaxed);
        if dropped > 0 {
            warn!(target: "segrecover::pool", dropped, "Worker pool halted with queued units");
        }
        self.inner.work_ready.notify_all();
    }

    /// Whether `halt()` has been requested.
    pub fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::Acquire)
    }

    /// Block until every submitted unit has a result or was halted, stop the
    /// workers, and return all results in completion order.
    ///
    /// Later calls return an empty list.
    pub fn join(&self) -> Vec<CommandResult> {
        self.inner.closed.store(true, Ordering::Release);

        // Lock the queue before notifying to prevent lost-wakeup: a worker
        // between its closed check and condvar wait holds this lock.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }

        std::mem::take(&mut *self.inner.results.lock())
    }

    /// Number of units that produced a result so far.
    pub fn completed_count(&self) -> u64 {
        self.inner.units_completed.load(Ordering::Relaxed)
    }

    /// Number of queued units discarded by `halt()`.
    pub fn halted_count(&self) -> usize {
        self.inner.units_halted.load(Ordering::Relaxed)
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue.lock().len(),
            active_units: self.inner.active_units.load(Ordering::Relaxed),
            units_completed: self.completed_count(),
            units_halted: self.halted_count(),
            worker_count: self.num_workers,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.halt();
        self.join();
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let unit = {
            let mut queue = inner.queue.lock();
            loop {
                if inner.halted.load(Ordering::Acquire) {
                    return;
                }
                if let Some(unit) = queue.pop_front() {
                    inner.active_units.fetch_add(1, Ordering::Release);
                    break unit;
                }
                if inner.closed.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        debug!(target: "segrecover::pool", unit = unit.name(), "Executing unit");

        // Execute outside the lock. catch_unwind keeps a panicking unit from
        // killing the worker and still yields a result for it.
        let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unit.execute())) {
            Ok(result) => result,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(target: "segrecover::pool", unit = unit.name(), "unit panicked: {}", msg);
                CommandResult::new(1, "", format!("unit '{}' panicked: {}", unit.name(), msg))
            }
        };

        inner.results.lock().push(result);
        inner.units_completed.fetch_add(1, Ordering::Relaxed);
        inner.active_units.fetch_sub(1, Ordering::Release);
    }
}

/// Execute `units` with at most `concurrency` running at once and return one
/// result per unit, in completion order.
///
/// The worker count is `min(concurrency, units.len())`, and never zero for a
/// non-empty batch. An empty batch returns immediately.
pub fn submit_all(units: Vec<Box<dyn UnitOfWork>>, concurrency: usize) -> Vec<CommandResult> {
    if units.is_empty() {
        return Vec::new();
    }

    let pool = WorkerPool::new(concurrency.min(units.len()));
    for unit in units {
        let name = unit.name().to_string();
        if let Err(e) = pool.submit(unit) {
            // Unreachable for a private pool nobody else can halt.
            error!(target: "segrecover::pool", unit = %name, "{}", e);
        }
    }
    pool.join()
}
