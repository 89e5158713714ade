//! # Worker Pools
//!
//! Bounded concurrency per concern. A [`WorkerPool`] admits up to
//! `concurrency` tasks at once and queues up to `queue_capacity` more. When
//! the queue is full a submitted task is not dropped: it runs immediately in
//! the submitting task without a permit, which slows the submitter down and
//! keeps memory bounded.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Sizing for one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
}

impl WorkerPoolConfig {
    pub fn new(concurrency: usize, queue_capacity: usize) -> Self {
        Self {
            concurrency,
            queue_capacity,
        }
    }
}

/// Point-in-time counters for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerPoolStats {
    pub name: String,
    pub concurrency: usize,
    pub active: usize,
    pub queued: usize,
    pub completed: u64,
    pub caller_runs: u64,
}

#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    config: WorkerPoolConfig,
    semaphore: Semaphore,
    queued: AtomicUsize,
    completed: AtomicU64,
    caller_runs: AtomicU64,
}

/// Decrements the queue depth when a waiting task is admitted or dropped
struct QueueSlot<'a>(&'a AtomicUsize);

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, config: WorkerPoolConfig) -> Self {
        let config = WorkerPoolConfig {
            concurrency: config.concurrency.max(1),
            queue_capacity: config.queue_capacity,
        };
        Self {
            name: name.into(),
            semaphore: Semaphore::new(config.concurrency),
            config,
            queued: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            caller_runs: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// Run `task` under this pool's concurrency bound
    pub async fn run<F: Future>(&self, task: F) -> F::Output {
        if let Ok(permit) = self.semaphore.try_acquire() {
            let output = task.await;
            drop(permit);
            self.completed.fetch_add(1, Ordering::Relaxed);
            return output;
        }

        let depth = self.queued.fetch_add(1, Ordering::AcqRel);
        let slot = QueueSlot(&self.queued);

        if depth >= self.config.queue_capacity {
            drop(slot);
            self.caller_runs.fetch_add(1, Ordering::Relaxed);
            warn!(
                pool = %self.name,
                queue_capacity = self.config.queue_capacity,
                "Pool queue full, running task in caller"
            );
            let output = task.await;
            self.completed.fetch_add(1, Ordering::Relaxed);
            return output;
        }

        debug!(pool = %self.name, queued = depth + 1, "Task queued for pool permit");
        let permit = self.semaphore.acquire().await;
        drop(slot);

        // The semaphore is never closed; a closed one degrades to caller-runs
        let output = task.await;
        drop(permit);
        self.completed.fetch_add(1, Ordering::Relaxed);
        output
    }

    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            name: self.name.clone(),
            concurrency: self.config.concurrency,
            active: self
                .config
                .concurrency
                .saturating_sub(self.semaphore.available_permits()),
            queued: self.queued.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Relaxed),
            caller_runs: self.caller_runs.load(Ordering::Relaxed),
        }
    }
}

/// The three pools the engine schedules work on
#[derive(Debug, Clone)]
pub struct WorkerPools {
    /// Catalog API calls: search and release detail
    pub catalog: Arc<WorkerPool>,
    /// Marketplace quotes and listing lookups
    pub marketplace: Arc<WorkerPool>,
    /// Everything else, such as collection lookups
    pub general: Arc<WorkerPool>,
}

impl WorkerPools {
    pub fn new(
        catalog: WorkerPoolConfig,
        marketplace: WorkerPoolConfig,
        general: WorkerPoolConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(WorkerPool::new("catalog", catalog)),
            marketplace: Arc::new(WorkerPool::new("marketplace", marketplace)),
            general: Arc::new(WorkerPool::new("general", general)),
        }
    }

    pub fn stats(&self) -> Vec<WorkerPoolStats> {
        vec![
            self.catalog.stats(),
            self.marketplace.stats(),
            self.general.stats(),
        ]
    }
}

impl Default for WorkerPools {
    fn default() -> Self {
        Self::new(
            WorkerPoolConfig::new(16, 256),
            WorkerPoolConfig::new(4, 256),
            WorkerPoolConfig::new(4, 256),
        )
    }
}
