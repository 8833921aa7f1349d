//! Trailing-window mean over a concurrent stream of integer samples

use crate::config::{AggregatorConfig, CollisionPolicy};
use crate::error::{AggregatorError, Result};
use crate::pruner::{self, PrunerHandle};
use crate::store::SampleStore;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

/// Helper to get current Unix timestamp in milliseconds
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// State shared between the aggregator and the worker tasks it spawns
struct Shared {
    store: SampleStore,
    window_ms: i64,
    collision_policy: CollisionPolicy,
    sequence: AtomicU64,
    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl Shared {
    fn compute_mean(&self) -> f64 {
        let now = (self.now_fn)();
        let cutoff = now.saturating_sub(self.window_ms);
        let totals = self.store.window_totals(cutoff);
        let mean = totals.mean();

        log::debug!(
            "Window mean: {} samples since {} (sum {}) -> {}",
            totals.count,
            cutoff,
            totals.sum,
            mean
        );

        mean
    }

    fn prune_expired(&self) -> usize {
        let cutoff = (self.now_fn)().saturating_sub(self.window_ms);
        let removed = self.store.prune_before(cutoff);
        if removed > 0 {
            log::debug!("Pruned {} samples older than {}", removed, cutoff);
        }
        removed
    }
}

/// Time-windowed streaming mean
///
/// Producers call [`accept`](Self::accept) from any thread. Consumers call
/// [`mean`](Self::mean), which returns at once and runs the aggregation on
/// the runtime's blocking pool. The result reflects whatever the store holds
/// when the worker scans it, not a snapshot taken at call time.
pub struct WindowedAggregator {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl WindowedAggregator {
    /// Create an aggregator with a five minute window and the system clock
    pub fn new(runtime: Handle) -> Self {
        Self::from_config(&AggregatorConfig::default(), runtime)
    }

    /// Create an aggregator from configuration
    ///
    /// The pruner is not started here; see [`spawn_pruner`](Self::spawn_pruner).
    pub fn from_config(config: &AggregatorConfig, runtime: Handle) -> Self {
        Self::with_timestamp_fn(config, runtime, Box::new(current_timestamp_ms))
    }

    /// Create an aggregator with a custom timestamp function
    ///
    /// Used for testing with deterministic timestamps.
    pub fn with_timestamp_fn(
        config: &AggregatorConfig,
        runtime: Handle,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: SampleStore::new(),
                window_ms: config.window_ms,
                collision_policy: config.collision_policy,
                sequence: AtomicU64::new(0),
                now_fn,
            }),
            runtime,
        }
    }

    /// Record a sample at the current time
    pub fn accept(&self, value: i32) {
        let shared = &self.shared;
        let now = (shared.now_fn)();
        let sequence = match shared.collision_policy {
            CollisionPolicy::Retain => shared.sequence.fetch_add(1, Ordering::Relaxed),
            CollisionPolicy::Overwrite => 0,
        };

        shared.store.insert((now, sequence), value);
        log::trace!("Accepted sample {} at {}", value, now);
    }

    /// Mean of the samples in the trailing window, computed on a worker
    ///
    /// Resolves to 0.0 when the window is empty. A runtime that can no longer
    /// run the task yields an error through the handle.
    pub fn mean(&self) -> MeanHandle {
        let shared = Arc::clone(&self.shared);
        let join = self.runtime.spawn_blocking(move || shared.compute_mean());

        MeanHandle {
            join,
            runtime: self.runtime.clone(),
        }
    }

    /// Same computation as [`mean`](Self::mean), on the calling thread
    pub fn mean_blocking(&self) -> f64 {
        self.shared.compute_mean()
    }

    /// Remove samples that have left the window, returning how many went
    pub fn prune_expired(&self) -> usize {
        self.shared.prune_expired()
    }

    /// Start a background task that prunes expired samples every `every`
    ///
    /// Intervals below [`MIN_PRUNE_INTERVAL`](crate::pruner::MIN_PRUNE_INTERVAL)
    /// are raised to it.
    pub fn spawn_pruner(&self, every: Duration) -> PrunerHandle {
        let shared = Arc::clone(&self.shared);
        pruner::spawn_pruner(&self.runtime, every, move || shared.prune_expired())
    }

    /// Number of samples currently held, including expired ones not yet pruned
    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }

    pub fn window_duration_ms(&self) -> i64 {
        self.shared.window_ms
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.shared.collision_policy
    }
}

/// Deferred result of [`WindowedAggregator::mean`]
///
/// Await it, or call [`wait`](Self::wait) from a thread outside the runtime.
/// Dropping the handle does not cancel the computation.
pub struct MeanHandle {
    join: JoinHandle<f64>,
    runtime: Handle,
}

impl MeanHandle {
    /// Block the current thread until the mean is available
    ///
    /// On a multi-thread runtime worker the wait goes through
    /// `block_in_place`. Any other runtime context (current-thread flavor)
    /// cannot block and returns [`AggregatorError::WaitInsideRuntime`].
    pub fn wait(self) -> Result<f64> {
        let runtime = self.runtime.clone();
        match Handle::try_current().map(|current| current.runtime_flavor()) {
            Err(_) => runtime.block_on(self),
            Ok(RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| runtime.block_on(self))
            }
            Ok(_) => Err(AggregatorError::WaitInsideRuntime),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Future for MeanHandle {
    type Output = Result<f64>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join).poll(cx).map(|res| {
            res.map_err(|e| {
                let err = AggregatorError::from(e);
                log::error!("Mean computation failed: {}", err);
                err
            })
        })
    }
}
