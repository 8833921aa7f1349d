//! Background eviction of samples that have left the window
//!
//! The store never shrinks on its own. A pruner task calls back into the
//! aggregator on a fixed interval until it is shut down or its handle is
//! dropped.

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Shortest interval the pruner will run at
pub const MIN_PRUNE_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running pruner task
///
/// Dropping the handle closes the shutdown channel, which also stops the task.
pub struct PrunerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PrunerHandle {
    /// Signal the pruner to stop and wait for the task to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            log::warn!("Pruner task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn a task on `runtime` that runs `prune` every `every`
///
/// `prune` returns the number of samples it removed. Intervals shorter than
/// [`MIN_PRUNE_INTERVAL`] are raised to it.
pub(crate) fn spawn_pruner<F>(runtime: &Handle, every: Duration, prune: F) -> PrunerHandle
where
    F: Fn() -> usize + Send + 'static,
{
    let every = if every < MIN_PRUNE_INTERVAL {
        log::warn!(
            "Prune interval {:?} below minimum, using {:?}",
            every,
            MIN_PRUNE_INTERVAL
        );
        MIN_PRUNE_INTERVAL
    } else {
        every
    };

    let (tx, mut rx) = oneshot::channel::<()>();

    let task = runtime.spawn(async move {
        log::info!("Starting sample pruner (interval: {}ms)", every.as_millis());

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut total_removed = 0usize;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    total_removed += prune();
                }
                // Fires on an explicit shutdown and when the handle is dropped
                _ = &mut rx => {
                    break;
                }
            }
        }

        log::info!("Sample pruner stopped (removed {} samples)", total_removed);
    });

    PrunerHandle {
        shutdown: Some(tx),
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pruner_runs_until_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let pruner = spawn_pruner(&Handle::current(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        pruner.shutdown().await;

        let seen = calls.load(Ordering::SeqCst);
        assert!(seen >= 1, "pruner never ran");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen, "pruner kept running after shutdown");
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let pruner = spawn_pruner(&Handle::current(), Duration::ZERO, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pruner.is_finished(), "pruner task died");
        assert!(calls.load(Ordering::SeqCst) >= 1, "pruner never ran");

        pruner.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_pruner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let pruner = spawn_pruner(&Handle::current(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        });
        drop(pruner);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }
}
