//! Background sweeps for the in-process guards.
//!
//! Nothing runs until [`Sweeper::start`] is called; the returned
//! [`SweeperHandle`] stops every task on [`SweeperHandle::shutdown`].
//!
//! ```ignore
//! let handle = Sweeper::new()
//!     .with_task(rate_guard.clone(), Duration::from_secs(300))
//!     .with_task(ledger.clone(), Duration::from_secs(600))
//!     .start();
//!
//! wait_for_signal().await;
//! handle.shutdown(Duration::from_secs(5)).await?;
//! ```

use crate::activity::ActivityDetector;
use crate::ledger::{AttemptKey, LedgerEntry, OrderLedger, OrderRecord, PaymentAttemptLedger};
use crate::rate_limit::{RateGuard, RateKey, RateLimitRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clubpass_core::state_store::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// A periodic cleanup job.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Task name for logs and metric labels.
    fn name(&self) -> &'static str;

    /// Run one pass; returns how many entries were removed or changed.
    async fn sweep(&self) -> usize;
}

#[async_trait]
impl<S> Sweep for RateGuard<S>
where
    S: StateStore<RateKey, RateLimitRecord>,
{
    fn name(&self) -> &'static str {
        "rate_limits"
    }

    async fn sweep(&self) -> usize {
        Self::sweep(self)
    }
}

#[async_trait]
impl<S> Sweep for ActivityDetector<S>
where
    S: StateStore<String, Vec<DateTime<Utc>>>,
{
    fn name(&self) -> &'static str {
        "activity"
    }

    async fn sweep(&self) -> usize {
        Self::sweep(self)
    }
}

#[async_trait]
impl<S> Sweep for PaymentAttemptLedger<S>
where
    S: StateStore<AttemptKey, LedgerEntry>,
{
    fn name(&self) -> &'static str {
        "payment_attempts"
    }

    async fn sweep(&self) -> usize {
        let removed = Self::sweep(self);
        let stats = self.stats();
        info!(
            total = stats.total_attempts,
            pending = stats.pending_attempts,
            completed = stats.completed_payments,
            failed = stats.failed_attempts,
            recent = stats.recent_attempts,
            "Payment attempt statistics"
        );
        removed
    }
}

#[async_trait]
impl<S> Sweep for OrderLedger<S>
where
    S: StateStore<AttemptKey, OrderRecord>,
{
    fn name(&self) -> &'static str {
        "orders"
    }

    async fn sweep(&self) -> usize {
        Self::sweep(self)
    }
}

/// Builder for the set of periodic sweeps.
#[derive(Default)]
pub struct Sweeper {
    tasks: Vec<(Arc<dyn Sweep>, Duration)>,
}

impl Sweeper {
    /// Empty sweeper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `interval`, starting one interval after `start`.
    #[must_use]
    pub fn with_task(mut self, task: Arc<dyn Sweep>, interval: Duration) -> Self {
        self.tasks.push((task, interval));
        self
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn one tokio task per sweep.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, _) = broadcast::channel(1);

        let tasks = self
            .tasks
            .into_iter()
            .map(|(task, period)| {
                let name = task.name();
                let shutdown = shutdown_tx.subscribe();
                info!(task = name, interval = ?period, "Starting sweep task");
                (name, tokio::spawn(run(task, period, shutdown)))
            })
            .collect();

        SweeperHandle { shutdown_tx, tasks }
    }
}

async fn run(task: Arc<dyn Sweep>, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                let removed = task.sweep().await;
                metrics::counter!("clubpass_sweep_removed_total", "task" => task.name())
                    .increment(u64::try_from(removed).unwrap_or(u64::MAX));
                debug!(task = task.name(), removed, "Sweep completed");
            }
        }
    }
    debug!(task = task.name(), "Sweep task stopped");
}

/// Running sweeps.
pub struct SweeperHandle {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SweeperHandle {
    /// Number of running tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every task and wait for them to finish.
    ///
    /// # Errors
    ///
    /// Returns one message per task that panicked or did not stop within
    /// `timeout`; those still running are aborted.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), Vec<String>> {
        info!("Stopping {} sweep tasks (timeout: {:?})", self.tasks.len(), timeout);

        if self.shutdown_tx.send(()).is_err() {
            warn!("No sweep task was listening for shutdown");
        }

        let waits = self.tasks.into_iter().map(|(name, mut handle)| async move {
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(task = name, error = %e, "Sweep task failed");
                    Err(format!("{name}: {e}"))
                }
                Err(_) => {
                    handle.abort();
                    error!(task = name, "Sweep task shutdown timed out");
                    Err(format!("{name}: timeout after {timeout:?}"))
                }
            }
        });

        let errors: Vec<String> = futures::future::join_all(waits)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if errors.is_empty() {
            info!("All sweep tasks stopped");
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Sweep for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn sweep(&self) -> usize {
            self.runs.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test]
    async fn test_runs_periodically_and_stops() {
        let task = Arc::new(Counting {
            runs: AtomicUsize::new(0),
        });
        let handle = Sweeper::new()
            .with_task(task.clone(), Duration::from_millis(10))
            .start();
        assert_eq!(handle.task_count(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.shutdown(Duration::from_secs(1)).await.is_ok());

        let runs = task.runs.load(Ordering::SeqCst);
        assert!(runs >= 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), runs);
    }

    #[tokio::test]
    async fn test_nothing_runs_before_first_interval() {
        let task = Arc::new(Counting {
            runs: AtomicUsize::new(0),
        });
        let handle = Sweeper::new()
            .with_task(task.clone(), Duration::from_secs(60))
            .start();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 0);
        assert!(handle.shutdown(Duration::from_secs(1)).await.is_ok());
    }
}
