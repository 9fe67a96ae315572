//! Background refresh loop.
//!
//! The loop owns the only path that calls [`Collector::build`]. Builds run on
//! the blocking pool so the interactive task never waits on procfs reads, and
//! finished snapshots are published through a single-slot `watch` channel:
//! readers clone the current `Arc<Snapshot>` and never observe a partial one.

use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::collector::Collector;
use super::procfs::CounterSource;
use super::snapshot::Snapshot;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(2);
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

pub type SharedCollector<S> = Arc<Mutex<Collector<S>>>;

pub struct RefreshScheduler<S> {
    collector: SharedCollector<S>,
    interval: Duration,
}

impl<S: CounterSource + Send + 'static> RefreshScheduler<S> {
    pub fn new(collector: Collector<S>, interval: Duration) -> Self {
        RefreshScheduler {
            collector: Arc::new(Mutex::new(collector)),
            interval: interval.max(MIN_REFRESH_INTERVAL),
        }
    }

    pub fn collector(&self) -> SharedCollector<S> {
        Arc::clone(&self.collector)
    }

    /// Starts the loop on the current runtime. The first refresh happens
    /// immediately.
    pub fn spawn(self) -> (RefreshHandle, JoinHandle<()>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::empty()));
        let (interval_tx, interval_rx) = watch::channel(self.interval);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(run_loop(
            self.collector,
            snapshot_tx,
            interval_rx,
            Arc::clone(&refresh),
            shutdown_rx,
        ));

        let handle = RefreshHandle {
            snapshots: snapshot_rx,
            interval: interval_tx,
            refresh,
            shutdown: shutdown_tx,
        };
        (handle, task)
    }
}

/// Consumer side of a running scheduler.
pub struct RefreshHandle {
    snapshots: watch::Receiver<Arc<Snapshot>>,
    interval: watch::Sender<Duration>,
    refresh: Arc<Notify>,
    shutdown: watch::Sender<bool>,
}

impl RefreshHandle {
    /// Latest published snapshot; never blocks on the producer.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    pub fn refresh_interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// Returns the interval actually applied after clamping.
    pub fn set_refresh_interval(&self, interval: Duration) -> Duration {
        let interval = interval.max(MIN_REFRESH_INTERVAL);
        self.interval.send_replace(interval);
        interval
    }

    /// Asks for a refresh as soon as possible. Requests made while one is
    /// pending collapse into a single refresh.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// The loop exits after the refresh in flight, if any.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Shuts down and waits for `task` to finish. A panic in the loop is
    /// logged and reported as `false`.
    pub async fn stop(&self, task: JoinHandle<()>) -> bool {
        self.shutdown();
        match task.await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "refresh loop panicked");
                false
            }
        }
    }
}

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_loop<S: CounterSource + Send + 'static>(
    collector: SharedCollector<S>,
    snapshots: watch::Sender<Arc<Snapshot>>,
    mut interval: watch::Receiver<Duration>,
    refresh: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = *interval.borrow_and_update();
    info!(interval_ms = period.as_millis() as u64, "refresh loop started");
    let mut ticks = ticker(Instant::now(), period);

    loop {
        tokio::select! {
            _ = ticks.tick() => {}
            _ = refresh.notified() => ticks.reset(),
            changed = interval.changed() => {
                if changed.is_err() {
                    break;
                }
                let period = *interval.borrow_and_update();
                debug!(interval_ms = period.as_millis() as u64, "refresh interval changed");
                ticks = ticker(Instant::now() + period, period);
                continue;
            }
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        match build_once(&collector).await {
            Some(snapshot) => {
                snapshots.send_replace(Arc::new(snapshot));
            }
            None => debug!("refresh skipped, collector busy"),
        }
    }

    info!("refresh loop stopped");
}

/// Runs one build on the blocking pool, or returns `None` if another build
/// holds the collector.
async fn build_once<S: CounterSource + Send + 'static>(
    collector: &SharedCollector<S>,
) -> Option<Snapshot> {
    let collector = Arc::clone(collector);
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = match collector.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(guard.build())
    })
    .await;

    match result {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(error = %err, "snapshot build panicked");
            None
        }
    }
}
