//! The tracker actor: bounded ingress, one worker, durable flushes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use origin_core::{ChunkEvent, Error, Session, SessionSink, UaEnricher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::TrackerConfig;
use crate::store::SessionStore;

/// Interval between listener-count snapshots.
const SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

/// Tracks active sessions in memory and flushes completed sessions to the
/// sink when they become idle.
///
/// Many request handlers submit concurrently; a single worker task owns the
/// session store and performs every mutation and every sink write, so the
/// bounded ingress queue is the only synchronized object.
pub struct SessionTracker {
    ingress: Mutex<Option<mpsc::Sender<ChunkEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    sink: Arc<dyn SessionSink>,
    cancel: CancellationToken,
    drops: AtomicU64,
    flush_errors: Arc<AtomicU64>,
}

impl SessionTracker {
    /// Spawns the worker over an already-connected sink. Sink reachability is
    /// the adapter constructor's concern; nothing here fails.
    pub fn new(cfg: TrackerConfig, sink: Arc<dyn SessionSink>) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        let cancel = CancellationToken::new();
        let flush_errors = Arc::new(AtomicU64::new(0));

        let worker = tokio::spawn(run(
            rx,
            cfg,
            Arc::clone(&sink),
            cancel.clone(),
            Arc::clone(&flush_errors),
        ));

        Self {
            ingress: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            sink,
            cancel,
            drops: AtomicU64::new(0),
            flush_errors,
        }
    }

    /// Non-blocking enqueue, safe for concurrent use from request handlers.
    ///
    /// Returns `false` and counts the event as dropped when the ingress is
    /// full; returns `false` without counting once the tracker is shutting
    /// down. Never blocks.
    pub fn submit(&self, event: ChunkEvent) -> bool {
        let guard = self.ingress.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.drops.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Events dropped because the ingress was at capacity.
    pub fn dropped_count(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    /// Failed flush attempts; each counts a whole batch.
    pub fn flush_error_count(&self) -> u64 {
        self.flush_errors.load(Ordering::Relaxed)
    }

    /// Closes the ingress, waits for the worker to drain queued events and
    /// flush all remaining sessions, then releases the sink.
    ///
    /// If `deadline` elapses first, the in-flight sink call is cancelled to
    /// unblock a stuck copy, the worker is still awaited, and the sink is
    /// released. Idempotent.
    pub async fn shutdown(&self, deadline: Duration) {
        self.ingress.lock().take();

        let handle = self.worker.lock().take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(deadline, &mut handle).await.is_err() {
                self.cancel.cancel();
                let _ = handle.await;
            }
        }

        self.cancel.cancel();
        self.sink.close();
    }
}

/// The single worker that owns the session store.
///
/// Exactly one input is processed per iteration: an ingress event, a reaper
/// tick, or a sampling tick. The sink calls during reap, sample and the final
/// flush are the only places the worker can block on external I/O, and each
/// is raced against the cancellation token.
async fn run(
    mut events: mpsc::Receiver<ChunkEvent>,
    cfg: TrackerConfig,
    sink: Arc<dyn SessionSink>,
    cancel: CancellationToken,
    flush_errors: Arc<AtomicU64>,
) {
    let mut store = SessionStore::new();
    let enricher = UaEnricher::new();

    // First tick lands one period from now, not immediately.
    let mut reaper = interval_at(Instant::now() + cfg.reaper_interval, cfg.reaper_interval);
    reaper.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sampler = interval_at(Instant::now() + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
    sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => store.apply(event, &enricher),
                // Ingress closed and drained: flush whatever is left and exit.
                None => {
                    let remaining = store.drain();
                    flush_sessions(&*sink, &cancel, &flush_errors, &remaining).await;
                    return;
                }
            },

            _ = reaper.tick() => {
                let expired = store.reap(Utc::now(), &cfg);
                flush_sessions(&*sink, &cancel, &flush_errors, &expired).await;
            }

            _ = sampler.tick() => {
                let samples = store.sample(Utc::now(), &cfg);
                if samples.is_empty() {
                    continue;
                }
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(Error::Cancelled),
                    result = sink.copy_listener_counts(&samples) => result,
                };
                if let Err(e) = result {
                    flush_errors.fetch_add(1, Ordering::Relaxed);
                    error!(error = %e, rows = samples.len(), "failed to record listener totals");
                }
            }
        }
    }
}

/// Copies a batch of finished sessions, racing the shutdown token.
///
/// Failures drop the batch: the error is counted and logged, never retried.
async fn flush_sessions(
    sink: &dyn SessionSink,
    cancel: &CancellationToken,
    flush_errors: &AtomicU64,
    sessions: &[Session],
) {
    if sessions.is_empty() {
        return;
    }

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = sink.copy_sessions(sessions) => result,
    };

    match result {
        Ok(rows) => debug!(rows, "flushed sessions"),
        Err(e) => {
            flush_errors.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, count = sessions.len(), "failed to flush sessions");
        }
    }
}
