//! Background Flush Coordinator
//!
//! Periodically copies dirty summaries to the durable store.
//!
//! ## Responsibilities
//! - **Flushing**: snapshot each dirty key, encode it, `put` it, and clear the
//!   dirty flag only if nothing was inserted since the snapshot.
//! - **Retry**: a failed write is logged and the key stays dirty for the next pass.
//! - **Shutdown**: on the one-shot signal, stop scheduling passes, run one final
//!   pass, then publish `Stopped`.

use super::types::{FlushReport, FlushState};
use crate::error::{EngineError, Result};
use crate::storage::{DurableStore, SummarySnapshot, SummaryStore};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub struct FlushCoordinator {
    store: Arc<SummaryStore>,
    durable: Arc<dyn DurableStore>,
    interval: Duration,
    /// Held for the duration of a pass so two passes never interleave.
    pass_lock: Mutex<()>,
}

impl FlushCoordinator {
    pub fn new(
        store: Arc<SummaryStore>,
        durable: Arc<dyn DurableStore>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            durable,
            interval,
            pass_lock: Mutex::new(()),
        })
    }

    /// Runs one flush pass over the keys that are dirty right now.
    pub async fn flush_once(&self) -> FlushReport {
        let _pass = self.pass_lock.lock().await;
        let mut report = FlushReport::default();

        for key in self.store.list_dirty() {
            // the key was listed a moment ago; a miss means it was replaced
            let Ok(snapshot) = self.store.snapshot(&key) else {
                continue;
            };

            match self.persist(&key, &snapshot).await {
                Ok(()) => {
                    report.flushed += 1;
                    if !self.store.mark_clean(&key, snapshot.version) {
                        tracing::debug!("Key {:?} changed during flush, keeping it dirty", key);
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Failed to persist key {:?}: {}", key, e);
                }
            }
        }

        if report.flushed + report.failed > 0 {
            tracing::info!(
                "Flush pass: {} flushed, {} failed",
                report.flushed,
                report.failed
            );
        } else {
            tracing::debug!("Flush pass: nothing dirty");
        }
        report
    }

    async fn persist(&self, key: &str, snapshot: &SummarySnapshot) -> Result<()> {
        let bytes = snapshot.encode()?;
        self.durable.put(key, bytes).await
    }

    /// Starts the periodic loop on the runtime and returns its control handle.
    pub fn spawn(self: Arc<Self>) -> FlushHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(FlushState::Running);

        tracing::info!("Flush coordinator started (interval {:?})", self.interval);
        let task = tokio::spawn(async move { self.run(shutdown_rx, state_tx).await });

        FlushHandle {
            shutdown_tx,
            state_rx,
            task,
        }
    }

    async fn run(
        &self,
        mut shutdown_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<FlushState>,
    ) -> FlushReport {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                // a dropped handle counts as a shutdown request too
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
            }
        }

        state_tx.send_replace(FlushState::Draining);
        tracing::info!("Flush coordinator draining");

        let report = self.flush_once().await;
        if !report.is_clean() {
            tracing::error!(
                "Final flush left {} key(s) unpersisted",
                report.failed
            );
        }

        state_tx.send_replace(FlushState::Stopped);
        tracing::info!("Flush coordinator stopped");
        report
    }
}

/// Owner-side handle of a spawned [`FlushCoordinator`].
pub struct FlushHandle {
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<FlushState>,
    task: JoinHandle<FlushReport>,
}

impl FlushHandle {
    /// Delivers the shutdown signal. Only the first call has an effect;
    /// returns whether this call was the one that delivered it.
    pub fn shutdown(&self) -> bool {
        self.shutdown_tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn state(&self) -> FlushState {
        *self.state_rx.borrow()
    }

    /// Waits for the coordinator to reach `Stopped` and returns the report of
    /// its final pass. Does not send the signal itself.
    pub async fn stopped(self) -> Result<FlushReport> {
        self.task
            .await
            .map_err(|e| EngineError::PersistenceFailure(format!("flush task aborted: {}", e)))
    }
}
