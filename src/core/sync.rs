//! Background cloud sync of unsynced transactions.
//!
//! The [`SyncCoordinator`] wakes up on a fixed timer, scans the ledger for records that
//! have not reached the remote store yet and pushes them concurrently, at most
//! `max_concurrent` at a time. A record is only flagged as synced after its remote
//! write succeeded; failures leave it for the next cycle and never stop the timer.
//!
//! Stopping the coordinator abandons remote writes that are still in flight. A write
//! that already succeeded always gets its `synced_with_cloud` flip committed before the
//! task exits, so no record is left half-updated.

use crate::{
    config::settings::SyncConfig,
    core::ledger::LedgerStore,
    entities::TransactionModel,
    errors::{Error, Result},
};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};

/// Remote endpoint that accepts transactions.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Writes one transaction remotely; `Ok` means the remote side acknowledged it.
    async fn push(&self, transaction: &TransactionModel) -> Result<()>;
}

/// Stand-in for the cloud backend: acknowledges every write after a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedRemote {
    latency: Duration,
}

impl SimulatedRemote {
    /// Creates a remote that answers after `latency`.
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl RemoteSync for SimulatedRemote {
    async fn push(&self, transaction: &TransactionModel) -> Result<()> {
        debug!("Simulating remote write for transaction {}", transaction.id);
        time::sleep(self.latency).await;
        Ok(())
    }
}

/// Where the coordinator currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Waiting for the next tick
    Idle,
    /// Reading unsynced records from the ledger
    Scanning,
    /// Remote writes in progress
    Syncing {
        /// Records picked up by this cycle
        pending: usize,
    },
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Unsynced records found by the scan
    pub attempted: usize,
    /// Records now flagged as synced
    pub synced: usize,
    /// Records whose remote write or flag update failed
    pub failed: usize,
    /// Records dropped because the coordinator was stopping
    pub abandoned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Synced,
    Failed,
    Abandoned,
}

/// Periodic scan-and-push loop over the ledger.
pub struct SyncCoordinator {
    store: Arc<LedgerStore>,
    remote: Arc<dyn RemoteSync>,
    settings: SyncConfig,
    phase: watch::Sender<SyncPhase>,
}

impl SyncCoordinator {
    /// Creates an idle coordinator; nothing runs until [`SyncCoordinator::start`].
    #[must_use]
    pub fn new(store: Arc<LedgerStore>, remote: Arc<dyn RemoteSync>, settings: SyncConfig) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            remote,
            settings,
            phase,
        }
    }

    /// Current phase of the coordinator.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Runs one full cycle right away, to completion.
    pub async fn run_cycle(&self) -> Result<SyncReport> {
        let (_keep_running, running) = watch::channel(false);
        let report = self.cycle(&running).await;
        self.phase.send_replace(SyncPhase::Idle);
        report
    }

    /// Spawns the timer loop. The first cycle starts immediately.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn start(self) -> SyncHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let phase = self.phase.subscribe();
        let task = tokio::spawn(self.run(shutdown_rx));
        SyncHandle {
            shutdown,
            phase,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.settings.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Sync coordinator started (every {:?}, up to {} concurrent writes)",
            self.settings.interval(),
            self.settings.max_concurrent
        );

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.cycle(&shutdown).await {
                        Ok(report) if report.attempted > 0 => info!(
                            "Sync cycle finished: {} synced, {} failed, {} abandoned of {}",
                            report.synced, report.failed, report.abandoned, report.attempted
                        ),
                        Ok(_) => debug!("Sync cycle found nothing to do"),
                        Err(e) => error!("Sync cycle failed: {}", e),
                    }
                    self.phase.send_replace(SyncPhase::Idle);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Sync coordinator stopped");
    }

    #[instrument(skip(self, shutdown))]
    async fn cycle(&self, shutdown: &watch::Receiver<bool>) -> Result<SyncReport> {
        self.phase.send_replace(SyncPhase::Scanning);
        let pending = self.store.query_unsynced().await?;
        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        info!("Syncing {} transactions", pending.len());
        let mut report = SyncReport {
            attempted: pending.len(),
            ..SyncReport::default()
        };
        self.phase.send_replace(SyncPhase::Syncing {
            pending: pending.len(),
        });

        // Each attempt runs as its own task so a panicking remote only fails its record.
        let outcomes: Vec<Outcome> = stream::iter(pending)
            .map(|tx| {
                let id = tx.id;
                let attempt = tokio::spawn(sync_one(
                    Arc::clone(&self.store),
                    Arc::clone(&self.remote),
                    tx,
                    shutdown.clone(),
                ));
                async move {
                    attempt.await.unwrap_or_else(|e| {
                        error!("Sync attempt for transaction {} ended abnormally: {}", id, e);
                        Outcome::Failed
                    })
                }
            })
            .buffer_unordered(self.settings.max_concurrent.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Synced => report.synced += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Abandoned => report.abandoned += 1,
            }
        }
        Ok(report)
    }
}

async fn sync_one(
    store: Arc<LedgerStore>,
    remote: Arc<dyn RemoteSync>,
    tx: TransactionModel,
    mut shutdown: watch::Receiver<bool>,
) -> Outcome {
    let id = tx.id;
    let pushed = tokio::select! {
        biased;
        () = stop_requested(&mut shutdown) => {
            debug!("Abandoning remote write for transaction {}", id);
            return Outcome::Abandoned;
        }
        result = remote.push(&tx) => result,
    };

    if let Err(e) = pushed {
        let e = match e {
            Error::Sync { .. } => e,
            other => Error::Sync {
                id,
                message: other.to_string(),
            },
        };
        warn!("{}; will retry next cycle", e);
        return Outcome::Failed;
    }

    // Runs to completion even when a stop was requested meanwhile.
    match store.mark_synced(id).await {
        Ok(_) => {
            debug!("Transaction {} synced", id);
            Outcome::Synced
        }
        Err(e) => {
            warn!("Could not mark transaction {} as synced: {}", id, e);
            Outcome::Failed
        }
    }
}

/// Resolves once a stop was requested or the handle is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}

/// Handle to a running coordinator, returned by [`SyncCoordinator::start`].
///
/// Dropping the handle without calling [`SyncHandle::stop`] also stops the loop, but
/// without waiting for it.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    phase: watch::Receiver<SyncPhase>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Current phase of the running coordinator.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Observes phase changes.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.clone()
    }

    /// Requests shutdown and waits until the loop has exited.
    pub async fn stop(self) {
        info!("Stopping sync coordinator");
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            error!("Sync coordinator task ended abnormally: {}", e);
        }
    }
}
