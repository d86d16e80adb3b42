// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic background jobs.
//!
//! Each job is an independent tokio task on a fixed interval, talking to the
//! core only through the storage and adapter interfaces, and stopping when
//! the shared [`CancellationToken`] fires. Job failures are logged and the
//! next tick tries again; no job failure is fatal to the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crosstalk_core::TrainableClassifier;
use crosstalk_storage::Database;
use crosstalk_storage::queries::intents;

use crate::delivery::DeliveryTracker;
use crate::dispatch::Dispatcher;
use crate::rollup::MetricsRollup;

/// Spawn the dispatch worker draining the outbound queue.
pub fn spawn_dispatch_worker(
    dispatcher: Arc<Dispatcher>,
    poll_interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        dispatcher.run(poll_interval, token).await;
    })
}

/// Spawn the sweep promoting due scheduled messages and releasing expired
/// dispatch locks.
pub fn spawn_dispatch_sweeper(
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("dispatch sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = dispatcher.sweep().await {
                        warn!(error = %e, "dispatch sweep failed");
                    }
                }
            }
        }
    })
}

/// Spawn the delivery-status reconciliation job.
pub fn spawn_reconciler(
    tracker: Arc<DeliveryTracker>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("delivery reconciler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = tracker.reconcile().await {
                        warn!(error = %e, "delivery reconciliation failed");
                    }
                }
            }
        }
    })
}

/// Spawn the periodic classifier retrain from stored intents.
///
/// Retrain failures keep the previous model; classification degrades to the
/// last good snapshot rather than erroring.
pub fn spawn_retrainer(
    db: Arc<Database>,
    classifier: Arc<dyn TrainableClassifier>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("classifier retrainer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match intents::list_intents(&db).await {
                        Ok(current) => classifier.retrain(&current),
                        Err(e) => warn!(error = %e, "could not load intents, keeping old model"),
                    }
                }
            }
        }
    })
}

/// Spawn the daily metrics rollup, recomputing yesterday on each tick.
pub fn spawn_metrics_rollup(
    rollup: Arc<MetricsRollup>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("metrics rollup stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let yesterday = chrono::Utc::now().date_naive() - chrono::Days::new(1);
                    if let Err(e) = rollup.rollup_day(yesterday).await {
                        warn!(error = %e, "metrics rollup failed");
                    }
                }
            }
        }
    })
}
