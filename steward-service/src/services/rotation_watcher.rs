//! Periodic epoch-rotation task.
//!
//! This module provides [`rotation_watcher_task`], a task that can be spawned
//! to poll the epoch clock at a fixed interval and trigger a key reload
//! exactly when the calendar month changes.
//!
//! The epoch most recently applied successfully is owned by the task and
//! never shared; a failed reload leaves it untouched, so the next tick
//! re-attempts the same target epoch. The poll interval doubles as the retry
//! backoff, and there is no bound on retries: a permanently broken
//! provisioning input keeps the task polling and logging until it is
//! corrected and the process restarted.

use std::time::Duration;

use steward_types::EpochId;
use tokio_util::sync::CancellationToken;

use crate::metrics::{METRICS_KEY_ROTATION_FAILURE, METRICS_KEY_ROTATION_SUCCESS};
use crate::services::reload::ReloadCoordinator;

/// Background task that watches the epoch clock and cycles keys on epoch
/// transitions.
///
/// `clock` is consulted once per tick; pass [`EpochId::current`] in
/// production. `initial_epoch` is the epoch the mandatory startup load
/// already applied. The task runs until `cancellation_token` fires.
pub async fn rotation_watcher_task<C>(
    clock: C,
    coordinator: ReloadCoordinator,
    poll_interval: Duration,
    initial_epoch: EpochId,
    cancellation_token: CancellationToken,
) -> eyre::Result<()>
where
    C: Fn() -> EpochId + Send,
{
    let mut poll = tokio::time::interval(poll_interval);
    // the startup load already happened; skip the immediate first tick
    poll.tick().await;
    let mut active_epoch = initial_epoch;
    loop {
        tokio::select! {
            _ = poll.tick() => {}
            _ = cancellation_token.cancelled() => {
                tracing::info!("stopping rotation watcher");
                return Ok(());
            }
        }

        let target = clock();
        if target == active_epoch {
            continue;
        }

        tracing::info!("epoch changed from {active_epoch} to {target}; cycling keys");
        match coordinator.reload(target).await {
            Ok(()) => {
                metrics::counter!(METRICS_KEY_ROTATION_SUCCESS).increment(1);
                active_epoch = target;
                tracing::info!("keys cycled");
            }
            Err(err) => {
                metrics::counter!(METRICS_KEY_ROTATION_FAILURE).increment(1);
                tracing::error!(
                    "key reload for epoch {target} failed, retrying next poll: {err}"
                );
            }
        }
    }
}
