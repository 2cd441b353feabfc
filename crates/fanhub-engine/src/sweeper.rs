//! Reconciliation sweep that evicts silent clients.
//!
//! Every process runs the sweep loop against the shared store. A gate
//! check on the shared sweep stamp keeps the actual eviction work to
//! roughly one process per interval, and the store's optimistic
//! transaction resolves the races the gate lets through.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, warn};

use fanhub_core::config::engine::EngineConfig;
use fanhub_core::result::AppResult;
use fanhub_core::traits::store::PresenceStore;

use crate::metrics::EngineMetrics;

/// What a single sweep attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The gate check found a recent enough sweep stamp.
    Skipped,
    /// No client was stale; only the stamp advanced.
    Clean,
    /// This many stale clients were evicted.
    Evicted(usize),
    /// A concurrent writer voided the transaction; nothing was applied.
    Conflicted,
}

/// Run one sweep attempt at logical time `now` (epoch seconds).
///
/// Clients silent for more than twice `timeout` seconds are evicted
/// together with all their channel memberships, atomically with the
/// stamp advance. A lost race reports [`SweepOutcome::Conflicted`] and
/// is not an error; the next tick retries.
pub async fn sweep_once(
    store: &dyn PresenceStore,
    gc_interval: f64,
    timeout: f64,
    now: f64,
) -> AppResult<SweepOutcome> {
    if let Some(last) = store.last_sweep_at().await? {
        if now - last < gc_interval {
            return Ok(SweepOutcome::Skipped);
        }
    }

    let mut tx = store.begin_eviction().await?;
    let cutoff = now - 2.0 * timeout;

    let candidates = tx.stale_clients(cutoff).await?;
    if candidates.is_empty() {
        tx.abort().await?;
        store.mark_sweep(now).await?;
        return Ok(SweepOutcome::Clean);
    }

    let channels = tx.channels().await?;
    if tx.commit(&candidates, &channels, cutoff, now).await? {
        Ok(SweepOutcome::Evicted(candidates.len()))
    } else {
        Ok(SweepOutcome::Conflicted)
    }
}

/// Periodic sweep loop, cancelled via the engine's shutdown broadcast.
pub(crate) async fn run_sweeper(
    store: Arc<dyn PresenceStore>,
    config: EngineConfig,
    metrics: Arc<EngineMetrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let gc_interval = config.gc_interval_seconds as f64;
    let timeout = config.timeout_seconds as f64;
    let mut ticker = time::interval(Duration::from_secs(config.gc_interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let now = crate::engine::epoch_seconds();
                match sweep_once(store.as_ref(), gc_interval, timeout, now).await {
                    Ok(SweepOutcome::Skipped) => {}
                    Ok(SweepOutcome::Clean) => {
                        debug!("Sweep found no stale clients");
                    }
                    Ok(SweepOutcome::Evicted(count)) => {
                        debug!(count, "Sweep evicted stale clients");
                        metrics.sweeps_completed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        metrics.clients_evicted.fetch_add(count as u64, std::sync::atomic::Ordering::Relaxed);
                    }
                    Ok(SweepOutcome::Conflicted) => {
                        debug!("Sweep lost the race, retrying next tick");
                        metrics.sweeps_conflicted.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!(error = %e, "Sweep attempt failed");
                    }
                }
            }
        }
    }
}
