//! Background refresh: resolves pending updates against the external rate
//! API and applies the results in one batch.
//!
//! One run is a pipeline: pending rows fan in to a unique-pair set, the
//! pair set projects to unique bases, a bounded worker pool fetches each
//! base once, and the engine composes and persists the batch after all
//! workers are done.

use crate::cache::RateUpdateCache;
use crate::db::repo::{RateUpdateRepository, RepoError};
use crate::domain::{AppliedRateUpdate, PendingRateUpdate, RatePair};
use crate::ratesapi::RateClient;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

const NUM_WORKERS: usize = 5;
const PER_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to get pending rates: {0}")]
    Pending(#[source] RepoError),
    #[error("failed to update rates: {0}")]
    Apply(#[source] RepoError),
}

/// One fetched value for a pair in the unique set.
#[derive(Debug, Clone, PartialEq)]
struct RateSample {
    pair: RatePair,
    value: f64,
}

/// Runs one refresh pass. Returns the number of updates applied.
///
/// Upstream failures never fail the run: an unfetchable base leaves its
/// pairs pending for the next tick. Only repository failures propagate.
pub async fn update_pending_rates(
    shutdown: watch::Receiver<bool>,
    exec_id: Uuid,
    update_repo: &RateUpdateRepository,
    client: Arc<dyn RateClient>,
    cache: &dyn RateUpdateCache,
) -> Result<usize, RefreshError> {
    let pending = update_repo
        .get_pending()
        .await
        .map_err(RefreshError::Pending)?;

    if pending.is_empty() {
        info!(%exec_id, "nothing to update this time");
        return Ok(0);
    }

    info!(%exec_id, pending = pending.len(), "pending rates found, start updating");

    let pairs = unique_pairs(&pending);
    let values = fetch_pair_values(shutdown, client, pairs).await;

    let mut to_apply = Vec::with_capacity(pending.len());
    let mut updated_pairs = Vec::with_capacity(pending.len());

    for update in &pending {
        let pair = update.pair();

        let value = if let Some(v) = values.get(&pair).copied().filter(|v| *v > 0.0) {
            v
        } else if let Some(v) = values.get(&pair.reversed()).copied().filter(|v| *v > 0.0) {
            // The reverse pair was fetched instead; its value is reciprocal.
            1.0 / v
        } else {
            warn!(%exec_id, pair = %pair, "skipping update, it'll be processed next time");
            continue;
        };

        to_apply.push(AppliedRateUpdate {
            update_id: update.update_id,
            pair_id: update.pair_id,
            value,
        });
        updated_pairs.push(pair);
    }

    if to_apply.is_empty() {
        return Ok(0);
    }

    update_repo
        .apply_updates(&to_apply)
        .await
        .map_err(RefreshError::Apply)?;

    // A schedule request racing this invalidation may still read the old
    // cached id; it resolves to the just-applied update, which is a correct
    // answer for that caller.
    cache.clean_batch(&updated_pairs);

    info!(%exec_id, updated = updated_pairs.len(), "pending rates successfully updated");
    Ok(updated_pairs.len())
}

/// Collapses pending updates into a set of pairs to fetch, skipping a pair
/// whose reverse is already present: the reverse fetch yields a value this
/// pair can be derived from by inversion.
fn unique_pairs(pending: &[PendingRateUpdate]) -> HashSet<RatePair> {
    let mut pairs = HashSet::with_capacity(pending.len());
    for update in pending {
        let pair = update.pair();
        if pairs.contains(&pair.reversed()) {
            continue;
        }
        pairs.insert(pair);
    }
    pairs
}

fn unique_bases(pairs: &HashSet<RatePair>) -> HashSet<String> {
    pairs.iter().map(|pair| pair.base.clone()).collect()
}

/// Fetches every unique base once across a bounded worker pool and drains
/// the results into a pair-to-value map.
///
/// The work queue is a buffered channel holding every base with the sender
/// dropped up front; workers terminate on queue closure or shutdown. The
/// map is built by this fiber alone after all workers have joined, so no
/// lock guards it.
async fn fetch_pair_values(
    shutdown: watch::Receiver<bool>,
    client: Arc<dyn RateClient>,
    pairs: HashSet<RatePair>,
) -> HashMap<RatePair, f64> {
    let bases = unique_bases(&pairs);

    let (work_tx, work_rx) = mpsc::channel(bases.len().max(1));
    for base in bases {
        // The channel holds every base, so try_send cannot hit capacity.
        let _ = work_tx.try_send(base);
    }
    drop(work_tx);

    let work_rx = Arc::new(Mutex::new(work_rx));
    let pairs = Arc::new(pairs);
    let (result_tx, mut result_rx) = mpsc::channel(pairs.len().max(1));

    let mut workers = Vec::with_capacity(NUM_WORKERS);
    for worker_id in 0..NUM_WORKERS {
        workers.push(tokio::spawn(run_worker(
            worker_id,
            shutdown.clone(),
            Arc::clone(&work_rx),
            Arc::clone(&client),
            Arc::clone(&pairs),
            result_tx.clone(),
        )));
    }
    drop(result_tx);

    for worker in workers {
        let _ = worker.await;
    }

    let mut values = HashMap::with_capacity(pairs.len());
    while let Some(sample) = result_rx.recv().await {
        values.insert(sample.pair, sample.value);
    }
    values
}

async fn run_worker(
    worker_id: usize,
    mut shutdown: watch::Receiver<bool>,
    work_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    client: Arc<dyn RateClient>,
    pairs: Arc<HashSet<RatePair>>,
    result_tx: mpsc::Sender<RateSample>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        let base = {
            let mut queue = work_rx.lock().await;
            tokio::select! {
                // Err means the sender side is gone; treat both as shutdown.
                _ = shutdown.changed() => return,
                base = queue.recv() => match base {
                    Some(base) => base,
                    None => return,
                },
            }
        };

        process_base(
            worker_id,
            &mut shutdown,
            &base,
            client.as_ref(),
            &pairs,
            &result_tx,
        )
        .await;
    }
}

/// Fetches one base and emits a sample for every quote that completes a pair
/// in the unique set. Errors and timeouts only skip this base; the pairs
/// stay pending and are retried on the next tick.
///
/// The fetch is raced against the shutdown signal, so a worker abandons an
/// in-flight call instead of waiting out the request timeout.
async fn process_base(
    worker_id: usize,
    shutdown: &mut watch::Receiver<bool>,
    base: &str,
    client: &dyn RateClient,
    pairs: &HashSet<RatePair>,
    result_tx: &mpsc::Sender<RateSample>,
) {
    let fetched = tokio::select! {
        _ = shutdown.changed() => return,
        fetched = timeout(PER_REQUEST_TIMEOUT, client.get_rates_for_base(base)) => fetched,
    };

    let rates = match fetched {
        Ok(Ok(rates)) => rates,
        Ok(Err(err)) => {
            warn!(worker_id, base, error = %err, "base wasn't processed, external api call failed");
            return;
        }
        Err(_) => {
            warn!(worker_id, base, "base wasn't processed, external api call timed out");
            return;
        }
    };

    for (quote, value) in rates {
        let pair = RatePair::new(base, quote);
        if pairs.contains(&pair) {
            let _ = result_tx.send(RateSample { pair, value }).await;
        }
    }
}
