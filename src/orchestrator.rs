//! Concurrent probe fan-out for one cycle.
//!
//! Every destination is traced and classified in its own task. Workers
//! share nothing: each returns its summary, and the orchestrator places it
//! in the slot of its destination once all workers have finished.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::classify::{Thresholds, TraceSummary, classify};
use crate::config::{DEFAULT_MAX_WORKERS, ProbeConfig};
use crate::probe::{ProbeError, ProbeLimits, Prober};

/// Runs one prober + classifier pipeline per destination.
#[derive(Clone)]
pub struct Orchestrator {
    prober: Arc<dyn Prober>,
    max_workers: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the default worker cap.
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// Create an orchestrator capped by the probe configuration.
    pub fn from_config(prober: Arc<dyn Prober>, config: &ProbeConfig) -> Self {
        Self::new(prober).with_max_workers(config.max_workers)
    }

    /// Cap the number of destinations probed at once (minimum 1).
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Probe and classify every destination.
    ///
    /// The result follows `destinations` order regardless of completion
    /// order. Destinations whose probe failed are omitted and logged; they
    /// never abort the others.
    pub async fn run_cycle(
        &self,
        destinations: &[String],
        limits: ProbeLimits,
        thresholds: Thresholds,
    ) -> Vec<TraceSummary> {
        if destinations.is_empty() {
            return Vec::new();
        }

        let workers = self.max_workers.min(destinations.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut slot_of = HashMap::with_capacity(destinations.len());

        for (index, destination) in destinations.iter().enumerate() {
            let prober = Arc::clone(&self.prober);
            let semaphore = Arc::clone(&semaphore);
            let destination = destination.clone();

            let handle = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ProbeError::Worker("worker pool closed".to_string()))?;

                tracing::info!(destination = %destination, "Tracing destination");
                let hops = prober.probe(&destination, limits).await?;
                Ok::<_, ProbeError>(classify(&destination, &hops, &thresholds))
            });
            slot_of.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<TraceSummary>> = vec![None; destinations.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            let (index, result) = match joined {
                Ok((id, result)) => (slot_of.get(&id).copied(), result),
                Err(e) => (
                    slot_of.get(&e.id()).copied(),
                    Err(ProbeError::Worker(e.to_string())),
                ),
            };
            let Some(index) = index else {
                continue;
            };

            match result {
                Ok(summary) => {
                    tracing::info!(
                        destination = %summary.destination,
                        total_hops = summary.total_hops,
                        timeouts = summary.timeouts,
                        slow_hops = summary.slow_hops,
                        success = summary.success,
                        "Trace summarized"
                    );
                    slots[index] = Some(summary);
                }
                Err(e) => {
                    tracing::error!(
                        destination = %destinations[index],
                        error = %e,
                        "Probe failed; destination excluded from this cycle"
                    );
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}
