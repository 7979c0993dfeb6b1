use crate::domain::model::{DiscoveryResult, DispatchReport, LeafDescriptor, LeafFailure};
use crate::domain::ports::{ArtifactStore, Fetcher};
use crate::utils::error::LeafError;
use chrono::Utc;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// One worker per available core when no limit is configured.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

#[derive(Debug)]
enum LeafOutcome {
    Written,
    Skipped,
    Failed(LeafError),
}

#[derive(Debug)]
struct Completed {
    index: usize,
    leaf: LeafDescriptor,
    outcome: LeafOutcome,
}

type WorkQueue = Arc<Mutex<VecDeque<(usize, LeafDescriptor)>>>;

/// Fetches and persists every leaf with at most `concurrency_limit` leaves in
/// flight.
#[derive(Debug, Clone)]
pub struct DownloadDispatcher {
    concurrency_limit: usize,
}

impl Default for DownloadDispatcher {
    fn default() -> Self {
        Self::new(default_concurrency())
    }
}

async fn process_leaf<F, S>(leaf: &LeafDescriptor, fetcher: &F, store: &S) -> LeafOutcome
where
    F: Fetcher + ?Sized,
    S: ArtifactStore,
{
    if store.exists(&leaf.name).await {
        tracing::info!("Skipping: {}.xml. Item exists.", leaf.name);
        return LeafOutcome::Skipped;
    }

    let body = match fetcher.get(&leaf.config_url()).await {
        Ok(body) => body,
        Err(e) => return LeafOutcome::Failed(e.into()),
    };

    match store.write(&leaf.name, &body).await {
        Ok(()) => LeafOutcome::Written,
        Err(e) => LeafOutcome::Failed(e.into()),
    }
}

fn next_leaf(queue: &WorkQueue) -> Option<(usize, LeafDescriptor)> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

impl DownloadDispatcher {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub async fn run<F, S>(
        &self,
        leaves: DiscoveryResult,
        fetcher: Arc<F>,
        store: Arc<S>,
    ) -> DispatchReport
    where
        F: Fetcher + ?Sized + 'static,
        S: ArtifactStore + 'static,
    {
        let total = leaves.len();
        if total == 0 {
            tracing::info!("Nothing to download");
            return DispatchReport::empty();
        }

        let started_at = Utc::now();
        let all_leaves = leaves.leaves().to_vec();
        let queue: WorkQueue = Arc::new(Mutex::new(leaves.into_iter().enumerate().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Completed>();

        let worker_count = self.concurrency_limit.min(total);
        tracing::info!(
            "📥 Downloading {} configs with {} workers",
            total,
            worker_count
        );

        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let fetcher = Arc::clone(&fetcher);
            let store = Arc::clone(&store);

            workers.spawn(async move {
                while let Some((index, leaf)) = next_leaf(&queue) {
                    tracing::info!("Starting: {} [{} of {}]", leaf.name, index + 1, total);
                    let outcome = process_leaf(&leaf, &*fetcher, &*store).await;
                    if tx.send(Completed { index, leaf, outcome }).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut succeeded = 0;
        let mut skipped = 0;
        let mut failed = Vec::new();
        let mut reported = vec![false; total];
        let mut done = 0;

        while let Some(completed) = rx.recv().await {
            done += 1;
            reported[completed.index] = true;
            match completed.outcome {
                LeafOutcome::Written => succeeded += 1,
                LeafOutcome::Skipped => skipped += 1,
                LeafOutcome::Failed(cause) => {
                    tracing::warn!("❌ {} failed: {}", completed.leaf.name, cause);
                    failed.push((
                        completed.index,
                        LeafFailure {
                            url: completed.leaf.config_url(),
                            name: completed.leaf.name,
                            cause,
                        },
                    ));
                }
            }
            tracing::debug!("Progress: {}/{}", done, total);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Download worker stopped unexpectedly: {}", e);
            }
        }

        // Leaves held by a worker that died, or left queued behind it.
        if done != total {
            tracing::error!(
                "Only {} of {} leaves reported a result; re-run to pick up the rest",
                done,
                total
            );
            for (index, leaf) in all_leaves.into_iter().enumerate() {
                if !reported[index] {
                    failed.push((
                        index,
                        LeafFailure {
                            url: leaf.config_url(),
                            name: leaf.name,
                            cause: LeafError::Aborted,
                        },
                    ));
                }
            }
        }

        failed.sort_by_key(|(index, _)| *index);
        let report = DispatchReport {
            succeeded,
            skipped,
            failed: failed.into_iter().map(|(_, failure)| failure).collect(),
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "Finished: {} written, {} skipped, {} failed",
            report.succeeded,
            report.skipped,
            report.failed.len()
        );
        report
    }
}
