//! Batched, concurrency-capped downloads.
//!
//! The miss list is cut into batches of at most `batch_size` ids and each
//! batch is one call to the [`ArtworkSource`]. All batches are polled
//! together, but a semaphore admits at most `max_concurrent` into flight.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use epg_art_core::{MetadataResponse, ProgramId};

use crate::client::ArtworkSource;
use crate::ingest::IngestEvent;

/// Consecutive `(offset, batch)` slices of `ids`, each at most `batch_size`
/// long.
pub fn partition(ids: &[ProgramId], batch_size: usize) -> impl Iterator<Item = (usize, &[ProgramId])> {
    let batch_size = batch_size.max(1);
    ids.chunks(batch_size)
        .enumerate()
        .map(move |(i, chunk)| (i * batch_size, chunk))
}

/// Result of [`BatchScheduler::download_all`]. The order of `responses`
/// carries no meaning.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub responses: Vec<MetadataResponse>,
    pub batches: usize,
    pub failed: usize,
    /// Batches never admitted because of cancellation.
    pub skipped: usize,
    /// Ids in batches that completed.
    pub processed: usize,
}

enum BatchResult {
    Completed(Vec<MetadataResponse>),
    Failed,
    Skipped,
}

pub struct BatchScheduler {
    batch_size: usize,
    max_concurrent: usize,
    gate: Semaphore,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            batch_size: batch_size.max(1),
            max_concurrent,
            gate: Semaphore::new(max_concurrent),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Fetch metadata for every id in `misses`.
    ///
    /// A failed batch is logged and its ids are left for the next run; the
    /// other batches carry on. After cancellation no further batch is
    /// admitted, batches already in flight finish, and whatever was
    /// collected is returned.
    pub async fn download_all(
        &self,
        source: &dyn ArtworkSource,
        misses: &[ProgramId],
        cancel: &CancellationToken,
        events: Option<&mpsc::UnboundedSender<IngestEvent>>,
    ) -> BatchOutcome {
        if misses.is_empty() {
            return BatchOutcome::default();
        }

        let total = misses.len();
        let processed = AtomicUsize::new(0);
        let emit = |event: IngestEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        let batches: Vec<(usize, &[ProgramId])> = partition(misses, self.batch_size).collect();
        log::debug!(
            "Downloading artwork for {} programs in {} batches (up to {} at once)",
            total,
            batches.len(),
            self.max_concurrent
        );

        let futures = batches.iter().map(|&(offset, batch)| {
            let processed = &processed;
            let emit = &emit;
            async move {
                if cancel.is_cancelled() {
                    return BatchResult::Skipped;
                }
                // The permit is held until this future returns.
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return BatchResult::Skipped,
                    permit = self.gate.acquire() => match permit {
                        Ok(p) => p,
                        Err(_) => return BatchResult::Skipped,
                    },
                };
                if cancel.is_cancelled() {
                    return BatchResult::Skipped;
                }

                match source.fetch_batch(batch, offset).await {
                    Ok(responses) => {
                        let done = processed.fetch_add(batch.len(), Ordering::Relaxed) + batch.len();
                        log::info!("Downloaded program artwork {done} of {total}");
                        emit(IngestEvent::BatchCompleted {
                            offset,
                            size: batch.len(),
                            processed: done,
                            total,
                        });
                        BatchResult::Completed(responses)
                    }
                    Err(e) => {
                        log::warn!(
                            "Artwork batch at {} ({} programs) failed: {}",
                            offset,
                            batch.len(),
                            e
                        );
                        emit(IngestEvent::BatchFailed {
                            offset,
                            size: batch.len(),
                            error: e.to_string(),
                        });
                        BatchResult::Failed
                    }
                }
            }
        });

        let results = join_all(futures).await;

        let mut outcome = BatchOutcome {
            batches: batches.len(),
            processed: processed.load(Ordering::Relaxed),
            ..Default::default()
        };
        for result in results {
            match result {
                BatchResult::Completed(mut responses) => outcome.responses.append(&mut responses),
                BatchResult::Failed => outcome.failed += 1,
                BatchResult::Skipped => outcome.skipped += 1,
            }
        }
        if outcome.skipped > 0 {
            log::info!("Skipped {} artwork batches after cancellation", outcome.skipped);
        }
        outcome
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
