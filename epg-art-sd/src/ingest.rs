//! Artwork ingestion pass: cache check, batched download, selection, then
//! catalog update, cache write and sink handoff.
//!
//! Only one pass runs at a time in the process. A second caller waits for
//! the first to finish, or gives up if its cancellation token fires first.

use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use epg_art_core::{
    ArtworkCache, ArtworkSet, ArtworkSink, CoreError, MetadataResponse, ProgramCatalog, ProgramId,
};

use crate::client::ArtworkSource;
use crate::dedup;
use crate::scheduler::BatchScheduler;
use crate::selector;
use crate::settings::ArtworkSettings;

/// Held for the whole of a pass.
static RUN_LOCK: LazyLock<tokio::sync::Mutex<()>> = LazyLock::new(|| tokio::sync::Mutex::new(()));

/// Progress events emitted during a pass.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    Started {
        candidates: usize,
    },
    CacheResolved {
        cached: usize,
        misses: usize,
    },
    BatchCompleted {
        offset: usize,
        size: usize,
        processed: usize,
        total: usize,
    },
    BatchFailed {
        offset: usize,
        size: usize,
        error: String,
    },
    Finished(IngestSummary),
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub candidates: usize,
    pub cache_hits: usize,
    pub misses: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Responses received from the service.
    pub fetched: usize,
    /// Programs that had artwork attached from a fresh download.
    pub applied: usize,
    /// Programs for which no usable artwork was found.
    pub negative: usize,
    pub cancelled: bool,
}

pub struct ArtworkIngestor {
    settings: ArtworkSettings,
    source: Arc<dyn ArtworkSource>,
    cache: Arc<dyn ArtworkCache>,
    catalog: Arc<dyn ProgramCatalog>,
    sink: Arc<dyn ArtworkSink>,
    scheduler: BatchScheduler,
    events: Option<mpsc::UnboundedSender<IngestEvent>>,
    last_summary: Mutex<Option<IngestSummary>>,
}

impl ArtworkIngestor {
    pub fn new(
        settings: ArtworkSettings,
        source: Arc<dyn ArtworkSource>,
        cache: Arc<dyn ArtworkCache>,
        catalog: Arc<dyn ProgramCatalog>,
        sink: Arc<dyn ArtworkSink>,
    ) -> Self {
        let scheduler = BatchScheduler::new(settings.max_batch_size, settings.max_concurrent_batches);
        Self {
            settings,
            source,
            cache,
            catalog,
            sink,
            scheduler,
            events: None,
            last_summary: Mutex::new(None),
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<IngestEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn settings(&self) -> &ArtworkSettings {
        &self.settings
    }

    /// Counters from the most recent completed pass.
    pub fn last_summary(&self) -> Option<IngestSummary> {
        self.last_summary.lock().clone()
    }

    /// Run a pass over every catalog program the settings accept. The
    /// catalog is read once the run lock is held.
    pub async fn run(&self, cancel: &CancellationToken) -> bool {
        self.run_locked(cancel, || {
            self.catalog.candidate_ids(&|id| self.settings.accepts(id))
        })
        .await
    }

    /// Run a pass over `candidates`.
    ///
    /// Returns `false` only when cancelled before the run lock was taken.
    /// Cancellation after that stops the pass early but still returns
    /// `true`.
    pub async fn run_with(&self, candidates: Vec<ProgramId>, cancel: &CancellationToken) -> bool {
        self.run_locked(cancel, move || candidates).await
    }

    async fn run_locked(
        &self,
        cancel: &CancellationToken,
        candidates: impl FnOnce() -> Vec<ProgramId>,
    ) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("Artwork ingestion cancelled while waiting for another pass");
                return false;
            }
            guard = RUN_LOCK.lock() => guard,
        };
        if cancel.is_cancelled() {
            return false;
        }
        if !self.settings.enabled {
            log::debug!("Artwork ingestion is disabled");
            return true;
        }

        let candidates = candidates();
        let summary = self.ingest(candidates, cancel).await;
        *self.last_summary.lock() = Some(summary.clone());
        self.emit(IngestEvent::Finished(summary));
        true
    }

    async fn ingest(&self, candidates: Vec<ProgramId>, cancel: &CancellationToken) -> IngestSummary {
        let candidates: Vec<ProgramId> = candidates
            .into_iter()
            .filter(|id| self.settings.accepts(id))
            .collect();
        let mut summary = IngestSummary {
            candidates: candidates.len(),
            ..Default::default()
        };
        log::info!("Starting artwork ingestion for {} programs", candidates.len());
        self.emit(IngestEvent::Started {
            candidates: candidates.len(),
        });

        let resolution = dedup::resolve(self.cache.as_ref(), &candidates, cancel).await;
        summary.cache_hits = resolution.cached.len();
        summary.misses = resolution.misses.len();
        self.emit(IngestEvent::CacheResolved {
            cached: resolution.cached.len(),
            misses: resolution.misses.len(),
        });

        for (id, artwork) in &resolution.cached {
            // Cached negatives have nothing to attach.
            if artwork.is_empty() {
                continue;
            }
            if self.catalog.set_artwork(id, artwork) {
                self.sink.enqueue(artwork);
            }
        }

        if !resolution.misses.is_empty() && !cancel.is_cancelled() {
            let outcome = self
                .scheduler
                .download_all(
                    self.source.as_ref(),
                    &resolution.misses,
                    cancel,
                    self.events.as_ref(),
                )
                .await;
            summary.batches = outcome.batches;
            summary.failed_batches = outcome.failed;
            summary.fetched = outcome.responses.len();
            self.apply_responses(outcome.responses, cancel, &mut summary).await;
        }

        if let Err(e) = self.cache.flush().await {
            log::warn!("Failed to save artwork cache: {e}");
        }

        summary.cancelled = cancel.is_cancelled();
        log::info!(
            "Artwork ingestion finished: {} cached, {} downloaded, {} applied, {} without artwork{}",
            summary.cache_hits,
            summary.fetched,
            summary.applied,
            summary.negative,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        summary
    }

    async fn apply_responses(
        &self,
        responses: Vec<MetadataResponse>,
        cancel: &CancellationToken,
        summary: &mut IngestSummary,
    ) {
        for response in responses {
            if cancel.is_cancelled() {
                log::info!("Artwork ingestion cancelled; leaving remaining responses");
                break;
            }

            let artwork = selector::select(
                &response,
                &self.settings.preferred_aspect,
                &self.settings.artwork_size,
                &self.settings.tier_priority,
            );

            if artwork.is_empty() {
                summary.negative += 1;
                if self.settings.cache_negative_results && response.is_success() {
                    self.cache_write(&response.program_id, &artwork).await;
                }
                continue;
            }

            if self.catalog.set_artwork(&response.program_id, &artwork) {
                self.cache_write(&response.program_id, &artwork).await;
                self.sink.enqueue(&artwork);
                summary.applied += 1;
            } else {
                log::debug!("{} is not in the catalog; artwork dropped", response.program_id);
            }
        }
    }

    async fn cache_write(&self, id: &ProgramId, artwork: &ArtworkSet) {
        if let Err(e) = self.cache.set(id.as_str(), artwork).await {
            log::warn!("Failed to cache artwork for {id}: {e}");
        }
    }

    /// Cache keys past their expiry.
    pub async fn expired_keys(&self) -> Result<Vec<String>, CoreError> {
        self.cache.expired_keys().await
    }

    /// Drop expired cache records so their programs are fetched again on the
    /// next pass. Returns how many were removed.
    pub async fn remove_expired(&self) -> Result<usize, CoreError> {
        let keys = self.cache.expired_keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = self.cache.remove(&keys).await?;
        self.cache.flush().await?;
        log::info!("Removed {removed} expired artwork cache records");
        Ok(removed)
    }

    fn emit(&self, event: IngestEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }
}
