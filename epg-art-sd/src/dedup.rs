use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use epg_art_core::{ArtworkCache, ArtworkSet, ProgramId};

/// Outcome of checking candidates against the cache.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Ids answered by the cache, with their stored artwork.
    pub cached: Vec<(ProgramId, ArtworkSet)>,
    /// Ids that must be fetched, in candidate order.
    pub misses: Vec<ProgramId>,
    /// The scan stopped early on cancellation.
    pub cancelled: bool,
}

/// Split `ids` into cache hits and misses.
///
/// Duplicates collapse to their first occurrence. A cache read error is
/// logged and treated as a miss. Cancellation is checked before each id.
pub async fn resolve(
    cache: &dyn ArtworkCache,
    ids: &[ProgramId],
    cancel: &CancellationToken,
) -> Resolution {
    let mut resolution = Resolution::default();
    let mut seen: HashSet<&ProgramId> = HashSet::with_capacity(ids.len());

    for id in ids {
        if cancel.is_cancelled() {
            log::info!(
                "Cache scan cancelled after {} of {} programs",
                seen.len(),
                ids.len()
            );
            resolution.cancelled = true;
            break;
        }
        if !seen.insert(id) {
            continue;
        }

        match cache.get(id.as_str()).await {
            Ok(Some(artwork)) => resolution.cached.push((id.clone(), artwork)),
            Ok(None) => resolution.misses.push(id.clone()),
            Err(e) => {
                log::warn!("Artwork cache read failed for {id}: {e}");
                resolution.misses.push(id.clone());
            }
        }
    }

    log::debug!(
        "Cache check: {} cached, {} to download",
        resolution.cached.len(),
        resolution.misses.len()
    );
    resolution
}

#[cfg(test)]
#[path = "tests/dedup_tests.rs"]
mod tests;
