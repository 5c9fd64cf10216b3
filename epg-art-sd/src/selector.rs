//! Tiered artwork selection.
//!
//! Tiers are tried in priority order and the first one holding an image of
//! the wanted size wins outright. Inside that tier one image is kept per
//! aspect (best category first), then the aspect closest to the preferred
//! one is returned.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use epg_art_core::{ArtworkEntry, ArtworkSet, ArtworkTier, MetadataResponse, parse_aspect};

/// Image categories from most to least wanted. Unlisted categories rank
/// after all of these.
const CATEGORY_ORDER: &[&str] = &[
    "box art",
    "vod art",
    "poster art",
    "banner",
    "banner-l1",
    "banner-l2",
    "banner-lo",
    "logo",
    "banner-l3",
    "iconic",
    "staple",
];

/// Pick the artwork to attach to the program in `response`.
///
/// Returns an empty set when the response failed, carried nothing usable,
/// or no tier has an image of `size_hint`.
pub fn select(
    response: &MetadataResponse,
    preferred_aspect: &str,
    size_hint: &str,
    tier_priority: &[ArtworkTier],
) -> ArtworkSet {
    if !response.is_success() || response.entries.is_empty() {
        log::warn!(
            "No artwork found for {} (code {}{})",
            response.program_id,
            response.code,
            response
                .message
                .as_deref()
                .map(|m| format!(": {m}"))
                .unwrap_or_default()
        );
        return ArtworkSet::empty();
    }

    let sized: Vec<&ArtworkEntry> = response
        .entries
        .iter()
        .filter(|e| e.is_usable() && e.size.eq_ignore_ascii_case(size_hint))
        .collect();

    let Some(tier) = tier_priority
        .iter()
        .copied()
        .find(|t| sized.iter().any(|e| e.tier == *t))
    else {
        log::warn!(
            "No {} artwork in tiers {:?} for {}",
            size_hint,
            tier_priority,
            response.program_id
        );
        return ArtworkSet::empty();
    };

    // One entry per aspect.
    let mut by_aspect: BTreeMap<String, &ArtworkEntry> = BTreeMap::new();
    for entry in sized.into_iter().filter(|e| e.tier == tier) {
        let key = entry.aspect.trim().to_ascii_lowercase();
        match by_aspect.get(&key) {
            Some(current) if compare_within_aspect(current, entry) != Ordering::Greater => {}
            _ => {
                by_aspect.insert(key, entry);
            }
        }
    }

    let preferred_ratio = parse_aspect(preferred_aspect);
    let ranked: Vec<(AspectRank, &ArtworkEntry)> = by_aspect
        .into_values()
        .map(|e| (aspect_rank(e, preferred_aspect, preferred_ratio), e))
        .collect();
    let Some(best) = ranked.iter().map(|(r, _)| *r).min_by(AspectRank::compare) else {
        return ArtworkSet::empty();
    };

    let mut chosen: Vec<ArtworkEntry> = ranked
        .into_iter()
        .filter(|(r, _)| r.compare(&best) == Ordering::Equal)
        .map(|(_, e)| e.clone())
        .collect();
    chosen.sort_by(|a, b| a.aspect.cmp(&b.aspect));

    log::trace!(
        "Selected {} {} artwork entr{} for {}",
        chosen.len(),
        tier,
        if chosen.len() == 1 { "y" } else { "ies" },
        response.program_id
    );
    ArtworkSet::new(chosen)
}

/// Position of `category` in [`CATEGORY_ORDER`].
fn category_rank(category: Option<&str>) -> usize {
    category
        .map(|c| c.trim().to_ascii_lowercase())
        .and_then(|c| CATEGORY_ORDER.iter().position(|known| *known == c))
        .unwrap_or(CATEGORY_ORDER.len())
}

fn compare_within_aspect(a: &ArtworkEntry, b: &ArtworkEntry) -> Ordering {
    category_rank(a.category.as_deref())
        .cmp(&category_rank(b.category.as_deref()))
        .then_with(|| a.uri.cmp(&b.uri))
}

/// How close an aspect is to the preferred one. Lower is better.
#[derive(Debug, Clone, Copy)]
enum AspectRank {
    Exact,
    Distance(f64),
    Unparsable,
}

impl AspectRank {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Exact, Self::Exact) | (Self::Unparsable, Self::Unparsable) => Ordering::Equal,
            (Self::Distance(a), Self::Distance(b)) => {
                if (a - b).abs() < 1e-9 {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (Self::Exact, _) | (_, Self::Unparsable) => Ordering::Less,
            (_, Self::Exact) | (Self::Unparsable, _) => Ordering::Greater,
        }
    }
}

fn aspect_rank(entry: &ArtworkEntry, preferred: &str, preferred_ratio: Option<f64>) -> AspectRank {
    if entry.aspect.trim().eq_ignore_ascii_case(preferred.trim()) {
        return AspectRank::Exact;
    }
    match entry.aspect_ratio() {
        Some(ratio) => AspectRank::Distance(
            preferred_ratio.map_or(f64::INFINITY, |p| (ratio - p).abs()),
        ),
        None => AspectRank::Unparsable,
    }
}

#[cfg(test)]
#[path = "tests/selector_tests.rs"]
mod tests;
