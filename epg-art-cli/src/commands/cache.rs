use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use epg_art_core::{ArtworkCache, JsonFileCache, cache_path};

use crate::error::CliError;

async fn open(path: Option<PathBuf>) -> Result<JsonFileCache, CliError> {
    let settings = super::load_settings()?;
    let path = match path {
        Some(p) => p,
        None => cache_path()?,
    };
    Ok(JsonFileCache::open(path, settings.expiry_policy()).await?)
}

/// Show where the cache lives and how many records it holds.
pub(crate) fn run_cache_info(path: Option<PathBuf>) -> Result<(), CliError> {
    let rt = super::runtime()?;
    rt.block_on(async {
        let cache = open(path).await?;
        let expired = cache.expired_keys().await?;
        log::info!(
            "  Cache file: {}",
            cache.path().display().if_supports_color(Stdout, |t| t.cyan()),
        );
        log::info!("  Records:    {}", cache.len());
        log::info!("  Expired:    {}", expired.len());
        Ok::<(), CliError>(())
    })
}

/// List expired cache keys.
pub(crate) fn run_cache_expired(path: Option<PathBuf>) -> Result<(), CliError> {
    let rt = super::runtime()?;
    rt.block_on(async {
        let cache = open(path).await?;
        let mut keys = cache.expired_keys().await?;
        keys.sort();
        if keys.is_empty() {
            log::info!("No expired records");
        }
        for key in keys {
            println!("{key}");
        }
        Ok::<(), CliError>(())
    })
}

/// Remove expired records.
pub(crate) fn run_cache_purge(path: Option<PathBuf>) -> Result<(), CliError> {
    let rt = super::runtime()?;
    rt.block_on(async {
        let cache = open(path).await?;
        let keys = cache.expired_keys().await?;
        let removed = cache.remove(&keys).await?;
        cache.flush().await?;
        log::info!(
            "{} Removed {} expired records",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            removed,
        );
        Ok::<(), CliError>(())
    })
}

/// Drop every record.
pub(crate) fn run_cache_clear(path: Option<PathBuf>) -> Result<(), CliError> {
    let rt = super::runtime()?;
    rt.block_on(async {
        let cache = open(path).await?;
        let removed = cache.clear().await?;
        log::info!(
            "{} Cleared {} records from {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            removed,
            cache.path().display(),
        );
        Ok::<(), CliError>(())
    })
}
