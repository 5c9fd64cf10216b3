//! Artwork ingestion settings.
//!
//! Stored in the `[artwork]` table of `~/.config/epg-art/settings.toml`,
//! the same file that holds `[schedules_direct]` credentials. Any field can
//! be overridden by an `EPG_ART_*` environment variable.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use epg_art_core::{ArtworkTier, ExpiryPolicy, ProgramId};

use crate::error::SdError;
use crate::transport::DEFAULT_BASE_URL;

/// Most program ids the metadata endpoint accepts in one call.
pub const SERVICE_BATCH_LIMIT: usize = 500;

/// Canonical path to the settings file: `~/.config/epg-art/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("epg-art").join("settings.toml")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkSettings {
    /// Master switch; a disabled pass returns immediately.
    pub enabled: bool,
    /// Size tag an entry must carry to select its tier.
    pub artwork_size: String,
    pub preferred_aspect: String,
    pub max_batch_size: usize,
    pub max_concurrent_batches: usize,
    pub tier_priority: Vec<ArtworkTier>,
    /// Only ids starting with one of these are ingested. Empty accepts all.
    pub id_prefixes: Vec<String>,
    pub excluded_ids: Vec<String>,
    /// Cache empty results so programs without artwork are not re-queried
    /// until the negative record expires.
    pub cache_negative_results: bool,
    pub cache_ttl_days: u32,
    pub negative_ttl_days: u32,
    pub base_url: String,
}

impl Default for ArtworkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            artwork_size: "Md".to_string(),
            preferred_aspect: "4x3".to_string(),
            max_batch_size: SERVICE_BATCH_LIMIT,
            max_concurrent_batches: 4,
            tier_priority: ArtworkTier::DEFAULT_PRIORITY.to_vec(),
            id_prefixes: vec!["EP".to_string()],
            excluded_ids: Vec::new(),
            cache_negative_results: false,
            cache_ttl_days: 30,
            negative_ttl_days: 3,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    artwork: Option<ArtworkSettings>,
}

impl ArtworkSettings {
    /// Load from the default settings file, then apply environment overrides.
    pub fn load() -> Result<Self, SdError> {
        let mut settings = Self::load_from(&settings_path())?;
        settings.apply_env_overrides();
        Ok(settings.normalized())
    }

    /// Read the `[artwork]` table of `path`. A missing file or table yields
    /// defaults; a malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, SdError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let file: SettingsFile = toml::from_str(&contents)
            .map_err(|e| SdError::config(format!("Failed to parse {}: {e}", path.display())))?;
        Ok(file.artwork.unwrap_or_default())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `EPG_ART_*` overrides read through `lookup`. Values that fail
    /// to parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_var(&lookup, "EPG_ART_ENABLED", parse_bool) {
            self.enabled = v;
        }
        if let Some(v) = lookup("EPG_ART_SIZE") {
            self.artwork_size = v;
        }
        if let Some(v) = lookup("EPG_ART_ASPECT") {
            self.preferred_aspect = v;
        }
        if let Some(v) = parse_var(&lookup, "EPG_ART_BATCH_SIZE", |s| s.parse().ok()) {
            self.max_batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "EPG_ART_CONCURRENCY", |s| s.parse().ok()) {
            self.max_concurrent_batches = v;
        }
        if let Some(v) = parse_var(&lookup, "EPG_ART_TIERS", parse_tiers) {
            self.tier_priority = v;
        }
        if let Some(v) = lookup("EPG_ART_ID_PREFIXES") {
            self.id_prefixes = split_list(&v);
        }
        if let Some(v) = parse_var(&lookup, "EPG_ART_CACHE_NEGATIVE", parse_bool) {
            self.cache_negative_results = v;
        }
        if let Some(v) = parse_var(&lookup, "EPG_ART_CACHE_TTL_DAYS", |s| s.parse().ok()) {
            self.cache_ttl_days = v;
        }
        if let Some(v) = parse_var(&lookup, "EPG_ART_NEGATIVE_TTL_DAYS", |s| s.parse().ok()) {
            self.negative_ttl_days = v;
        }
        if let Some(v) = lookup("EPG_ART_BASE_URL") {
            self.base_url = v;
        }
    }

    /// Clamp numeric limits into the range the service accepts.
    pub fn normalized(mut self) -> Self {
        if self.max_batch_size == 0 || self.max_batch_size > SERVICE_BATCH_LIMIT {
            log::warn!(
                "max_batch_size {} out of range, using {}",
                self.max_batch_size,
                SERVICE_BATCH_LIMIT
            );
            self.max_batch_size = SERVICE_BATCH_LIMIT;
        }
        if self.max_concurrent_batches == 0 {
            log::warn!("max_concurrent_batches must be at least 1");
            self.max_concurrent_batches = 1;
        }
        if self.tier_priority.is_empty() {
            self.tier_priority = ArtworkTier::DEFAULT_PRIORITY.to_vec();
        }
        self
    }

    /// Whether `id` should be ingested.
    pub fn accepts(&self, id: &ProgramId) -> bool {
        let id = id.as_str();
        if id.is_empty() || self.excluded_ids.iter().any(|x| x == id) {
            return false;
        }
        self.id_prefixes.is_empty() || self.id_prefixes.iter().any(|p| id.starts_with(p.as_str()))
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            ttl: Duration::days(i64::from(self.cache_ttl_days)),
            negative_ttl: Duration::days(i64::from(self.negative_ttl_days)),
        }
    }

    /// Render as the `[artwork]` table of a settings file.
    pub fn to_toml(&self) -> Result<String, SdError> {
        let file = SettingsFile {
            artwork: Some(self.clone()),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| SdError::config(format!("Failed to serialize settings: {e}")))
    }

    /// Write these settings as a fresh settings file. Refuses to overwrite
    /// an existing file unless `force` is set.
    pub fn write_to(&self, path: &Path, force: bool) -> Result<(), SdError> {
        if path.exists() && !force {
            return Err(SdError::config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        log::warn!("Ignoring {key}={raw}: not a valid value");
    }
    parsed
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_tiers(s: &str) -> Option<Vec<ArtworkTier>> {
    split_list(s).iter().map(|t| t.parse().ok()).collect()
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
