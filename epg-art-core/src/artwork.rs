use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::program::ProgramId;

/// Status code the metadata service uses for "OK".
pub const CODE_OK: i32 = 0;

/// Which level of a program an image describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkTier {
    Series,
    Sport,
    Episode,
    Season,
    Other,
}

impl ArtworkTier {
    /// The tier order used when no priority is configured.
    pub const DEFAULT_PRIORITY: [ArtworkTier; 4] = [
        ArtworkTier::Series,
        ArtworkTier::Sport,
        ArtworkTier::Episode,
        ArtworkTier::Season,
    ];

    /// Map the service's free-form tier tag onto a tier.
    ///
    /// Sport tags come in several flavours ("Sport Event", "Team Event");
    /// anything unrecognised, including a missing tag, is `Other`.
    pub fn from_service_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "series" => Self::Series,
            "sport" | "sport event" | "team event" => Self::Sport,
            "episode" => Self::Episode,
            "season" => Self::Season,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Sport => "sport",
            Self::Episode => "episode",
            Self::Season => "season",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ArtworkTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtworkTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "series" => Ok(Self::Series),
            "sport" => Ok(Self::Sport),
            "episode" => Ok(Self::Episode),
            "season" => Ok(Self::Season),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown artwork tier '{other}'")),
        }
    }
}

/// One image descriptor returned by the metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkEntry {
    pub tier: ArtworkTier,
    /// Size tag, e.g. "Sm", "Md", "Lg", "Ms".
    pub size: String,
    /// Aspect tag in `WxH` form, e.g. "4x3", "2x3", "16x9".
    pub aspect: String,
    #[serde(default)]
    pub code: i32,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub primary: bool,
}

impl ArtworkEntry {
    pub fn new(
        tier: ArtworkTier,
        size: impl Into<String>,
        aspect: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            tier,
            size: size.into(),
            aspect: aspect.into(),
            code: CODE_OK,
            uri: uri.into(),
            category: None,
            width: None,
            height: None,
            primary: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// An entry can be shown only if it succeeded and points somewhere.
    pub fn is_usable(&self) -> bool {
        self.code == CODE_OK && !self.uri.trim().is_empty() && !self.aspect.trim().is_empty()
    }

    /// Parse the aspect tag into a width/height ratio.
    pub fn aspect_ratio(&self) -> Option<f64> {
        parse_aspect(&self.aspect)
    }
}

/// Parse an aspect tag such as "16x9" into `16.0 / 9.0`.
pub fn parse_aspect(aspect: &str) -> Option<f64> {
    let (w, h) = aspect.trim().split_once(['x', 'X', ':'])?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(w / h)
}

/// The artwork chosen for one program. Empty means "nothing usable", which
/// is a real answer and distinct from "never fetched".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtworkSet(Vec<ArtworkEntry>);

impl ArtworkSet {
    pub fn new(entries: Vec<ArtworkEntry>) -> Self {
        Self(entries)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> &[ArtworkEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArtworkEntry> {
        self.0.iter()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.uri.as_str())
    }

    pub fn into_inner(self) -> Vec<ArtworkEntry> {
        self.0
    }
}

impl From<Vec<ArtworkEntry>> for ArtworkSet {
    fn from(entries: Vec<ArtworkEntry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a ArtworkSet {
    type Item = &'a ArtworkEntry;
    type IntoIter = std::slice::Iter<'a, ArtworkEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Per-program answer from one batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResponse {
    pub program_id: ProgramId,
    pub code: i32,
    pub message: Option<String>,
    pub entries: Vec<ArtworkEntry>,
}

impl MetadataResponse {
    pub fn ok(program_id: impl Into<ProgramId>, entries: Vec<ArtworkEntry>) -> Self {
        Self {
            program_id: program_id.into(),
            code: CODE_OK,
            message: None,
            entries,
        }
    }

    pub fn failed(program_id: impl Into<ProgramId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            code,
            message: Some(message.into()),
            entries: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }
}

#[cfg(test)]
#[path = "tests/artwork_tests.rs"]
mod tests;
