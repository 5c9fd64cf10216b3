//! Program catalog collaborator.
//!
//! The catalog holds the programs a guide is built from. Ingestion asks it
//! which programs need artwork and pushes resolved artwork back onto them.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::artwork::ArtworkSet;
use crate::error::CoreError;
use crate::program::ProgramId;

/// The in-memory program repository as seen by the ingestion pipeline.
pub trait ProgramCatalog: Send + Sync {
    /// Attach artwork to a program. Returns `false` when the program is not
    /// in the catalog and nothing was applied.
    fn set_artwork(&self, program_id: &ProgramId, artwork: &ArtworkSet) -> bool;

    /// Program ids accepted by `filter`, in catalog order.
    fn candidate_ids(&self, filter: &dyn Fn(&ProgramId) -> bool) -> Vec<ProgramId>;
}

/// A program as stored in a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub program_id: ProgramId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<ArtworkSet>,
}

impl ProgramRecord {
    pub fn new(program_id: impl Into<ProgramId>) -> Self {
        Self {
            program_id: program_id.into(),
            title: None,
            artwork: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// JSON snapshot format: `{ "programs": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub programs: Vec<ProgramRecord>,
}

/// Catalog kept in memory, optionally loaded from and saved to a snapshot.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    programs: Vec<ProgramRecord>,
    index: HashMap<ProgramId, usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records. Later duplicates of an id are ignored.
    pub fn from_records(records: impl IntoIterator<Item = ProgramRecord>) -> Self {
        let mut inner = CatalogInner::default();
        for record in records {
            if inner.index.contains_key(&record.program_id) {
                log::debug!("Ignoring duplicate catalog entry {}", record.program_id);
                continue;
            }
            inner
                .index
                .insert(record.program_id.clone(), inner.programs.len());
            inner.programs.push(record);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Load a JSON snapshot from disk.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&contents)?;
        Ok(Self::from_records(snapshot.programs))
    }

    /// Write the current state as a JSON snapshot.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let snapshot = self.snapshot();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Add a program. Returns `false` when the id is already present.
    pub fn insert(&self, record: ProgramRecord) -> bool {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.program_id) {
            return false;
        }
        let position = inner.programs.len();
        inner.index.insert(record.program_id.clone(), position);
        inner.programs.push(record);
        true
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            programs: self.inner.read().programs.clone(),
        }
    }

    pub fn get(&self, program_id: &ProgramId) -> Option<ProgramRecord> {
        let inner = self.inner.read();
        inner
            .index
            .get(program_id)
            .map(|&i| inner.programs[i].clone())
    }

    pub fn artwork(&self, program_id: &ProgramId) -> Option<ArtworkSet> {
        self.get(program_id).and_then(|r| r.artwork)
    }

    pub fn len(&self) -> usize {
        self.inner.read().programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().programs.is_empty()
    }
}

impl ProgramCatalog for MemoryCatalog {
    fn set_artwork(&self, program_id: &ProgramId, artwork: &ArtworkSet) -> bool {
        let mut inner = self.inner.write();
        let Some(&i) = inner.index.get(program_id) else {
            return false;
        };
        inner.programs[i].artwork = Some(artwork.clone());
        true
    }

    fn candidate_ids(&self, filter: &dyn Fn(&ProgramId) -> bool) -> Vec<ProgramId> {
        self.inner
            .read()
            .programs
            .iter()
            .map(|r| &r.program_id)
            .filter(|id| filter(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
