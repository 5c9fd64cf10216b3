//! Data model and collaborator interfaces for program artwork ingestion.

pub mod artwork;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod program;
pub mod sink;

pub use artwork::{
    ArtworkEntry, ArtworkSet, ArtworkTier, CODE_OK, MetadataResponse, parse_aspect,
};
pub use cache::{ArtworkCache, CachedArtwork, ExpiryPolicy, JsonFileCache, MemoryCache, cache_path};
pub use catalog::{CatalogSnapshot, MemoryCatalog, ProgramCatalog, ProgramRecord};
pub use error::CoreError;
pub use program::ProgramId;
pub use sink::{ArtworkSink, ChannelSink, NullSink};
