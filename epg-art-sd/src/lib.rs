//! Schedules Direct artwork ingestion.
//!
//! Authenticated transport and metadata client for the Schedules Direct
//! JSON API, plus the pipeline that turns a catalog's program ids into
//! selected artwork: cache dedup, batched downloads, tiered selection.

pub mod client;
pub mod credentials;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod scheduler;
pub mod selector;
pub mod settings;
pub mod token;
pub mod transport;
pub mod types;

pub use client::{ArtworkSource, SchedulesDirectClient};
pub use credentials::{CredentialSource, CredentialSources, Credentials, credential_sources};
pub use dedup::{Resolution, resolve};
pub use error::SdError;
pub use ingest::{ArtworkIngestor, IngestEvent, IngestSummary};
pub use scheduler::{BatchOutcome, BatchScheduler, partition};
pub use selector::select;
pub use settings::{ArtworkSettings, settings_path};
pub use token::{Token, TokenStore};
pub use transport::{AuthTransport, DEFAULT_BASE_URL, TOKEN_LIFETIME, TokenAuth};
