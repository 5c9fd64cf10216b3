use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use epg_art_core::{MetadataResponse, ProgramId};

use crate::error::SdError;
use crate::transport::AuthTransport;
use crate::types::{self, StatusResponse};

/// Where batches of program artwork metadata come from.
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    /// Fetch metadata for one batch. `offset` is the position of the batch's
    /// first id in the overall download list, for progress reporting.
    async fn fetch_batch(
        &self,
        ids: &[ProgramId],
        offset: usize,
    ) -> Result<Vec<MetadataResponse>, SdError>;
}

/// Schedules Direct metadata client.
#[derive(Clone)]
pub struct SchedulesDirectClient {
    transport: Arc<AuthTransport>,
}

impl SchedulesDirectClient {
    pub fn new(transport: Arc<AuthTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<AuthTransport> {
        &self.transport
    }

    /// Account and system status.
    pub async fn status(&self) -> Result<StatusResponse, SdError> {
        self.transport
            .send_request(Method::GET, "status", None, true)
            .await
    }

    /// Artwork metadata for `ids`, one response per program the service
    /// answered for.
    pub async fn program_artwork(&self, ids: &[ProgramId]) -> Result<Vec<MetadataResponse>, SdError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let payload = serde_json::to_value(ids)?;
        let records: Vec<serde_json::Value> = self
            .transport
            .send_request(Method::POST, "metadata/programs/", Some(&payload), true)
            .await?;
        Ok(types::metadata_responses(records))
    }
}

#[async_trait]
impl ArtworkSource for SchedulesDirectClient {
    async fn fetch_batch(
        &self,
        ids: &[ProgramId],
        offset: usize,
    ) -> Result<Vec<MetadataResponse>, SdError> {
        log::debug!(
            "Requesting artwork for programs {}..{}",
            offset,
            offset + ids.len()
        );
        let responses = self.program_artwork(ids).await?;
        if responses.len() != ids.len() {
            log::debug!(
                "Asked for {} programs, service answered for {}",
                ids.len(),
                responses.len()
            );
        }
        Ok(responses)
    }
}
