//! Schedules Direct JSON wire shapes.
//!
//! Raw structures mirror the service; conversion into the core model happens
//! here so nothing downstream sees nullable service fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use epg_art_core::{ArtworkEntry, ArtworkTier, CODE_OK, MetadataResponse, ProgramId};

/// Account expired.
pub const CODE_ACCOUNT_EXPIRED: i32 = 4001;
/// Unknown user or wrong password hash.
pub const CODE_INVALID_USER: i32 = 4003;
/// Token expired or was never valid.
pub const CODE_TOKEN_EXPIRED: i32 = 4006;

/// Local code for a `data` field that is neither an image list nor an
/// error object.
pub const CODE_MALFORMED: i32 = -1;

/// Service error codes after which the held token must not be reused.
pub fn is_token_error_code(code: i32) -> bool {
    matches!(
        code,
        CODE_ACCOUNT_EXPIRED | CODE_INVALID_USER | CODE_TOKEN_EXPIRED
    )
}

/// Body of `POST token`.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    /// SHA-1 of the password, lowercase hex.
    pub password: String,
}

/// Response to `POST token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub code: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "serverID")]
    pub server_id: Option<String>,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token: Option<String>,
    /// Unix seconds; only sent by newer API revisions.
    #[serde(default)]
    pub token_expires: Option<i64>,
}

/// Error envelope the service returns for failed calls, sometimes with a
/// 200 status.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i32,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    pub fn describe(&self) -> String {
        match (&self.response, &self.message) {
            (Some(r), Some(m)) => format!("{r}: {m}"),
            (None, Some(m)) => m.clone(),
            (Some(r), None) => r.clone(),
            (None, None) => "no message".to_string(),
        }
    }
}

/// Response to `GET status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub account: Option<AccountStatus>,
    #[serde(default)]
    pub last_data_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub system_status: Vec<SystemStatus>,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
}

impl StatusResponse {
    /// Whether the service reports itself online.
    pub fn is_online(&self) -> bool {
        self.system_status
            .first()
            .is_some_and(|s| s.status.eq_ignore_ascii_case("online"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_lineups: Option<u32>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub date: Option<String>,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// One element of the `metadata/programs/` response array.
///
/// `data` is a list of images on success and an error object otherwise. It
/// is kept as raw JSON so one bad item cannot fail the whole batch.
#[derive(Debug, Deserialize)]
pub struct ProgramMetadataWire {
    #[serde(rename = "programID")]
    pub program_id: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A single image descriptor as sent by the service. Every field is
/// optional on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct RawArtwork {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub aspect: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub primary: bool,
}

impl RawArtwork {
    /// Convert into a core entry. Items without a uri, size or aspect are
    /// malformed and yield `None`.
    pub fn into_entry(self) -> Option<ArtworkEntry> {
        let uri = non_empty(self.uri)?;
        let size = non_empty(self.size)?;
        let aspect = non_empty(self.aspect)?;
        let tier = self
            .tier
            .as_deref()
            .map(ArtworkTier::from_service_tag)
            .unwrap_or(ArtworkTier::Other);

        let mut entry = ArtworkEntry::new(tier, size, aspect, uri).with_code(self.code.unwrap_or(CODE_OK));
        entry.category = non_empty(self.category);
        entry.width = self.width;
        entry.height = self.height;
        entry.primary = self.primary;
        Some(entry)
    }
}

impl ProgramMetadataWire {
    /// Flatten into a [`MetadataResponse`].
    ///
    /// The response code is the error object's code, or the first item's
    /// code when every item carries an error. Malformed items are skipped.
    pub fn into_response(self) -> MetadataResponse {
        let program_id = ProgramId::new(self.program_id);
        let values = match self.data {
            None | Some(serde_json::Value::Null) => {
                return MetadataResponse::ok(program_id, Vec::new());
            }
            Some(serde_json::Value::Array(values)) => values,
            Some(other @ serde_json::Value::Object(_)) => {
                return match serde_json::from_value::<ApiErrorResponse>(other) {
                    Ok(err) => {
                        let message = err.describe();
                        MetadataResponse::failed(program_id, err.code, message)
                    }
                    Err(e) => {
                        log::warn!("Unrecognized artwork data for {program_id}: {e}");
                        MetadataResponse::failed(program_id, CODE_MALFORMED, "unrecognized artwork data")
                    }
                };
            }
            Some(other) => {
                log::warn!("Unrecognized artwork data for {program_id}: {other}");
                return MetadataResponse::failed(program_id, CODE_MALFORMED, "unrecognized artwork data");
            }
        };

        let total = values.len();
        let items: Vec<RawArtwork> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawArtwork>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    log::warn!("Skipping malformed artwork item for {program_id}: {e}");
                    None
                }
            })
            .collect();

        // A list holding only error items is how some failures are reported.
        if let Some(first) = items.first() {
            let code = first.code.unwrap_or(CODE_OK);
            if code != CODE_OK && items.iter().all(|i| i.uri.as_deref().unwrap_or("").is_empty()) {
                let message = first
                    .message
                    .clone()
                    .unwrap_or_else(|| "no message".to_string());
                return MetadataResponse::failed(program_id, code, message);
            }
        }

        let entries: Vec<ArtworkEntry> = items.into_iter().filter_map(RawArtwork::into_entry).collect();
        if entries.len() < total {
            log::debug!(
                "Skipped {} malformed artwork item(s) for {}",
                total - entries.len(),
                program_id
            );
        }
        MetadataResponse::ok(program_id, entries)
    }
}

/// Convert a decoded `metadata/programs/` array. Elements that are not a
/// program record at all are logged and dropped; the rest of the batch
/// survives.
pub fn metadata_responses(values: Vec<serde_json::Value>) -> Vec<MetadataResponse> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ProgramMetadataWire>(value) {
            Ok(wire) => Some(wire.into_response()),
            Err(e) => {
                log::warn!("Skipping malformed program metadata record: {e}");
                None
            }
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Accept `135`, `"135"`, or null.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accept `true`, `"true"`, `"yes"`, or null.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes")
        }
        _ => false,
    })
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
