pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod ingest;
pub(crate) mod token;

use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use epg_art_sd::{ArtworkSettings, AuthTransport, Credentials};

use crate::error::CliError;

/// Build a tokio runtime for a command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {e}")))
}

/// Build a transport from settings and stored credentials, with optional
/// command-line overrides.
pub(crate) fn transport(
    settings: &ArtworkSettings,
    username: Option<String>,
    password: Option<String>,
) -> Result<Arc<AuthTransport>, CliError> {
    let creds = match Credentials::load() {
        Ok(c) => c.with_overrides(username, password),
        Err(e) => match (username, password) {
            (Some(u), Some(p)) => Credentials::new(u, p),
            _ => {
                log::error!(
                    "{} {}",
                    "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                    e
                );
                log::error!("");
                log::error!("Set credentials via environment variables:");
                log::error!(
                    "  {}, {}",
                    epg_art_sd::credentials::USERNAME_VAR,
                    epg_art_sd::credentials::PASSWORD_VAR
                );
                log::error!("");
                log::error!("Or run 'epg-art config credentials' to store them.");
                return Err(e.into());
            }
        },
    };
    Ok(Arc::new(AuthTransport::new(&settings.base_url, Some(creds))?))
}

/// Resolve settings from file and environment.
pub(crate) fn load_settings() -> Result<ArtworkSettings, CliError> {
    Ok(ArtworkSettings::load()?)
}
