use std::path::Path;

use sha1::{Digest, Sha1};

use crate::error::SdError;
use crate::settings::settings_path;

pub const USERNAME_VAR: &str = "SCHEDULES_DIRECT_USERNAME";
pub const PASSWORD_VAR: &str = "SCHEDULES_DIRECT_PASSWORD";

/// Schedules Direct account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where a credential field's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the settings file.
    ConfigFile,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// Provenance of each credential field.
#[derive(Debug)]
pub struct CredentialSources {
    pub username: CredentialSource,
    pub password: CredentialSource,
}

/// `[schedules_direct]` table of the settings file.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
struct SchedulesDirectConfig {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    schedules_direct: Option<SchedulesDirectConfig>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Load credentials from environment variables or the settings file.
    ///
    /// Priority: env vars > config file.
    pub fn load() -> Result<Self, SdError> {
        Self::load_from(&settings_path())
    }

    /// Like [`load`](Self::load) with an explicit settings file.
    pub fn load_from(path: &Path) -> Result<Self, SdError> {
        let config = load_config_file(path);

        let username = std::env::var(USERNAME_VAR)
            .ok()
            .or_else(|| config.as_ref().and_then(|c| c.username.clone()))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                SdError::config(format!(
                    "Missing username. Set {USERNAME_VAR} or add [schedules_direct] username to {}",
                    path.display()
                ))
            })?;

        let password = std::env::var(PASSWORD_VAR)
            .ok()
            .or_else(|| config.as_ref().and_then(|c| c.password.clone()))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                SdError::config(format!(
                    "Missing password. Set {PASSWORD_VAR} or add [schedules_direct] password to {}",
                    path.display()
                ))
            })?;

        Ok(Self { username, password })
    }

    /// Replace fields with explicit values (e.g., from CLI args).
    pub fn with_overrides(mut self, username: Option<String>, password: Option<String>) -> Self {
        if let Some(u) = username {
            self.username = u;
        }
        if let Some(p) = password {
            self.password = p;
        }
        self
    }

    /// The password digest the token endpoint expects: SHA-1, lowercase hex.
    pub fn password_hash(&self) -> String {
        sha1_hex(&self.password)
    }
}

pub fn sha1_hex(input: &str) -> String {
    let digest = Sha1::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Determine where each credential field is coming from.
pub fn credential_sources() -> CredentialSources {
    credential_sources_from(&settings_path())
}

pub fn credential_sources_from(path: &Path) -> CredentialSources {
    let config = load_config_file(path);

    let username = if std::env::var(USERNAME_VAR).is_ok() {
        CredentialSource::EnvVar(USERNAME_VAR)
    } else if config.as_ref().and_then(|c| c.username.as_ref()).is_some() {
        CredentialSource::ConfigFile
    } else {
        CredentialSource::Missing
    };

    let password = if std::env::var(PASSWORD_VAR).is_ok() {
        CredentialSource::EnvVar(PASSWORD_VAR)
    } else if config.as_ref().and_then(|c| c.password.as_ref()).is_some() {
        CredentialSource::ConfigFile
    } else {
        CredentialSource::Missing
    };

    CredentialSources { username, password }
}

/// Store credentials in the `[schedules_direct]` table of `path`.
///
/// Uses `toml::Value` for a surgical update so the `[artwork]` table and
/// anything else in the file is preserved.
pub fn save_to_file(path: &Path, creds: &Credentials) -> Result<(), SdError> {
    let mut doc: toml::Value = match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .parse()
            .map_err(|e| SdError::config(format!("Failed to parse {}: {e}", path.display())))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Value::Table(Default::default()),
        Err(e) => return Err(e.into()),
    };

    let table = doc
        .as_table_mut()
        .ok_or_else(|| SdError::config("settings root is not a table"))?;
    let section = table
        .entry("schedules_direct")
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let section = section
        .as_table_mut()
        .ok_or_else(|| SdError::config("[schedules_direct] is not a table"))?;
    section.insert("username".to_string(), toml::Value::String(creds.username.clone()));
    section.insert("password".to_string(), toml::Value::String(creds.password.clone()));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc)
        .map_err(|e| SdError::config(format!("Failed to serialize settings: {e}")))?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, serialized)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn load_config_file(path: &Path) -> Option<SchedulesDirectConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    let config: ConfigFile = toml::from_str(&content).ok()?;
    config.schedules_direct
}
