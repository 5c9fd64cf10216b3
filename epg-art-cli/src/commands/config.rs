use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use epg_art_sd::credentials::{self, CredentialSource};
use epg_art_sd::{ArtworkSettings, Credentials, settings_path};

use crate::error::CliError;

fn mask_value(s: &str) -> String {
    match s.char_indices().nth(2) {
        Some((idx, _)) => format!("{}****", &s[..idx]),
        None => "****".to_string(),
    }
}

/// Show the effective settings and where the credentials come from.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = settings_path();
    let sources = credentials::credential_sources();

    log::info!(
        "{}",
        "Artwork Ingestion Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!("");

    let creds = Credentials::load().ok();
    let fields = [
        (
            "username",
            &sources.username,
            creds.as_ref().map(|c| c.username.clone()),
        ),
        (
            "password",
            &sources.password,
            creds.as_ref().map(|c| mask_value(&c.password)),
        ),
    ];
    for (name, source, value) in fields {
        let source_str = format!("({})", source);
        let value = match source {
            CredentialSource::Missing => None,
            _ => value,
        };
        match value {
            Some(v) => log::info!(
                "  {} {} {}",
                format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
                v,
                source_str.if_supports_color(Stdout, |t| t.dimmed()),
            ),
            None => log::info!(
                "  {} {} {}",
                format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
                "not set".if_supports_color(Stdout, |t| t.yellow()),
                source_str.if_supports_color(Stdout, |t| t.dimmed()),
            ),
        }
    }
    log::info!("");

    let settings = ArtworkSettings::load()?;
    for line in settings.to_toml()?.lines() {
        log::info!("  {line}");
    }
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}

/// Write a settings file populated with the defaults.
pub(crate) fn run_config_init(force: bool) -> Result<(), CliError> {
    let path = settings_path();
    ArtworkSettings::default().write_to(&path, force)?;
    log::info!(
        "{} Wrote default settings to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}

/// Store account credentials in the settings file.
pub(crate) fn run_config_credentials(username: String, password: String) -> Result<(), CliError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(CliError::config("username and password must not be empty"));
    }
    let path = settings_path();
    credentials::save_to_file(&path, &Credentials::new(username.trim(), password))?;
    log::info!(
        "{} Credentials saved to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}
