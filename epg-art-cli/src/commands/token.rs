use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use epg_art_sd::{SchedulesDirectClient, TOKEN_LIFETIME};

use crate::error::CliError;

/// Obtain (or re-validate) a token and report account status.
pub(crate) fn run_token(
    force: bool,
    username: Option<String>,
    password: Option<String>,
    quiet: bool,
) -> Result<(), CliError> {
    let settings = super::load_settings()?;
    let transport = super::transport(&settings, username, password)?;
    let client = SchedulesDirectClient::new(transport.clone());

    let rt = super::runtime()?;
    rt.block_on(async {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
                pb.set_style(style.tick_chars("/-\\|"));
            }
            pb.set_message("Requesting token...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        let ok = transport.validate_token(force).await;
        if !ok {
            pb.finish_and_clear();
            log::warn!(
                "{} Token request failed",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            );
            return Err(CliError::config("authentication failed; check credentials"));
        }

        pb.set_message("Checking account status...");
        let status = client.status().await;
        pb.finish_and_clear();

        log::info!(
            "{} Token is valid",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        );
        if let Some(issued) = transport.token_timestamp() {
            let expires = chrono::Duration::from_std(TOKEN_LIFETIME)
                .ok()
                .map(|lifetime| issued + lifetime);
            log::info!("  Issued:  {}", issued.format("%Y-%m-%d %H:%M:%S UTC"));
            if let Some(expires) = expires {
                log::info!("  Renews:  {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }

        match status {
            Ok(status) => {
                if let Some(expires) = status.account.as_ref().and_then(|a| a.expires) {
                    log::info!("  Account expires: {}", expires.format("%Y-%m-%d"));
                }
                if let Some(updated) = status.last_data_update {
                    log::info!("  Last data update: {}", updated.format("%Y-%m-%d %H:%M"));
                }
                let online = if status.is_online() {
                    "online".if_supports_color(Stdout, |t| t.green()).to_string()
                } else {
                    "offline".if_supports_color(Stdout, |t| t.yellow()).to_string()
                };
                log::info!("  Service: {online}");
            }
            Err(e) => log::warn!("  Status check failed: {e}"),
        }
        Ok::<(), CliError>(())
    })
}
