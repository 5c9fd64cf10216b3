use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use epg_art_core::{ChannelSink, JsonFileCache, MemoryCatalog, cache_path};
use epg_art_sd::{ArtworkIngestor, ArtworkSettings, AuthTransport, SchedulesDirectClient};

use crate::error::CliError;
use crate::progress::IngestProgress;

/// Options for the ingest command, already parsed from the command line.
pub(crate) struct IngestOptions {
    pub catalog: PathBuf,
    pub cache: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub no_save: bool,
    pub purge_expired: bool,
    pub size: Option<String>,
    pub aspect: Option<String>,
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub cache_negative: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl IngestOptions {
    fn apply(&self, mut settings: ArtworkSettings) -> ArtworkSettings {
        if let Some(ref size) = self.size {
            settings.artwork_size = size.clone();
        }
        if let Some(ref aspect) = self.aspect {
            settings.preferred_aspect = aspect.clone();
        }
        if let Some(n) = self.batch_size {
            settings.max_batch_size = n;
        }
        if let Some(n) = self.concurrency {
            settings.max_concurrent_batches = n;
        }
        if self.cache_negative {
            settings.cache_negative_results = true;
        }
        settings.normalized()
    }
}

/// Run the ingest command.
pub(crate) fn run_ingest(opts: IngestOptions, quiet: bool) -> Result<(), CliError> {
    let settings = opts.apply(super::load_settings()?);
    let catalog = Arc::new(MemoryCatalog::load(&opts.catalog)?);
    log::info!(
        "Loaded {} programs from {}",
        catalog.len(),
        opts.catalog.display()
    );

    let transport = super::transport(&settings, opts.username.clone(), opts.password.clone())?;
    let cache_file = match opts.cache.clone() {
        Some(p) => p,
        None => cache_path()?,
    };

    let rt = super::runtime()?;
    rt.block_on(async {
        connect(&transport, quiet).await?;

        let cache = Arc::new(JsonFileCache::open(&cache_file, settings.expiry_policy()).await?);
        log::debug!("Artwork cache: {}", cache_file.display());

        let (sink, mut queued) = ChannelSink::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = tokio::spawn(IngestProgress::new(quiet).drive(rx));

        let ingestor = ArtworkIngestor::new(
            settings,
            Arc::new(SchedulesDirectClient::new(transport.clone())),
            cache.clone(),
            catalog.clone(),
            Arc::new(sink),
        )
        .with_events(tx);

        if opts.purge_expired {
            let removed = ingestor.remove_expired().await?;
            log::info!("Purged {removed} expired cache records");
        }

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted; finishing batches already in flight...");
                on_interrupt.cancel();
            }
        });

        let completed = ingestor.run(&cancel).await;
        let summary = ingestor.last_summary();
        drop(ingestor);
        let _ = progress.await;

        if !completed {
            return Err(CliError::Cancelled);
        }

        let mut uris = 0usize;
        while let Ok(artwork) = queued.try_recv() {
            for uri in artwork.uris() {
                log::debug!("  queued {uri}");
                uris += 1;
            }
        }

        if let Some(s) = summary {
            log::info!(
                "{} {} programs: {} cached, {} downloaded, {} applied, {} without artwork",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                s.candidates,
                s.cache_hits,
                s.fetched,
                s.applied,
                s.negative,
            );
            if s.failed_batches > 0 {
                log::warn!(
                    "{} {} of {} batches failed; those programs will be retried next run",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                    s.failed_batches,
                    s.batches,
                );
            }
            if s.cancelled {
                log::warn!("Pass was cancelled; remaining programs will be picked up next run");
            }
            log::info!("{uris} images queued for download");
        }
        Ok::<(), CliError>(())
    })?;

    if !opts.no_save {
        let target = opts.output.as_ref().unwrap_or(&opts.catalog);
        catalog.save(target)?;
        log::info!("Saved catalog to {}", target.display());
    }
    Ok(())
}

/// Obtain a token before the pass so credential problems surface early.
async fn connect(transport: &AuthTransport, quiet: bool) -> Result<(), CliError> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("/-\\|"));
        }
        pb.set_message("Connecting to Schedules Direct...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let ok = transport.validate_token(false).await;
    pb.finish_and_clear();

    if !ok {
        log::error!(
            "{} Could not obtain a Schedules Direct token",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
        );
        return Err(CliError::config("authentication failed; check credentials"));
    }
    log::info!(
        "{} Connected to Schedules Direct",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
    );
    Ok(())
}
