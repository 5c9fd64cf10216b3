//! Terminal progress for an ingestion pass.
//!
//! A spinner covers the cache check, then a bar counts programs as their
//! batches come back.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use epg_art_sd::IngestEvent;

pub(crate) struct IngestProgress {
    pb: ProgressBar,
}

impl IngestProgress {
    /// Create the display. When `quiet` is true nothing is drawn.
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
                pb.set_style(style.tick_chars("/-\\|"));
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };
        Self { pb }
    }

    pub(crate) fn handle(&self, event: &IngestEvent) {
        match event {
            IngestEvent::Started { candidates } => {
                self.pb
                    .set_message(format!("Checking cache for {candidates} programs..."));
            }
            IngestEvent::CacheResolved { cached, misses } => {
                if *misses == 0 {
                    self.pb.set_message(format!("{cached} programs already cached"));
                    return;
                }
                self.pb.set_length(*misses as u64);
                self.pb.set_position(0);
                if let Ok(style) = ProgressStyle::with_template(
                    "  {bar:30.cyan/dim} {pos}/{len} programs ({eta}) {msg}",
                ) {
                    self.pb.set_style(style.progress_chars("=> "));
                }
                self.pb.set_message(String::new());
            }
            IngestEvent::BatchCompleted { processed, .. } => {
                self.pb.set_position(*processed as u64);
            }
            IngestEvent::BatchFailed { offset, size, .. } => {
                self.pb
                    .set_message(format!("batch {}..{} failed", offset, offset + size));
            }
            IngestEvent::Finished(_) => self.pb.finish_and_clear(),
        }
    }

    /// Consume events until the sender side closes.
    pub(crate) async fn drive(self, mut rx: mpsc::UnboundedReceiver<IngestEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(&event);
        }
        self.pb.finish_and_clear();
    }
}
