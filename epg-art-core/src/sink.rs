use tokio::sync::mpsc;

use crate::artwork::ArtworkSet;

/// Downstream image pipeline. Handoff is fire-and-forget: implementations
/// must not block the caller waiting for images to be fetched.
pub trait ArtworkSink: Send + Sync {
    fn enqueue(&self, artwork: &ArtworkSet);
}

/// Forwards every artwork set onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ArtworkSet>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ArtworkSet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ArtworkSink for ChannelSink {
    fn enqueue(&self, artwork: &ArtworkSet) {
        if self.tx.send(artwork.clone()).is_err() {
            log::debug!("Artwork sink receiver dropped; discarding {} entries", artwork.len());
        }
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ArtworkSink for NullSink {
    fn enqueue(&self, _artwork: &ArtworkSet) {}
}
