use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::error::SdError;

/// Records every batch it is asked for and how many ran at once.
#[derive(Default)]
struct RecordingSource {
    calls: Mutex<Vec<(usize, Vec<ProgramId>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_offsets: Vec<usize>,
    delay: Duration,
}

impl RecordingSource {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ArtworkSource for RecordingSource {
    async fn fetch_batch(
        &self,
        ids: &[ProgramId],
        offset: usize,
    ) -> Result<Vec<MetadataResponse>, SdError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push((offset, ids.to_vec()));
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_offsets.contains(&offset) {
            return Err(SdError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(ids
            .iter()
            .map(|id| MetadataResponse::ok(id.clone(), Vec::new()))
            .collect())
    }
}

fn ids(n: usize) -> Vec<ProgramId> {
    (0..n).map(|i| ProgramId::new(format!("EP{i:012}"))).collect()
}

#[test]
fn test_partition_covers_input() {
    let input = ids(1234);
    let batches: Vec<_> = partition(&input, 500).collect();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].0, 0);
    assert_eq!(batches[1].0, 500);
    assert_eq!(batches[2].0, 1000);
    assert_eq!(batches[2].1.len(), 234);

    let flattened: Vec<ProgramId> = batches.iter().flat_map(|(_, b)| b.iter().cloned()).collect();
    assert_eq!(flattened, input);
}

#[test]
fn test_partition_edges() {
    assert_eq!(partition(&[], 500).count(), 0);
    assert_eq!(partition(&ids(500), 500).count(), 1);
    assert_eq!(partition(&ids(501), 500).count(), 2);
    // Zero batch size is treated as one.
    assert_eq!(partition(&ids(3), 0).count(), 3);
}

#[tokio::test]
async fn test_empty_misses_make_no_calls() {
    let source = RecordingSource::default();
    let scheduler = BatchScheduler::new(500, 4);
    let outcome = scheduler
        .download_all(&source, &[], &CancellationToken::new(), None)
        .await;
    assert!(source.calls.lock().is_empty());
    assert_eq!(outcome.batches, 0);
    assert!(outcome.responses.is_empty());
}

#[tokio::test]
async fn test_every_id_requested_once() {
    let source = RecordingSource::default();
    let scheduler = BatchScheduler::new(7, 3);
    let input = ids(50);

    let outcome = scheduler
        .download_all(&source, &input, &CancellationToken::new(), None)
        .await;

    let calls = source.calls.lock();
    assert_eq!(calls.len(), 8);
    assert!(calls.iter().all(|(_, batch)| batch.len() <= 7));
    let requested: Vec<&ProgramId> = calls.iter().flat_map(|(_, b)| b.iter()).collect();
    let unique: HashSet<&ProgramId> = requested.iter().copied().collect();
    assert_eq!(requested.len(), 50);
    assert_eq!(unique.len(), 50);

    assert_eq!(outcome.responses.len(), 50);
    assert_eq!(outcome.processed, 50);
    assert_eq!(outcome.failed, 0);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let source = RecordingSource::with_delay(Duration::from_millis(20));
    let scheduler = BatchScheduler::new(2, 3);

    scheduler
        .download_all(&source, &ids(40), &CancellationToken::new(), None)
        .await;

    assert_eq!(source.calls.lock().len(), 20);
    let max = source.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {max} batches in flight");
    assert!(max >= 2, "batches should overlap, saw {max}");
}

#[tokio::test]
async fn test_failed_batch_is_contained() {
    let source = RecordingSource {
        fail_offsets: vec![10],
        ..Default::default()
    };
    let scheduler = BatchScheduler::new(10, 2);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = scheduler
        .download_all(&source, &ids(30), &CancellationToken::new(), Some(&tx))
        .await;

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.responses.len(), 20);
    assert_eq!(outcome.processed, 20);

    drop(tx);
    let mut completed = 0;
    let mut failed = 0;
    while let Some(event) = rx.recv().await {
        match event {
            IngestEvent::BatchCompleted { .. } => completed += 1,
            IngestEvent::BatchFailed { offset, size, .. } => {
                assert_eq!((offset, size), (10, 10));
                failed += 1;
            }
            _ => {}
        }
    }
    assert_eq!((completed, failed), (2, 1));
}

#[tokio::test]
async fn test_cancelled_before_start_admits_nothing() {
    let source = RecordingSource::default();
    let scheduler = BatchScheduler::new(5, 2);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = scheduler.download_all(&source, &ids(20), &cancel, None).await;

    assert!(source.calls.lock().is_empty());
    assert_eq!(outcome.skipped, 4);
    assert!(outcome.responses.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_collected_responses() {
    let source = RecordingSource::with_delay(Duration::from_millis(50));
    let scheduler = BatchScheduler::new(1, 1);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let canceller = async move {
        tokio::time::sleep(Duration::from_millis(75)).await;
        trigger.cancel();
    };
    let misses = ids(10);
    let (outcome, ()) = tokio::join!(
        scheduler.download_all(&source, &misses, &cancel, None),
        canceller
    );

    let calls = source.calls.lock().len();
    assert!(calls < 10, "cancellation should stop admission, saw {calls} calls");
    assert_eq!(outcome.responses.len(), calls);
    assert_eq!(outcome.skipped, 10 - calls);
}
