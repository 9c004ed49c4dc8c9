use async_trait::async_trait;
use futures::stream;

use supportsync::models::SupportRow;
use supportsync::sync::loader::SupportSink;
use supportsync::sync::progress::Progress;
use supportsync::sync::supports::{load_supports, SUPPORT_FLUSH_SIZE};

fn support_row(n: usize) -> SupportRow {
    SupportRow {
        txo_hash: format!("{:08x}", n),
        address: Some("addr".to_string()),
        amount: 1000,
        height: 150,
        timestamp: Some(1_600_000_000),
        claim_hash: "claim".to_string(),
        emoji: None,
        channel_hash: None,
        signature: None,
        signature_digest: None,
        channel_public_key: None,
    }
}

// Sink that records each flush instead of writing to a database
struct RecordingSink {
    pending: Vec<SupportRow>,
    flushes: Vec<u64>,
}

impl RecordingSink {
    fn new() -> Self {
        RecordingSink {
            pending: Vec::new(),
            flushes: Vec::new(),
        }
    }
}

#[async_trait]
impl SupportSink for RecordingSink {
    fn add(&mut self, row: SupportRow) {
        self.pending.push(row);
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn flush(&mut self) -> Result<u64, sqlx::Error> {
        let written = self.pending.len() as u64;
        self.flushes.push(written);
        self.pending.clear();
        Ok(written)
    }
}

struct RecordingProgress {
    steps: Vec<u64>,
}

impl Progress for RecordingProgress {
    fn start(&mut self, _total: u64, _progress_id: i64, _label: &str) {}

    fn step(&mut self, n: u64) {
        self.steps.push(n);
    }
}

#[tokio::test]
async fn one_row_past_the_batch_boundary_flushes_twice() {
    let rows: Vec<Result<SupportRow, sqlx::Error>> =
        (0..SUPPORT_FLUSH_SIZE + 1).map(|n| Ok(support_row(n))).collect();
    let mut sink = RecordingSink::new();
    let mut progress = RecordingProgress { steps: Vec::new() };

    let inserted = load_supports(stream::iter(rows), &mut sink, &mut progress)
        .await
        .unwrap();

    assert_eq!(inserted, (SUPPORT_FLUSH_SIZE + 1) as u64);
    assert_eq!(sink.flushes, vec![SUPPORT_FLUSH_SIZE as u64, 1]);
    assert_eq!(progress.steps.iter().sum::<u64>(), inserted);
}

#[tokio::test]
async fn rows_below_the_boundary_flush_once_at_exhaustion() {
    let rows: Vec<Result<SupportRow, sqlx::Error>> =
        (0..10).map(|n| Ok(support_row(n))).collect();
    let mut sink = RecordingSink::new();
    let mut progress = RecordingProgress { steps: Vec::new() };

    let inserted = load_supports(stream::iter(rows), &mut sink, &mut progress)
        .await
        .unwrap();

    assert_eq!(inserted, 10);
    assert_eq!(sink.flushes, vec![10]);
}

#[tokio::test]
async fn empty_range_inserts_nothing() {
    let rows: Vec<Result<SupportRow, sqlx::Error>> = Vec::new();
    let mut sink = RecordingSink::new();
    let mut progress = RecordingProgress { steps: Vec::new() };

    let inserted = load_supports(stream::iter(rows), &mut sink, &mut progress)
        .await
        .unwrap();

    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn fetch_error_aborts_the_whole_load() {
    let rows: Vec<Result<SupportRow, sqlx::Error>> =
        vec![Ok(support_row(0)), Err(sqlx::Error::RowNotFound)];
    let mut sink = RecordingSink::new();
    let mut progress = RecordingProgress { steps: Vec::new() };

    let result = load_supports(stream::iter(rows), &mut sink, &mut progress).await;

    assert!(result.is_err());
    // nothing was flushed before the abort
    assert!(sink.flushes.is_empty());
}
