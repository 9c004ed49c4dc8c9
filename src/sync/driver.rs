use std::time::{Duration, Instant};

use backoff::future::retry;
use backoff::ExponentialBackoff;
use log::{info, warn};

use crate::config::Config;
use crate::database::queries::{best_height, count_abandoned_supports, last_support_height};
use crate::metrics::RANGE_SYNC_TIME;
use crate::sync::context::SyncContext;
use crate::sync::progress::LogProgress;
use crate::sync::supports::{
    supports_constraints_and_indexes, supports_delete, supports_insert,
};

// Blocks per supports_insert call
const SYNC_RANGE_SIZE: i64 = 100_000;

// Splits [start, end] into inclusive ranges of at most `size` blocks
pub fn block_ranges(start: i64, end: i64, size: i64) -> Vec<(i64, i64)> {
    let mut ranges = Vec::new();
    let mut lo = start;
    while lo <= end {
        let hi = (lo + size - 1).min(end);
        ranges.push((lo, hi));
        lo = hi + 1;
    }
    ranges
}

// One insert attempt over an already partially synced range. Runs with
// missing_in_supports_table = true so batches completed before an earlier
// failure are not inserted again.
async fn insert_missing(
    ctx: &SyncContext,
    blocks: (i64, i64),
) -> Result<u64, backoff::Error<sqlx::Error>> {
    let mut progress = LogProgress::new("sync.supports.insert", "supports");
    supports_insert(ctx, blocks, true, &mut progress)
        .await
        .map_err(|e| {
            warn!(
                "Error syncing supports in {}-{}: {}. Retrying...",
                blocks.0, blocks.1, e
            );
            backoff::Error::transient(e)
        })
}

// Syncs one block range, falling back to exponential-backoff retries in
// missing-only mode if the first pass fails partway
async fn sync_range(
    ctx: &SyncContext,
    blocks: (i64, i64),
    missing_first: bool,
) -> Result<u64, sqlx::Error> {
    let mut progress = LogProgress::new("sync.supports.insert", "supports");
    match supports_insert(ctx, blocks, missing_first, &mut progress).await {
        Ok(inserted) => Ok(inserted),
        Err(e) => {
            warn!(
                "Error syncing supports in {}-{}: {}. Resuming with missing-only...",
                blocks.0, blocks.1, e
            );
            let backoff = ExponentialBackoff {
                max_elapsed_time: Some(Duration::from_secs(3600)),
                ..Default::default()
            };
            retry(backoff, || insert_missing(ctx, blocks)).await
        }
    }
}

// Drives the pipelines forward as the ledger grows: insert supports for each
// new block range, run post-load maintenance once after the initial catch-up,
// prune abandoned supports, sleep, repeat.
pub async fn run_sync(
    config: Config,
    ctx: SyncContext,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut next_height: Option<i64> = None;
    let mut constraints_ready = false;

    loop {
        if let Some(tip) = best_height(&ctx.pool).await? {
            // After a restart the scan frontier is unknown: resume from the
            // highest derived row and repair that first pass with the
            // missing-only predicate.
            let (start, repair) = match next_height {
                Some(height) => (height, false),
                None => (
                    last_support_height(&ctx.pool)
                        .await?
                        .map(|height| height + 1)
                        .unwrap_or(config.start_height),
                    true,
                ),
            };

            if start <= tip {
                info!("Syncing supports from {} to {}", start, tip);
                let mut synced = 0u64;
                for blocks in block_ranges(start, tip, SYNC_RANGE_SIZE) {
                    let started = Instant::now();
                    synced += sync_range(&ctx, blocks, repair).await?;
                    RANGE_SYNC_TIME.observe(started.elapsed().as_secs_f64());
                }
                if !constraints_ready {
                    let mut progress = LogProgress::new("sync.supports.indexes", "steps");
                    supports_constraints_and_indexes(&ctx, &mut progress).await?;
                    constraints_ready = true;
                }
                info!("Synced {} supports up to height {}", synced, tip);
                next_height = Some(tip + 1);
            }
        }

        let abandoned = count_abandoned_supports(&ctx.pool).await?;
        if abandoned > 0 {
            let mut progress = LogProgress::new("sync.supports.delete", "supports");
            let deleted = supports_delete(&ctx, abandoned as u64, &mut progress).await?;
            info!("Pruned {} abandoned supports", deleted);
        }

        tokio::time::sleep(Duration::from_secs(config.poll_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_inclusive_and_cover_the_span() {
        assert_eq!(
            block_ranges(0, 250_000, 100_000),
            vec![(0, 99_999), (100_000, 199_999), (200_000, 250_000)]
        );
    }

    #[test]
    fn single_block_span_is_one_range() {
        assert_eq!(block_ranges(5, 5, 100), vec![(5, 5)]);
    }

    #[test]
    fn empty_when_start_is_past_end() {
        assert!(block_ranges(10, 9, 100).is_empty());
    }
}
