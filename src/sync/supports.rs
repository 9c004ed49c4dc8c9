use futures::{Stream, TryStreamExt};
use sqlx::Executor;

use crate::database::queries::{
    count_unspent_supports, delete_abandoned_supports, select_unspent_supports,
};
use crate::database::schema::add_support_constraints_and_indexes;
use crate::metrics::{SUPPORTS_DELETED, SUPPORTS_INDEXED};
use crate::models::SupportRow;
use crate::sync::context::SyncContext;
use crate::sync::loader::SupportSink;
use crate::sync::progress::{make_label, Progress};

// Pending rows that force a bulk-loader flush mid-stream
pub const SUPPORT_FLUSH_SIZE: usize = 25_000;

// Discovers unspent support outputs in the block range and bulk-loads them
// into the derived support table. `missing_in_supports_table` restricts
// discovery to outputs absent from the derived table, which makes the call
// safe to repeat over an already-synced range (backfill and resume).
pub async fn supports_insert(
    ctx: &SyncContext,
    blocks: (i64, i64),
    missing_in_supports_table: bool,
    progress: &mut dyn Progress,
) -> Result<u64, sqlx::Error> {
    let expected = count_unspent_supports(&ctx.pool, blocks, missing_in_supports_table).await?;
    progress.start(expected as u64, blocks.0, &make_label("add supports at", blocks));

    let mut loader = ctx.bulk_loader();
    let mut query = select_unspent_supports(blocks, missing_in_supports_table);
    let rows = query.build_query_as::<SupportRow>().fetch(&ctx.pool);
    load_supports(rows, &mut loader, progress).await
}

// Streams projected rows into the sink, flushing every SUPPORT_FLUSH_SIZE
// pending rows and once more at cursor exhaustion. Progress advances per
// flushed batch, not per row. Any fetch or flush error aborts the whole load;
// the caller retries the range.
pub async fn load_supports<S: SupportSink>(
    mut rows: impl Stream<Item = Result<SupportRow, sqlx::Error>> + Unpin,
    sink: &mut S,
    progress: &mut dyn Progress,
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0u64;
    while let Some(row) = rows.try_next().await? {
        sink.add(row);
        if sink.pending() >= SUPPORT_FLUSH_SIZE {
            inserted += flush_batch(sink, progress).await?;
        }
    }
    inserted += flush_batch(sink, progress).await?;
    Ok(inserted)
}

async fn flush_batch<S: SupportSink>(
    sink: &mut S,
    progress: &mut dyn Progress,
) -> Result<u64, sqlx::Error> {
    let written = sink.flush().await?;
    SUPPORTS_INDEXED.inc_by(written as f64);
    progress.step(written);
    Ok(written)
}

// Post-load maintenance, run once after all insert batches of a sync cycle:
// refresh planner statistics over the freshly loaded table, then add the
// deferred primary key and indexes. Building the unique index once over the
// final row set is much cheaper than maintaining it row-by-row during the
// bulk insert. Both steps report even where the backend skips them.
pub async fn supports_constraints_and_indexes(
    ctx: &SyncContext,
    progress: &mut dyn Progress,
) -> Result<(), sqlx::Error> {
    progress.start(2, 0, "support constraints and indexes");
    if ctx.backend.supports_online_maintenance() {
        let mut conn = ctx.pool.acquire().await?;
        // VACUUM cannot run inside a transaction
        conn.execute("COMMIT;").await?;
        conn.execute("VACUUM ANALYZE support;").await?;
    }
    progress.step(1);
    if ctx.backend.deferred_constraints() {
        add_support_constraints_and_indexes(&ctx.pool).await?;
    }
    progress.step(1);
    Ok(())
}

// Prunes derived rows whose underlying output has been abandoned. `expected`
// is an advisory progress total; the returned count is what was removed.
// Running this twice with nothing newly abandoned removes zero rows.
pub async fn supports_delete(
    ctx: &SyncContext,
    expected: u64,
    progress: &mut dyn Progress,
) -> Result<u64, sqlx::Error> {
    progress.start(expected, 0, "delete supports");
    let mut query = delete_abandoned_supports();
    let deleted = query.build().execute(&ctx.pool).await?.rows_affected();
    SUPPORTS_DELETED.inc_by(deleted as f64);
    progress.step(deleted);
    Ok(deleted)
}
