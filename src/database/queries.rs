use sqlx::{Pool, Postgres, QueryBuilder};

use crate::models::txo_type;

// Appends the "unspent support outputs in [lo, hi]" predicate to a query.
// With `missing_in_supports_table`, discovery is restricted to outputs not
// yet present in the derived table, which makes a re-run of the same range
// insert nothing new.
pub fn where_unspent_supports(
    query: &mut QueryBuilder<'_, Postgres>,
    blocks: (i64, i64),
    missing_in_supports_table: bool,
) {
    query.push(" txo.txo_type = ");
    query.push_bind(txo_type::SUPPORT);
    query.push(" AND txo.spent_height = 0 AND txo.height BETWEEN ");
    query.push_bind(blocks.0);
    query.push(" AND ");
    query.push_bind(blocks.1);
    if missing_in_supports_table {
        query.push(
            " AND NOT EXISTS (SELECT 1 FROM support WHERE support.txo_hash = txo.txo_hash)",
        );
    }
}

// Counts the rows the insert pipeline is expected to process for a range
pub async fn count_unspent_supports(
    pool: &Pool<Postgres>,
    blocks: (i64, i64),
    missing_in_supports_table: bool,
) -> Result<i64, sqlx::Error> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM txo WHERE");
    where_unspent_supports(&mut query, blocks, missing_in_supports_table);
    let count: i64 = query.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

// Builds the support projection over txo joined with tx. The channel public
// key is resolved with a correlated subquery picking the most recent channel
// output at or below the support's height: channel keys can rotate, and the
// key in effect when the support confirmed is the one its signature was made
// with. Unsigned supports (channel_hash NULL) project a NULL key.
pub fn select_unspent_supports(
    blocks: (i64, i64),
    missing_in_supports_table: bool,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        "SELECT txo.txo_hash, txo.address, txo.amount, txo.height, tx.timestamp, \
         txo.claim_hash, txo.emoji, txo.channel_hash, txo.signature, txo.signature_digest, \
         CASE WHEN txo.channel_hash IS NOT NULL THEN (\
         SELECT channel_txo.public_key FROM txo AS channel_txo \
         WHERE channel_txo.txo_type = ",
    );
    query.push_bind(txo_type::CHANNEL);
    query.push(
        " AND channel_txo.claim_hash = txo.channel_hash \
         AND channel_txo.height <= txo.height \
         ORDER BY channel_txo.height DESC LIMIT 1\
         ) END AS channel_public_key \
         FROM txo JOIN tx ON tx.tx_hash = txo.tx_hash WHERE",
    );
    where_unspent_supports(&mut query, blocks, missing_in_supports_table);
    query
}

// Deletes derived rows whose output is no longer a live unspent support,
// covering both spent outputs and outputs dropped from the ledger
pub fn delete_abandoned_supports() -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        "DELETE FROM support WHERE NOT EXISTS (\
         SELECT 1 FROM txo WHERE txo.txo_hash = support.txo_hash \
         AND txo.spent_height = 0 AND txo.txo_type = ",
    );
    query.push_bind(txo_type::SUPPORT);
    query.push(")");
    query
}

pub async fn count_abandoned_supports(pool: &Pool<Postgres>) -> Result<i64, sqlx::Error> {
    let mut query = QueryBuilder::new(
        "SELECT COUNT(*) FROM support WHERE NOT EXISTS (\
         SELECT 1 FROM txo WHERE txo.txo_hash = support.txo_hash \
         AND txo.spent_height = 0 AND txo.txo_type = ",
    );
    query.push_bind(txo_type::SUPPORT);
    query.push(")");
    let count: i64 = query.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

pub async fn best_height(pool: &Pool<Postgres>) -> Result<Option<i64>, sqlx::Error> {
    let height: Option<i64> = sqlx::query_scalar("SELECT MAX(height) FROM tx")
        .fetch_one(pool)
        .await?;
    Ok(height)
}

pub async fn last_support_height(pool: &Pool<Postgres>) -> Result<Option<i64>, sqlx::Error> {
    let height: Option<i64> = sqlx::query_scalar("SELECT MAX(height) FROM support")
        .fetch_one(pool)
        .await?;
    Ok(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Execute;

    #[test]
    fn unspent_predicate_covers_type_spent_state_and_range() {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM txo WHERE");
        where_unspent_supports(&mut query, (100, 200), false);
        let sql = query.build().sql().to_string();
        assert!(sql.contains("txo.spent_height = 0"));
        assert!(sql.contains("txo.height BETWEEN"));
        assert!(!sql.contains("NOT EXISTS"));
    }

    #[test]
    fn missing_only_adds_anti_join_against_derived_table() {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM txo WHERE");
        where_unspent_supports(&mut query, (100, 200), true);
        let sql = query.build().sql().to_string();
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("support.txo_hash = txo.txo_hash"));
    }

    #[test]
    fn projection_resolves_channel_key_as_of_support_height() {
        let mut query = select_unspent_supports((0, 1000), false);
        let sql = query.build().sql().to_string();
        assert!(sql.contains("CASE WHEN txo.channel_hash IS NOT NULL"));
        assert!(sql.contains("channel_txo.claim_hash = txo.channel_hash"));
        assert!(sql.contains("channel_txo.height <= txo.height"));
        assert!(sql.contains("ORDER BY channel_txo.height DESC LIMIT 1"));
        assert!(sql.contains("AS channel_public_key"));
        assert!(sql.contains("JOIN tx ON tx.tx_hash = txo.tx_hash"));
    }

    #[test]
    fn abandoned_delete_removes_rows_without_live_outputs() {
        let mut query = delete_abandoned_supports();
        let sql = query.build().sql().to_string();
        assert!(sql.starts_with("DELETE FROM support WHERE NOT EXISTS"));
        assert!(sql.contains("txo.spent_height = 0"));
        assert!(sql.contains("txo.txo_hash = support.txo_hash"));
    }
}
