use sqlx::{Executor, Pool, Postgres};

use crate::models::txo_type;
use crate::sync::context::Backend;

pub async fn init_db(pool: &Pool<Postgres>, backend: Backend) -> Result<(), sqlx::Error> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS block (
            block_hash TEXT PRIMARY KEY,
            previous_hash TEXT,
            height BIGINT NOT NULL,
            timestamp BIGINT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tx (
            tx_hash TEXT PRIMARY KEY,
            block_hash TEXT,
            raw BYTEA,
            height BIGINT NOT NULL,
            position INT NOT NULL DEFAULT 0,
            timestamp BIGINT,
            is_verified BOOLEAN NOT NULL DEFAULT FALSE
        );
        CREATE TABLE IF NOT EXISTS txo (
            txo_hash TEXT PRIMARY KEY,
            tx_hash TEXT NOT NULL REFERENCES tx (tx_hash),
            address TEXT,
            position INT NOT NULL DEFAULT 0,
            amount BIGINT NOT NULL,
            height BIGINT NOT NULL,
            spent_height BIGINT NOT NULL DEFAULT 0,
            txo_type SMALLINT NOT NULL DEFAULT 0,
            claim_hash TEXT,
            channel_hash TEXT,
            emoji TEXT,
            signature TEXT,
            signature_digest TEXT,
            public_key TEXT
        );
        CREATE TABLE IF NOT EXISTS txi (
            txo_hash TEXT PRIMARY KEY REFERENCES txo (txo_hash),
            tx_hash TEXT NOT NULL REFERENCES tx (tx_hash),
            address TEXT,
            position INT NOT NULL DEFAULT 0,
            height BIGINT NOT NULL
        );
        "#,
    )
    .await?;

    // The support primary key is added after the first bulk load on backends
    // that defer constraints; lightweight backends declare it inline.
    let support_pk = if backend.deferred_constraints() {
        ""
    } else {
        ",\n            PRIMARY KEY (txo_hash)"
    };
    let support_ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS support (
            txo_hash TEXT NOT NULL,
            claim_hash TEXT NOT NULL,
            address TEXT,
            amount BIGINT NOT NULL,
            height BIGINT NOT NULL,
            timestamp BIGINT,
            emoji TEXT,
            channel_hash TEXT,
            signature TEXT,
            signature_digest TEXT,
            is_signature_valid BOOLEAN{support_pk}
        );
        "#
    );
    pool.execute(support_ddl.as_str()).await?;

    let ledger_indexes = format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_txo_channel_key
            ON txo (claim_hash, height DESC) INCLUDE (public_key)
            WHERE txo_type = {channel};
        CREATE INDEX IF NOT EXISTS idx_txo_unspent_supports
            ON txo (height) INCLUDE (claim_hash, amount)
            WHERE spent_height = 0 AND txo_type = {support};
        "#,
        channel = txo_type::CHANNEL,
        support = txo_type::SUPPORT,
    );
    pool.execute(ledger_indexes.as_str()).await?;

    Ok(())
}

pub async fn add_support_constraints_and_indexes(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    pool.execute(
        r#"
        ALTER TABLE support DROP CONSTRAINT IF EXISTS support_pkey;
        ALTER TABLE support ADD PRIMARY KEY (txo_hash);
        CREATE INDEX IF NOT EXISTS idx_support_claim_hash
            ON support (claim_hash) INCLUDE (amount);
        CREATE INDEX IF NOT EXISTS idx_support_channel_hash
            ON support (channel_hash) WHERE channel_hash IS NOT NULL;
        "#,
    )
    .await?;
    Ok(())
}
