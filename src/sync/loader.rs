use async_trait::async_trait;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::models::SupportRow;

// Rows per INSERT statement; keeps bind counts well below the postgres
// protocol limit of 65,535 parameters
const INSERT_CHUNK: usize = 1000;

// Buffered writer for derived support rows. The insert pipeline controls
// flush cadence; the sink owns signature verification at flush time.
#[async_trait]
pub trait SupportSink: Send {
    fn add(&mut self, row: SupportRow);
    fn pending(&self) -> usize;
    async fn flush(&mut self) -> Result<u64, sqlx::Error>;
}

pub struct SupportLoader {
    pool: Pool<Postgres>,
    secp: Secp256k1<VerifyOnly>,
    rows: Vec<SupportRow>,
}

impl SupportLoader {
    pub fn new(pool: Pool<Postgres>) -> Self {
        SupportLoader {
            pool,
            secp: Secp256k1::verification_only(),
            rows: Vec::new(),
        }
    }
}

// Signature validity of a support row: NULL for unsigned supports, false for
// signed supports whose signature, digest, or resolved channel key is missing
// or malformed, otherwise the ECDSA verification result. A support signed by
// a channel with no resolvable key at its height is invalid, not an error.
pub fn signature_validity(secp: &Secp256k1<VerifyOnly>, row: &SupportRow) -> Option<bool> {
    row.channel_hash.as_ref()?;
    match (&row.signature, &row.signature_digest, &row.channel_public_key) {
        (Some(signature), Some(digest), Some(public_key)) => {
            Some(decode_and_verify(secp, signature, digest, public_key).unwrap_or(false))
        }
        _ => Some(false),
    }
}

fn decode_and_verify(
    secp: &Secp256k1<VerifyOnly>,
    signature: &str,
    digest: &str,
    public_key: &str,
) -> Option<bool> {
    let signature = Signature::from_der(&hex::decode(signature).ok()?).ok()?;
    let digest = hex::decode(digest).ok()?;
    let message = Message::from_digest_slice(&digest).ok()?;
    let public_key = PublicKey::from_slice(&hex::decode(public_key).ok()?).ok()?;
    Some(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
}

#[async_trait]
impl SupportSink for SupportLoader {
    fn add(&mut self, row: SupportRow) {
        self.rows.push(row);
    }

    fn pending(&self) -> usize {
        self.rows.len()
    }

    // Writes all buffered rows as multi-row INSERTs and clears the buffer.
    // Plain INSERT, no upsert: dedup against existing rows is the missing-only
    // predicate's job, and the primary key may not exist yet during the
    // initial bulk load.
    async fn flush(&mut self) -> Result<u64, sqlx::Error> {
        if self.rows.is_empty() {
            return Ok(0);
        }

        let mut written = 0u64;
        for chunk in self.rows.chunks(INSERT_CHUNK) {
            let mut query = QueryBuilder::new(
                "INSERT INTO support (txo_hash, claim_hash, address, amount, height, \
                 timestamp, emoji, channel_hash, signature, signature_digest, \
                 is_signature_valid) VALUES ",
            );

            for (i, row) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push(", ");
                }
                query.push("(");
                query.push_bind(&row.txo_hash);
                query.push(", ");
                query.push_bind(&row.claim_hash);
                query.push(", ");
                query.push_bind(&row.address);
                query.push(", ");
                query.push_bind(row.amount);
                query.push(", ");
                query.push_bind(row.height);
                query.push(", ");
                query.push_bind(row.timestamp);
                query.push(", ");
                query.push_bind(&row.emoji);
                query.push(", ");
                query.push_bind(&row.channel_hash);
                query.push(", ");
                query.push_bind(&row.signature);
                query.push(", ");
                query.push_bind(&row.signature_digest);
                query.push(", ");
                query.push_bind(signature_validity(&self.secp, row));
                query.push(")");
            }

            let result = query.build().execute(&self.pool).await?;
            written += result.rows_affected();
        }

        self.rows.clear();
        Ok(written)
    }
}
