use serde::{Deserialize, Serialize};

// Output type discriminator, fixed when the output is created
pub mod txo_type {
    pub const OTHER: i16 = 0;
    pub const STREAM: i16 = 1;
    pub const CHANNEL: i16 = 2;
    pub const SUPPORT: i16 = 3;
}

// One unspent support output as projected out of the ledger, joined with its
// transaction timestamp and the channel public key in effect at its height
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct SupportRow {
    pub txo_hash: String,
    pub address: Option<String>,
    pub amount: i64,
    pub height: i64,
    pub timestamp: Option<i64>,
    pub claim_hash: String,
    pub emoji: Option<String>,
    pub channel_hash: Option<String>,
    pub signature: Option<String>,
    pub signature_digest: Option<String>,
    pub channel_public_key: Option<String>,
}
