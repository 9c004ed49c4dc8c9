use sqlx::{Pool, Postgres};

use crate::sync::loader::SupportLoader;

// Storage backend capabilities, decided once from the connection URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("sqlite:") {
            Backend::Sqlite
        } else {
            Backend::Postgres
        }
    }

    // Whether VACUUM/ANALYZE style commands can run outside a transaction
    pub fn supports_online_maintenance(&self) -> bool {
        matches!(self, Backend::Postgres)
    }

    // Whether the support primary key and indexes are added after bulk load
    // instead of at table creation
    pub fn deferred_constraints(&self) -> bool {
        matches!(self, Backend::Postgres)
    }
}

// Shared handle for one sync pipeline invocation
#[derive(Clone)]
pub struct SyncContext {
    pub pool: Pool<Postgres>,
    pub backend: Backend,
}

impl SyncContext {
    pub fn new(pool: Pool<Postgres>, backend: Backend) -> Self {
        SyncContext { pool, backend }
    }

    pub fn bulk_loader(&self) -> SupportLoader {
        SupportLoader::new(self.pool.clone())
    }
}
