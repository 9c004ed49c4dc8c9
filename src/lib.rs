pub mod config;
pub mod database;
pub mod metrics;
pub mod models;
pub mod sync;

pub use config::Config;
pub use models::SupportRow;
pub use sync::context::{Backend, SyncContext};
pub use sync::progress::{LogProgress, Progress};
