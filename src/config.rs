use std::env;

// Configuration for the support sync engine
#[derive(Clone)]
pub struct Config {
    pub db_url: String, // Database connection URL
    pub start_height: i64, // Starting block height for the first sync pass
    pub poll_secs: u64, // Seconds to wait between sync cycles
    pub metrics_port: u16, // Port for the Prometheus metrics server
}

impl Config {
    // Loads configuration from environment variables, with defaults for optional fields
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let config = Config {
            // Required: Database connection URL
            db_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            // Optional: Starting block height (defaults to 0)
            start_height: env::var("START_HEIGHT").unwrap_or("0".to_string()).parse().unwrap_or(0),
            // Optional: Poll interval between sync cycles (defaults to 30s)
            poll_secs: env::var("POLL_SECS").unwrap_or("30".to_string()).parse().unwrap_or(30),
            // Optional: Metrics server port (defaults to 9090)
            metrics_port: env::var("METRICS_PORT").unwrap_or("9090".to_string()).parse().unwrap_or(9090),
        };

        if config.db_url.is_empty() {
            return Err("DATABASE_URL must be set".into());
        }

        Ok(config)
    }
}
