use actix_web::{web, App, HttpServer};
use log::error;
use sqlx::postgres::PgPoolOptions;

use supportsync::database::schema;
use supportsync::sync::driver::run_sync;
use supportsync::{metrics, Backend, Config, SyncContext};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().expect("Invalid configuration");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.db_url)
        .await
        .expect("Failed to connect to database");

    let backend = Backend::from_url(&config.db_url);
    schema::init_db(&pool, backend)
        .await
        .expect("Failed to initialize database");

    // Start the sync driver task
    let ctx = SyncContext::new(pool, backend);
    let sync_config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = run_sync(sync_config, ctx).await {
            error!("Sync driver exited: {}", e);
        }
    });

    // Serve Prometheus metrics
    HttpServer::new(|| App::new().route("/metrics", web::get().to(metrics::metrics)))
        .bind(("0.0.0.0", config.metrics_port))?
        .run()
        .await
}
