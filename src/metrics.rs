use actix_web::HttpResponse;
use prometheus::{register_counter, register_histogram, Counter, Histogram};

lazy_static::lazy_static! {
    pub static ref SUPPORTS_INDEXED: Counter = register_counter!(
        "supportsync_supports_indexed_total",
        "Total support rows written to the derived table"
    ).unwrap();

    pub static ref SUPPORTS_DELETED: Counter = register_counter!(
        "supportsync_supports_deleted_total",
        "Total abandoned support rows pruned"
    ).unwrap();

    pub static ref RANGE_SYNC_TIME: Histogram = register_histogram!(
        "supportsync_range_sync_seconds",
        "Block range sync time in seconds"
    ).unwrap();
}

pub async fn metrics() -> HttpResponse {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let encoded = encoder.encode_to_string(&metric_families).unwrap_or_default();
    HttpResponse::Ok().body(encoded)
}
