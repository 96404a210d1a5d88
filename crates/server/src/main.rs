//! Static host for the songlines viewer: serves the built wasm bundle, the
//! GeoJSON data directory, and the runtime config. The row backend itself
//! is hosted elsewhere; nothing dynamic lives here beyond a health probe.

use axum::{routing::get, Json, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let dist_dir = std::env::var("DIST_DIR").unwrap_or_else(|_| "dist".to_string());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

    let app = Router::new()
        .route("/health", get(health))
        .nest_service("/data", ServeDir::new(&data_dir))
        .fallback_service(ServeDir::new(&dist_dir))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("Serving {dist_dir} and {data_dir} on {bind_addr}");
    axum::serve(listener, app).await.unwrap();
}
