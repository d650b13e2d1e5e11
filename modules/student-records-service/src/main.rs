//! Student Records Service: standalone binary that stores student
//! submissions in a JSON document and keeps a CSV export alongside it.
//!
//! Hosts both an RPC API and a record listing on the same port.
//! Default: http://127.0.0.1:5000/

mod config;
mod dashboard;
mod error;
mod export;
mod routes;
mod store;

use config::Config;
use routes::AppState;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let store = Arc::new(
        store::RecordStore::open(config.json_path(), config.csv_path())
            .expect("Failed to open record store"),
    );
    log::info!(
        "Opened record store at: {} (csv: {}), {} existing records",
        store.json_path().display(),
        store.csv_path().display(),
        store.count()
    );

    let state = Arc::new(AppState {
        store,
        start_time: Instant::now(),
    });

    let cors = tower_http::cors::CorsLayer::permissive();

    let app = axum::Router::new()
        .route("/", axum::routing::get(dashboard::dashboard))
        .route("/view-data", axum::routing::get(dashboard::dashboard))
        // Records
        .route("/rpc/records/submit", axum::routing::post(routes::submit))
        .route("/rpc/records/count", axum::routing::get(routes::count))
        .route("/rpc/records/all", axum::routing::get(routes::list_all))
        .route("/rpc/records/clear", axum::routing::post(routes::clear))
        // Downloads
        .route("/download/:format", axum::routing::get(routes::download))
        // Service
        .route("/rpc/status", axum::routing::get(routes::status))
        .with_state(state)
        .layer(cors);

    let addr = config.bind_addr();
    log::info!("Student Records Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
