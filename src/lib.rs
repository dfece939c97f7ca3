//! Sales-order ingestion API
//!
//! The core is the order-intake write pipeline: sequence-number allocation,
//! gap-filling record-id allocation, reference-data resolution, and the
//! ordered, partially-recoverable inserts that materialize one order across
//! the header, line and inventory-transaction tables.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use axum::{extract::State, response::Json, routing::get, routing::post, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

// App state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub services: services::AppServices,
}

impl AppState {
    pub fn new(db: Arc<db::DbPool>, config: config::AppConfig) -> Self {
        let gateway = db::Gateway::new(db.clone());
        let services = services::AppServices::new(gateway, &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Envelope for the read-only endpoints. The order submission response keeps
/// its own literal contract shape and does not use this.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/orders", post(handlers::orders::submit_order))
        .route("/catalog/items", get(handlers::catalog::list_items))
        .route("/catalog/sites", get(handlers::catalog::list_sites))
        .route(
            "/catalog/warehouses",
            get(handlers::catalog::list_warehouses),
        )
        .route("/catalog/locations", get(handlers::catalog::list_locations))
        .route("/catalog/units", get(handlers::catalog::list_units))
        .route(
            "/catalog/items/:item/master-units",
            get(handlers::catalog::master_units),
        )
        .route(
            "/customers/lookup",
            get(handlers::catalog::customer_lookup),
        )
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "salesdesk-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
