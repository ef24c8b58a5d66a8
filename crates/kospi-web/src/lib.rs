//! # Kospi Web
//!
//! HTTP surface for the cached top-10 snapshot.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/stocks` | `200 {"data": [...], "source": "cache" \| "crawl"}` or `500 {"error": "..."}` |
//! | `GET /health` | `200 ok` |

pub mod cli;
pub mod error;
pub mod telemetry;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use kospi_core::{ServiceError, StockService, StocksPayload};
use serde::Serialize;
use tracing::{error, info};

/// Builds the application router around a shared service.
pub fn router(service: Arc<StockService>) -> Router {
    Router::new()
        .route("/api/stocks", get(get_stocks))
        .route("/health", get(health))
        .with_state(service)
}

async fn get_stocks(
    State(service): State<Arc<StockService>>,
) -> Result<Json<StocksPayload>, ApiError> {
    let started = Instant::now();
    let payload = service.load().await?;
    info!(
        target: "kospi::api",
        source = ?payload.source,
        rows = payload.data.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stocks served"
    );
    Ok(Json(payload))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Uniform 500 response for any refresh failure.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        error!(target: "kospi::api", error = %message, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: message }),
        )
            .into_response()
    }
}
